//! Template parser.
//!
//! Reads the token stream into statement lists, dispatching tag tokens to
//! their registered [`Tag`](crate::tag::Tag). Tags drive their own
//! sub-grammar through the helper methods on [`Parser`].

use crate::ast::{Ast, NodeId, NodeKind, Value};
use crate::environment::{AutofilterMode, Environment};
use crate::error::{ParseError, ParseErrorCode, Result};
use crate::expression::ExpressionParser;
use indexmap::IndexMap;
use quill_lexer::{TokenKind, TokenStream};
use quill_source::Span;
use smol_str::SmolStr;
use tracing::trace;

/// Per-class state while its body is being parsed.
#[derive(Debug)]
struct ClassState {
    template_name: SmolStr,
    parent_template: Option<NodeId>,
    blocks: IndexMap<SmolStr, NodeId>,
    line: u32,
}

impl ClassState {
    fn new(template_name: SmolStr, line: u32) -> Self {
        Self {
            template_name,
            parent_template: None,
            blocks: IndexMap::new(),
            line,
        }
    }
}

/// Recursive-descent parser over a token stream.
pub struct Parser<'e> {
    env: &'e Environment,
    stream: TokenStream,
    ast: Ast,
    template_name: SmolStr,
    /// Depth of nested statement lists; the template body is level 1.
    level: usize,
    block_stack: Vec<SmolStr>,
    /// Modes of the enclosing `autofilter` regions.
    autofilter_stack: Vec<AutofilterMode>,
    class_stack: Vec<ClassState>,
    /// Finished embedded classes, in completion order.
    embedded: Vec<NodeId>,
    embedded_count: usize,
}

impl<'e> Parser<'e> {
    pub fn new(env: &'e Environment, stream: TokenStream, template_name: &str) -> Self {
        Self {
            env,
            stream,
            ast: Ast::new(),
            template_name: template_name.into(),
            level: 0,
            block_stack: Vec::new(),
            autofilter_stack: Vec::new(),
            class_stack: Vec::new(),
            embedded: Vec::new(),
            embedded_count: 0,
        }
    }

    /// Parse the whole template into a `File` node.
    pub fn parse(mut self) -> Result<(Ast, NodeId)> {
        self.class_stack
            .push(ClassState::new(self.template_name.clone(), 1));
        let body = self.parse_block(&[])?;
        let state = self.pop_class()?;
        let main = self.finish_class(state, body);

        let mut classes = vec![main];
        classes.append(&mut self.embedded);
        let file = self.ast.add(NodeKind::File { classes }, 1);
        trace!(nodes = self.ast.len(), "parsed template");
        Ok((self.ast, file))
    }

    /// Parse statements until one of the `ends` tags (left as the current
    /// token) or, when `ends` is empty, until the end of the template.
    ///
    /// The closing tag should be the last entry of `ends`; it is named in
    /// the error when the template ends first.
    pub fn parse_block(&mut self, ends: &[&str]) -> Result<NodeId> {
        let start_line = self.stream.current().line;
        self.level += 1;
        if self.level > self.env.options().max_nesting {
            return Err(ParseError::at(
                self.stream.current(),
                format!(
                    "Nesting exceeds the limit of {}",
                    self.env.options().max_nesting
                ),
                ParseErrorCode::NestingTooDeep,
            )
            .into());
        }

        let mut children = Vec::new();
        loop {
            let token = self.stream.current().clone();
            match token.kind {
                TokenKind::Eof => match ends.last() {
                    None => break,
                    Some(closing) => return Err(ParseError::unclosed_tag(closing, &token).into()),
                },
                TokenKind::Text => {
                    let data = self
                        .ast
                        .add(NodeKind::Data(Value::String(token.value.to_string())), token.line);
                    children.push(self.print(data, token.line));
                    self.stream.next();
                }
                TokenKind::ExpressionStart => {
                    self.stream.next();
                    let expression = self.parse_expression()?;
                    self.stream.expect_current(TokenKind::ExpressionEnd, None)?;
                    self.stream.next();
                    children.push(self.print(expression, token.line));
                }
                TokenKind::Tag => {
                    if ends.contains(&token.value.as_str()) {
                        break;
                    }
                    let Some(tag) = self.env.tag(&token.value) else {
                        return Err(ParseError::unknown_tag(&token).into());
                    };
                    if let Some(node) = tag.parse(self, token.line)? {
                        children.push(node);
                    }
                }
                _ => {
                    return Err(
                        ParseError::unexpected_token("text, expression or tag", &token).into(),
                    )
                }
            }
        }

        self.level -= 1;
        Ok(self.ast.add(
            NodeKind::Root {
                children,
                uses_environment: true,
                autofilter: None,
            },
            start_line,
        ))
    }

    /// Parse a tag body; returns the body and the tag that ended it.
    pub fn parse_body(&mut self, ends: &[&str]) -> Result<(NodeId, SmolStr)> {
        let body = self.parse_block(ends)?;
        Ok((body, self.stream.current().value.clone()))
    }

    pub fn parse_expression(&mut self) -> Result<NodeId> {
        ExpressionParser::new(self.env, &mut self.stream, &mut self.ast).parse()
    }

    /// Move from the tag token onto its first argument token.
    pub fn enter_args(&mut self) -> Result<()> {
        self.stream.expect(TokenKind::BlockStart, None)?;
        self.stream.next();
        Ok(())
    }

    /// Require the end of the tag and step past it.
    pub fn expect_block_end(&mut self) -> Result<()> {
        self.stream.expect_current(TokenKind::BlockEnd, None)?;
        self.stream.next();
        Ok(())
    }

    /// Consume an argument-less tag such as `else` or a closing tag.
    pub fn close_tag(&mut self) -> Result<()> {
        self.enter_args()?;
        self.expect_block_end()
    }

    /// Whether the tag arguments are exhausted.
    pub fn at_block_end(&self) -> bool {
        self.stream.test(TokenKind::BlockEnd, None)
    }

    /// The closing tag name for `name`, e.g. `endif`.
    pub fn closing_tag(&self, name: &str) -> String {
        format!("{}{}", self.env.options().lexer.closing_tag_prefix, name)
    }

    pub fn expect_identifier(&mut self) -> Result<SmolStr> {
        let token = self.stream.expect_current(TokenKind::Identifier, None)?;
        self.stream.next();
        Ok(token.value)
    }

    /// Require a bare word such as `in` or `using`.
    pub fn expect_keyword(&mut self, word: &str) -> Result<()> {
        self.stream
            .expect_current(TokenKind::Identifier, Some(word))?;
        self.stream.next();
        Ok(())
    }

    /// Consume `word` if it is the current token.
    pub fn next_keyword_if(&mut self, word: &str) -> bool {
        if self.stream.test(TokenKind::Identifier, Some(word)) {
            self.stream.next();
            true
        } else {
            false
        }
    }

    /// Consume the punctuation `value` if it is the current token.
    pub fn next_punctuation_if(&mut self, value: &str) -> bool {
        if self.stream.current().is_punctuation(value) {
            self.stream.next();
            true
        } else {
            false
        }
    }

    /// Error positioned at the current token.
    pub fn error(&self, message: impl Into<String>, code: ParseErrorCode) -> ParseError {
        ParseError::at(self.stream.current(), message, code)
    }

    /// Create a `Tag` node.
    pub fn tag_node(
        &mut self,
        tag: &str,
        data: IndexMap<SmolStr, Value>,
        children: IndexMap<SmolStr, NodeId>,
        line: u32,
    ) -> NodeId {
        self.ast.add(
            NodeKind::Tag {
                tag: tag.into(),
                data,
                children,
            },
            line,
        )
    }

    /// Create a `Print` node for an expression.
    pub fn print(&mut self, expression: NodeId, line: u32) -> NodeId {
        self.ast.add(
            NodeKind::Print {
                expression,
                is_safe: false,
            },
            line,
        )
    }

    pub fn env(&self) -> &'e Environment {
        self.env
    }

    pub fn stream(&mut self) -> &mut TokenStream {
        &mut self.stream
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Top level of the main template, outside any tag body.
    pub fn is_main_scope(&self) -> bool {
        self.level == 1 && self.class_stack.len() == 1
    }

    /// Register a named block in the class being parsed.
    pub fn define_block(&mut self, name: SmolStr, body: NodeId, line: u32) -> Result<()> {
        let state = self.current_class()?;
        if state.blocks.contains_key(&name) {
            return Err(ParseError::duplicate_block(&name, line).into());
        }
        state.blocks.insert(name, body);
        self.mark_autofilter(body);
        Ok(())
    }

    /// Set the parent template of the class being parsed.
    pub fn set_parent_template(&mut self, expression: NodeId, line: u32) -> Result<()> {
        let state = self.current_class()?;
        if state.parent_template.is_some() {
            return Err(ParseError::new(
                "Template already extends a parent",
                line,
                Span::default(),
                ParseErrorCode::InvalidScope,
            )
            .into());
        }
        state.parent_template = Some(expression);
        Ok(())
    }

    /// Start an embedded template extending `parent`; returns its name.
    pub fn begin_embedded(&mut self, parent: NodeId, line: u32) -> SmolStr {
        self.embedded_count += 1;
        let name: SmolStr =
            format!("{}__embedded_{}", self.template_name, self.embedded_count).into();
        let mut state = ClassState::new(name.clone(), line);
        state.parent_template = Some(parent);
        self.class_stack.push(state);
        name
    }

    /// Finish the innermost embedded template with its body.
    pub fn end_embedded(&mut self, body: NodeId) -> Result<SmolStr> {
        self.mark_autofilter(body);
        let state = self.pop_class()?;
        let name = state.template_name.clone();
        let class = self.finish_class(state, body);
        self.embedded.push(class);
        Ok(name)
    }

    pub fn push_block(&mut self, name: SmolStr) {
        self.block_stack.push(name);
    }

    pub fn pop_block(&mut self) -> Option<SmolStr> {
        self.block_stack.pop()
    }

    /// Enter an `autofilter` region; blocks and embeds defined inside it
    /// keep its mode in their own methods.
    pub fn push_autofilter(&mut self, mode: AutofilterMode) {
        self.autofilter_stack.push(mode);
    }

    pub fn pop_autofilter(&mut self) -> Option<AutofilterMode> {
        self.autofilter_stack.pop()
    }

    fn mark_autofilter(&mut self, body: NodeId) {
        let Some(&mode) = self.autofilter_stack.last() else {
            return;
        };
        if let NodeKind::Root { autofilter, .. } = self.ast.kind_mut(body) {
            *autofilter = Some(mode);
        }
    }

    /// The innermost named block being parsed.
    pub fn current_block(&self) -> Option<&SmolStr> {
        self.block_stack.last()
    }

    fn current_class(&mut self) -> Result<&mut ClassState> {
        let token = self.stream.current().clone();
        self.class_stack.last_mut().ok_or_else(|| {
            ParseError::at(&token, "No template scope", ParseErrorCode::InvalidScope).into()
        })
    }

    fn pop_class(&mut self) -> Result<ClassState> {
        let token = self.stream.current().clone();
        self.class_stack.pop().ok_or_else(|| {
            ParseError::at(&token, "No template scope", ParseErrorCode::InvalidScope).into()
        })
    }

    fn finish_class(&mut self, state: ClassState, body: NodeId) -> NodeId {
        let class_name = self.env.class_name(&state.template_name);
        self.ast.add(
            NodeKind::Class {
                template_name: state.template_name,
                class_name,
                parent_template: state.parent_template,
                body,
                blocks: state.blocks,
            },
            state.line,
        )
    }
}
