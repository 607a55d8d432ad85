//! Variables and output: `set`, `unset`, `do`, `capture`, `print`,
//! `autofilter` and `raw`.

use super::{child, children, data};
use quill_compiler::{
    split_top_level, ArgumentContext, ArgumentTokenizer, AutofilterMode, CompileResult, Compiler,
    NodeId, NodeKind, ParseError, ParseErrorCode, Parser, Result, Tag, TokenKind, Value,
};
use quill_lexer::{SyntaxResult, Token};

/// Lexes `NAME: EXPR[, NAME: EXPR]*`, splitting on top-level commas and the
/// first top-level colon of each assignment.
pub struct SetArguments;

impl ArgumentTokenizer for SetArguments {
    fn tokenize(&self, args: &str, ctx: &ArgumentContext<'_>) -> SyntaxResult<Vec<Token>> {
        let mut tokens = Vec::new();
        for (i, (at, assignment)) in split_top_level(args, ',').into_iter().enumerate() {
            if i > 0 {
                tokens.push(ctx.token(TokenKind::Punctuation, ",", at - 1));
            }
            let Some((name_at, name)) = split_top_level(assignment, ':').into_iter().next() else {
                continue;
            };
            let colon = name_at + name.len();
            if colon >= assignment.len() {
                return Err(ctx.error("Expected \"NAME: value\"", at));
            }

            let trimmed = name.trim();
            if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ctx.error(format!("Invalid variable name \"{}\"", trimmed), at));
            }
            let skipped = name.len() - name.trim_start().len();
            tokens.push(ctx.token(TokenKind::Identifier, trimmed, at + name_at + skipped));
            tokens.push(ctx.token(TokenKind::Punctuation, ":", at + colon));
            tokens.extend(ctx.expression(&assignment[colon + 1..], at + colon + 1)?);
        }
        Ok(tokens)
    }
}

/// `set NAME: EXPR[, NAME: EXPR]*`
pub struct SetTag;

impl Tag for SetTag {
    fn name(&self) -> &'static str {
        "set"
    }

    fn argument_tokenizer(&self) -> Option<&dyn ArgumentTokenizer> {
        Some(&SetArguments)
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;
        let mut names = Vec::new();
        let mut nodes = children();
        loop {
            let name = parser.expect_identifier()?;
            parser
                .stream()
                .expect_current(TokenKind::Punctuation, Some(":"))?;
            parser.stream().next();
            let value = parser.parse_expression()?;
            nodes.insert(format!("value_{}", names.len()).into(), value);
            names.push(name.to_string());
            if !parser.next_punctuation_if(",") {
                break;
            }
        }
        parser.expect_block_end()?;

        let mut values = data();
        values.insert("names".into(), Value::strings(names));
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        for (i, name) in names(compiler, node).into_iter().enumerate() {
            let value = child(compiler, node, &format!("value_{}", i))?;
            compiler.indented("context.set(").string(name).add(", ");
            compiler.compile_node(value)?;
            compiler.add(");");
        }
        Ok(())
    }
}

/// `unset NAME[, NAME]*`
pub struct UnsetTag;

impl Tag for UnsetTag {
    fn name(&self) -> &'static str {
        "unset"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;
        let mut names = Vec::new();
        loop {
            let target = parser.parse_expression()?;
            let name = match parser.ast().kind(target) {
                NodeKind::Identifier {
                    name,
                    receiver: None,
                }
                | NodeKind::Variable { name } => name.to_string(),
                _ => {
                    return Err(ParseError::new(
                        "Only plain variables can be unset",
                        parser.ast().line(target),
                        Default::default(),
                        ParseErrorCode::InvalidOperand,
                    )
                    .into())
                }
            };
            names.push(name);
            if !parser.next_punctuation_if(",") {
                break;
            }
        }
        parser.expect_block_end()?;

        let mut values = data();
        values.insert("names".into(), Value::strings(names));
        Ok(Some(parser.tag_node(self.name(), values, children(), line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        for name in names(compiler, node) {
            compiler.indented("context.unset(").string(name).add(");");
        }
        Ok(())
    }
}

/// `do EXPR`: evaluates an expression for its side effects.
pub struct DoTag;

impl Tag for DoTag {
    fn name(&self) -> &'static str {
        "do"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;
        let expression = parser.parse_expression()?;
        parser.expect_block_end()?;

        let mut nodes = children();
        nodes.insert("expression".into(), expression);
        Ok(Some(parser.tag_node(self.name(), data(), nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let expression = child(compiler, node, "expression")?;
        compiler.indented("");
        compiler.compile_node(expression)?;
        compiler.add(";");
        Ok(())
    }
}

/// `capture into NAME … endcapture`: stores rendered output in a variable.
pub struct CaptureTag;

impl Tag for CaptureTag {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let end = parser.closing_tag("capture");
        parser.enter_args()?;
        parser.expect_keyword("into")?;
        let name = parser.expect_identifier()?;
        parser.expect_block_end()?;

        let (body, _) = parser.parse_body(&[end.as_str()])?;
        parser.close_tag()?;

        let mut values = data();
        values.insert("name".into(), Value::String(name.to_string()));
        let mut nodes = children();
        nodes.insert("body".into(), body);
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let name = super::name_data(compiler, node)?;
        let body = child(compiler, node, "body")?;
        compiler.indented("this.startCapture();");
        compiler.compile_body(body)?;
        compiler
            .indented("context.set(")
            .string(name)
            .add(", this.endCapture());");
        Ok(())
    }
}

/// `print EXPR[: DEFAULT]`: prints EXPR, or DEFAULT when it is null.
pub struct PrintTag;

impl Tag for PrintTag {
    fn name(&self) -> &'static str {
        "print"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;
        let mut expression = parser.parse_expression()?;
        if parser.next_punctuation_if(":") {
            let fallback = parser.parse_expression()?;
            let Some(coalesce) = parser.env().operators().binary("??") else {
                return Err(parser
                    .error(
                        "A print default needs the \"??\" operator",
                        ParseErrorCode::UnexpectedToken,
                    )
                    .into());
            };
            expression = coalesce.handler().build(
                parser.ast_mut(),
                coalesce.id(),
                "??",
                vec![expression, fallback],
                line,
            )?;
        }
        parser.expect_block_end()?;
        Ok(Some(parser.print(expression, line)))
    }

    // Parses to a `Print` node, which the compiler emits directly.
    fn compile(&self, _: &mut Compiler<'_>, _: NodeId) -> CompileResult<()> {
        Ok(())
    }
}

/// `autofilter on|off|auto … endautofilter`: changes escaping for a region.
pub struct AutofilterTag;

impl Tag for AutofilterTag {
    fn name(&self) -> &'static str {
        "autofilter"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let end = parser.closing_tag("autofilter");
        parser.enter_args()?;
        let word = parser.stream().current().clone();
        let mode = match word.kind {
            TokenKind::Identifier | TokenKind::String => AutofilterMode::parse(&word.value),
            _ => None,
        };
        let Some(mode) = mode else {
            return Err(
                ParseError::unexpected_token("\"on\", \"off\" or \"auto\"", &word).into(),
            );
        };
        parser.stream().next();
        parser.expect_block_end()?;

        parser.push_autofilter(mode);
        let (body, _) = parser.parse_body(&[end.as_str()])?;
        parser.pop_autofilter();
        parser.close_tag()?;

        let mut values = data();
        values.insert("mode".into(), Value::String(mode.as_str().to_string()));
        let mut nodes = children();
        nodes.insert("body".into(), body);
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let body = child(compiler, node, "body")?;
        compiler.compile_body(body)
    }
}

/// `raw … endraw`. The tokenizer emits the content as text; an occurrence
/// reaching the parser carried arguments.
pub struct RawTag;

impl Tag for RawTag {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn parse(&self, parser: &mut Parser<'_>, _: u32) -> Result<Option<NodeId>> {
        Err(parser
            .error("The raw tag takes no arguments", ParseErrorCode::UnexpectedToken)
            .into())
    }

    // Never parses to a tag node.
    fn compile(&self, _: &mut Compiler<'_>, _: NodeId) -> CompileResult<()> {
        Ok(())
    }
}

/// The `names` list of a tag node.
fn names<'a>(compiler: &Compiler<'a>, node: NodeId) -> Vec<&'a str> {
    match compiler.ast().tag_data(node, "names") {
        Some(Value::Array(items)) => items.iter().filter_map(|(_, v)| v.as_str()).collect(),
        _ => Vec::new(),
    }
}
