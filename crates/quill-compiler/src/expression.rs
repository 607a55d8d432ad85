//! Expression parser.
//!
//! Operator-precedence parsing with an operator stack and an operand stack.
//! Each (sub)expression pushes a `None` sentinel onto the operator stack so
//! reductions never cross a parenthesis, argument list or array boundary.

use crate::ast::{ArrayEntry, Ast, NodeId, NodeKind, Value};
use crate::environment::Environment;
use crate::error::{ParseError, ParseErrorCode, Result};
use crate::operator::{Associativity, Operator, OperatorId};
use quill_lexer::{SyntaxError, Token, TokenKind, TokenStream};
use quill_source::Span;
use smol_str::SmolStr;

/// Binding strength of property access and indexing.
pub const ACCESS_PRECEDENCE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    Unary,
    Binary,
}

#[derive(Debug, Clone)]
struct StackEntry {
    id: OperatorId,
    symbol: SmolStr,
    arity: Arity,
    precedence: u32,
    line: u32,
    span: Span,
}

impl StackEntry {
    fn new(operator: &Operator, token: &Token, arity: Arity) -> Self {
        Self {
            id: operator.id(),
            symbol: token.value.clone(),
            arity,
            precedence: operator.precedence(),
            line: token.line,
            span: token.span,
        }
    }
}

/// Parses one expression from the stream into the AST.
pub struct ExpressionParser<'a> {
    env: &'a Environment,
    stream: &'a mut TokenStream,
    ast: &'a mut Ast,
    operators: Vec<Option<StackEntry>>,
    operands: Vec<NodeId>,
    /// Nested (sub)expressions currently open.
    depth: usize,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(env: &'a Environment, stream: &'a mut TokenStream, ast: &'a mut Ast) -> Self {
        Self {
            env,
            stream,
            ast,
            operators: Vec::new(),
            operands: Vec::new(),
            depth: 0,
        }
    }

    /// Parse an expression starting at the current token.
    ///
    /// Leaves the stream on the first token after the expression and checks
    /// that every plain function call names a registered function.
    pub fn parse(mut self) -> Result<NodeId> {
        let node = self.parse_expression()?;
        self.validate_functions(node)?;
        Ok(node)
    }

    /// Parentheses, arguments, array entries and indexes each open a
    /// nested expression; their depth shares the `max_nesting` limit.
    fn parse_expression(&mut self) -> Result<NodeId> {
        let limit = self.env.options().max_nesting;
        if self.depth >= limit {
            return Err(ParseError::at(
                self.stream.current(),
                format!("Expression nesting exceeds the limit of {}", limit),
                ParseErrorCode::NestingTooDeep,
            )
            .into());
        }
        self.depth += 1;
        let node = self.parse_conditional();
        self.depth -= 1;
        node
    }

    fn parse_conditional(&mut self) -> Result<NodeId> {
        let condition = self.parse_binary()?;
        if !self.stream.current().is_punctuation("?") {
            return Ok(condition);
        }

        let env = self.env;
        let question = self.stream.current().clone();
        let Some(operator) = env.operators().conditional() else {
            return Err(ParseError::at(
                &question,
                "Conditional expressions are not supported",
                ParseErrorCode::InvalidTernary,
            )
            .into());
        };
        self.stream.next();

        let (symbol, operands) = if self.stream.current().is_punctuation(":") {
            self.stream.next();
            let right = self.parse_expression()?;
            ("?:", vec![condition, right])
        } else {
            let middle = self.parse_expression()?;
            let colon = self.stream.current();
            if !colon.is_punctuation(":") {
                return Err(ParseError::at(
                    colon,
                    format!(
                        "Expected \":\" in conditional expression, found {}",
                        colon.describe()
                    ),
                    ParseErrorCode::InvalidTernary,
                )
                .into());
            }
            self.stream.next();
            let right = self.parse_expression()?;
            ("?", vec![condition, middle, right])
        };

        let node =
            operator
                .handler()
                .build(self.ast, operator.id(), symbol, operands, question.line)?;
        Ok(node)
    }

    fn parse_binary(&mut self) -> Result<NodeId> {
        let env = self.env;
        self.operators.push(None);
        self.parse_operand()?;

        loop {
            let token = self.stream.current().clone();
            if token.kind != TokenKind::Operator {
                break;
            }
            let Some(operator) = env.operators().binary(&token.value) else {
                break;
            };
            self.push_binary(operator, &token)?;
            self.stream.next();
            self.parse_operand()?;
        }

        self.reduce_while(None)?;
        self.operators.pop();
        self.pop_operand(self.stream.current().line)
    }

    /// Reduce according to precedence and associativity, then push.
    fn push_binary(&mut self, operator: &Operator, token: &Token) -> Result<()> {
        while let Some(Some(top)) = self.operators.last() {
            if top.id == operator.id() && top.arity == Arity::Binary {
                match operator.associativity() {
                    Associativity::Left => {
                        self.reduce_top()?;
                        continue;
                    }
                    Associativity::Right => break,
                    Associativity::None => {
                        return Err(ParseError::at(
                            token,
                            format!(
                                "Operator \"{}\" is not associative; use parentheses",
                                token.value
                            ),
                            ParseErrorCode::NonAssociative,
                        )
                        .into());
                    }
                }
            }
            if top.precedence >= operator.precedence() {
                self.reduce_top()?;
            } else {
                break;
            }
        }
        self.operators
            .push(Some(StackEntry::new(operator, token, Arity::Binary)));
        Ok(())
    }

    /// Prefix operators, a primary, then indexing and postfix operators.
    fn parse_operand(&mut self) -> Result<()> {
        let env = self.env;
        loop {
            let token = self.stream.current();
            if token.kind != TokenKind::Operator {
                break;
            }
            let Some(operator) = env.operators().prefix(&token.value) else {
                break;
            };
            let entry = StackEntry::new(operator, token, Arity::Unary);
            self.operators.push(Some(entry));
            self.stream.next();
        }

        self.parse_primary()?;
        self.parse_postfix()
    }

    fn parse_primary(&mut self) -> Result<()> {
        let token = self.stream.current().clone();
        let node = match token.kind {
            TokenKind::Literal => {
                self.stream.next();
                self.ast
                    .add(NodeKind::Data(Value::from_literal(&token.value)), token.line)
            }
            TokenKind::String => {
                self.stream.next();
                self.ast.add(
                    NodeKind::Data(Value::String(token.value.to_string())),
                    token.line,
                )
            }
            TokenKind::Variable => {
                self.stream.next();
                self.ast.add(
                    NodeKind::Variable {
                        name: token.value.clone(),
                    },
                    token.line,
                )
            }
            TokenKind::Identifier => {
                self.stream.next();
                if self.stream.current().is_punctuation("(") {
                    let arguments = self.parse_arguments()?;
                    self.ast.add(
                        NodeKind::Function {
                            name: token.value.clone(),
                            arguments,
                            receiver: None,
                        },
                        token.line,
                    )
                } else {
                    self.ast.add(
                        NodeKind::Identifier {
                            name: token.value.clone(),
                            receiver: None,
                        },
                        token.line,
                    )
                }
            }
            TokenKind::Punctuation if token.value == "(" => {
                self.stream.next();
                let inner = self.parse_expression()?;
                self.stream.expect_current(TokenKind::Punctuation, Some(")"))?;
                self.stream.next();
                inner
            }
            TokenKind::Punctuation if token.value == "[" => self.parse_array()?,
            _ => return Err(ParseError::unexpected_token("expression", &token).into()),
        };
        self.operands.push(node);
        Ok(())
    }

    /// Arguments of a call; the stream is on `(`.
    fn parse_arguments(&mut self) -> Result<Vec<NodeId>> {
        let mut arguments = Vec::new();
        self.stream.next();
        if self.stream.current().is_punctuation(")") {
            self.stream.next();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_expression()?);
            let token = self.stream.current().clone();
            if token.is_punctuation(",") {
                let after = self.stream.next();
                if after.is_punctuation(")") {
                    return Err(SyntaxError::unexpected_token(
                        "argument",
                        &after.describe(),
                        after.line,
                        after.span,
                    )
                    .into());
                }
            } else if token.is_punctuation(")") {
                self.stream.next();
                return Ok(arguments);
            } else {
                return Err(ParseError::unexpected_token("\",\" or \")\"", &token).into());
            }
        }
    }

    /// Array literal; the stream is on `[`. A trailing comma is allowed.
    fn parse_array(&mut self) -> Result<NodeId> {
        let line = self.stream.current().line;
        let mut entries = Vec::new();
        self.stream.next();

        loop {
            if self.stream.current().is_punctuation("]") {
                self.stream.next();
                break;
            }

            let first = self.parse_expression()?;
            let current = self.stream.current();
            let entry = if current.is_punctuation(":") || current.is_punctuation("=>") {
                self.stream.next();
                ArrayEntry {
                    key: Some(first),
                    value: self.parse_expression()?,
                }
            } else {
                ArrayEntry {
                    key: None,
                    value: first,
                }
            };
            entries.push(entry);

            let token = self.stream.current().clone();
            if token.is_punctuation(",") {
                self.stream.next();
            } else if token.is_punctuation("]") {
                self.stream.next();
                break;
            } else {
                return Err(ParseError::unexpected_token("\",\" or \"]\"", &token).into());
            }
        }

        Ok(self.ast.add(NodeKind::Array { entries }, line))
    }

    /// Indexing and postfix operators applied to the operand just pushed.
    fn parse_postfix(&mut self) -> Result<()> {
        let env = self.env;
        loop {
            let token = self.stream.current().clone();

            if token.is_punctuation("[") {
                // `a.b[1]` indexes `a.b`, so pending access binds first.
                self.reduce_while(Some(ACCESS_PRECEDENCE))?;
                let collection = self.pop_operand(token.line)?;
                self.stream.next();
                let key = self.parse_expression()?;
                self.stream.expect_current(TokenKind::Punctuation, Some("]"))?;
                self.stream.next();
                let node = self
                    .ast
                    .add(NodeKind::ArrayIndex { collection, key }, token.line);
                self.operands.push(node);
                continue;
            }

            if token.kind == TokenKind::Operator {
                if let Some(operator) = env.operators().postfix(&token.value) {
                    self.reduce_while(Some(operator.precedence()))?;
                    let operand = self.pop_operand(token.line)?;
                    self.stream.next();
                    let node = operator.handler().build(
                        self.ast,
                        operator.id(),
                        &token.value,
                        vec![operand],
                        token.line,
                    )?;
                    self.operands.push(node);
                    continue;
                }
            }

            return Ok(());
        }
    }

    /// Reduce stacked operators down to the sentinel, or only those binding
    /// at least as tightly as `min_precedence`.
    fn reduce_while(&mut self, min_precedence: Option<u32>) -> Result<()> {
        while let Some(Some(top)) = self.operators.last() {
            if min_precedence.is_some_and(|min| top.precedence < min) {
                break;
            }
            self.reduce_top()?;
        }
        Ok(())
    }

    fn reduce_top(&mut self) -> Result<()> {
        let env = self.env;
        let Some(Some(entry)) = self.operators.pop() else {
            return Ok(());
        };
        let operands = match entry.arity {
            Arity::Unary => vec![self.pop_operand(entry.line)?],
            Arity::Binary => {
                let right = self.pop_operand(entry.line)?;
                let left = self.pop_operand(entry.line)?;
                vec![left, right]
            }
        };
        let operator = env.operators().get(entry.id).ok_or_else(|| {
            ParseError::new(
                format!("Unknown operator \"{}\"", entry.symbol),
                entry.line,
                entry.span,
                ParseErrorCode::UnexpectedToken,
            )
        })?;
        let node =
            operator
                .handler()
                .build(self.ast, entry.id, &entry.symbol, operands, entry.line)?;
        self.operands.push(node);
        Ok(())
    }

    fn pop_operand(&mut self, line: u32) -> Result<NodeId> {
        self.operands.pop().ok_or_else(|| {
            ParseError::new(
                "Missing operand",
                line,
                self.stream.current().span,
                ParseErrorCode::InvalidOperand,
            )
            .into()
        })
    }

    fn validate_functions(&self, root: NodeId) -> Result<()> {
        let nodes = std::iter::once(root).chain(self.ast.descendants(root));
        for id in nodes {
            if let NodeKind::Function {
                name,
                receiver: None,
                ..
            } = self.ast.kind(id)
            {
                if self.env.function(name).is_none() {
                    return Err(ParseError::new(
                        format!("Unknown function \"{}\"", name),
                        self.ast.line(id),
                        Span::default(),
                        ParseErrorCode::UnknownFunction,
                    )
                    .into());
                }
            }
        }
        Ok(())
    }
}
