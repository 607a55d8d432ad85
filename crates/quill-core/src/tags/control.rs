//! Control flow: `if`, `for` and `switch`.

use super::{child, children, data};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use quill_compiler::{
    ArgumentContext, ArgumentTokenizer, CompileResult, Compiler, NodeId, ParseErrorCode, Parser,
    Result, Tag, TokenKind, Value,
};
use quill_lexer::{SyntaxResult, Token};
use regex::Regex;
use smol_str::SmolStr;

/// `if cond … [elseif cond …]* [else …] endif`
pub struct IfTag;

impl Tag for IfTag {
    fn name(&self) -> &'static str {
        "if"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn sub_tags(&self) -> &'static [&'static str] {
        &["elseif", "else"]
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let end = parser.closing_tag("if");
        let mut nodes = children();

        parser.enter_args()?;
        let mut condition = parser.parse_expression()?;
        parser.expect_block_end()?;

        for branch in 0.. {
            let (body, ended) = parser.parse_body(&["elseif", "else", end.as_str()])?;
            nodes.insert(format!("condition_{}", branch).into(), condition);
            nodes.insert(format!("body_{}", branch).into(), body);

            match ended.as_str() {
                "elseif" => {
                    parser.enter_args()?;
                    condition = parser.parse_expression()?;
                    parser.expect_block_end()?;
                }
                "else" => {
                    parser.close_tag()?;
                    let (otherwise, _) = parser.parse_body(&[end.as_str()])?;
                    nodes.insert("else".into(), otherwise);
                    break;
                }
                _ => break,
            }
        }
        parser.close_tag()?;

        Ok(Some(parser.tag_node(self.name(), IndexMap::new(), nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let ast = compiler.ast();
        for branch in 0.. {
            let Some(condition) = ast.tag_child(node, &format!("condition_{}", branch)) else {
                break;
            };
            let body = child(compiler, node, &format!("body_{}", branch))?;
            compiler.indented(if branch == 0 { "if (" } else { "} else if (" });
            compiler.compile_node(condition)?;
            compiler.add(") {");
            compiler.indent();
            compiler.compile_body(body)?;
            compiler.outdent();
        }
        if let Some(otherwise) = ast.tag_child(node, "else") {
            compiler.indented("} else {");
            compiler.indent();
            compiler.compile_body(otherwise)?;
            compiler.outdent();
        }
        compiler.indented("}");
        Ok(())
    }
}

static FOR_ARGUMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([A-Za-z_][A-Za-z0-9_]*)(?:\s*(:)\s*([A-Za-z_][A-Za-z0-9_]*))?\s+(in)\b",
    )
    .expect("for arguments pattern is valid")
});

/// Lexes `[key:]value in` by position so loop variables may share a name
/// with a word operator.
pub struct ForArguments;

impl ArgumentTokenizer for ForArguments {
    fn tokenize(&self, args: &str, ctx: &ArgumentContext<'_>) -> SyntaxResult<Vec<Token>> {
        let Some(captures) = FOR_ARGUMENTS.captures(args) else {
            return Err(ctx.error("Expected \"[key:]value in source\"", 0));
        };

        let mut tokens = Vec::new();
        for (group, kind) in [
            (1, TokenKind::Identifier),
            (2, TokenKind::Punctuation),
            (3, TokenKind::Identifier),
            (4, TokenKind::Identifier),
        ] {
            if let Some(m) = captures.get(group) {
                tokens.push(ctx.token(kind, m.as_str(), m.start()));
            }
        }

        let rest = captures.get(0).map_or(0, |m| m.end());
        tokens.extend(ctx.expression(&args[rest..], rest)?);
        Ok(tokens)
    }
}

/// `for [key:]value in source … [else …] endfor`
///
/// The `else` body runs when the source yields no items.
pub struct ForTag;

impl Tag for ForTag {
    fn name(&self) -> &'static str {
        "for"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn sub_tags(&self) -> &'static [&'static str] {
        &["else"]
    }

    fn argument_tokenizer(&self) -> Option<&dyn ArgumentTokenizer> {
        Some(&ForArguments)
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let end = parser.closing_tag("for");

        parser.enter_args()?;
        let first = parser.expect_identifier()?;
        let (key, value) = if parser.next_punctuation_if(":") {
            (Some(first), parser.expect_identifier()?)
        } else {
            (None, first)
        };
        parser.expect_keyword("in")?;
        let source = parser.parse_expression()?;
        parser.expect_block_end()?;

        let mut nodes = children();
        nodes.insert("source".into(), source);
        let (body, ended) = parser.parse_body(&["else", end.as_str()])?;
        nodes.insert("body".into(), body);
        if ended == "else" {
            parser.close_tag()?;
            let (otherwise, _) = parser.parse_body(&[end.as_str()])?;
            nodes.insert("else".into(), otherwise);
        }
        parser.close_tag()?;

        let mut values = data();
        values.insert(
            "key".into(),
            key.map_or(Value::Null, |k| Value::String(k.to_string())),
        );
        values.insert("value".into(), Value::String(value.to_string()));
        values.insert("save_context".into(), Value::Bool(true));
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let ast = compiler.ast();
        let source = child(compiler, node, "source")?;
        let body = child(compiler, node, "body")?;
        let otherwise = ast.tag_child(node, "else");
        let save_context = ast
            .tag_data(node, "save_context")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let key_name = ast.tag_data(node, "key").and_then(Value::as_str);
        let value_name = ast.tag_data(node, "value").and_then(Value::as_str).unwrap_or("_");

        let saved = compiler.unique_name("loop");
        let key = compiler.unique_name("key");
        let value = compiler.unique_name("value");
        let iterated = compiler.unique_name("iterated");

        if save_context {
            compiler.indented(&format!("const {} = context.save();", saved));
        }
        if otherwise.is_some() {
            compiler.indented(&format!("let {} = false;", iterated));
        }
        compiler.indented(&format!("for (const [{}, {}] of this.iterate(", key, value));
        compiler.compile_node(source)?;
        compiler.add(")) {");
        compiler.indent();
        if otherwise.is_some() {
            compiler.indented(&format!("{} = true;", iterated));
        }
        if let Some(key_name) = key_name {
            compiler.indented("context.set(").string(key_name).add(&format!(", {});", key));
        }
        compiler.indented("context.set(").string(value_name).add(&format!(", {});", value));
        compiler.compile_body(body)?;
        compiler.outdent();
        compiler.indented("}");
        if save_context {
            compiler.indented(&format!("context.restore({});", saved));
        }
        if let Some(otherwise) = otherwise {
            compiler.indented(&format!("if (!{}) {{", iterated));
            compiler.indent();
            compiler.compile_body(otherwise)?;
            compiler.outdent();
            compiler.indented("}");
        }
        Ok(())
    }
}

/// `switch subject [case value …]* [else …] endswitch`
///
/// Only whitespace may appear between the tag and the first `case`.
pub struct SwitchTag;

impl Tag for SwitchTag {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn sub_tags(&self) -> &'static [&'static str] {
        &["case", "else"]
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let end = parser.closing_tag("switch");
        let mut nodes = children();

        parser.enter_args()?;
        let subject = parser.parse_expression()?;
        parser.expect_block_end()?;
        nodes.insert("subject".into(), subject);

        while parser.stream().test(TokenKind::Text, None) {
            if !parser.stream().current().value.trim().is_empty() {
                return Err(parser
                    .error(
                        "Only whitespace may appear before the first case",
                        ParseErrorCode::UnexpectedToken,
                    )
                    .into());
            }
            parser.stream().next();
        }

        let mut ended: SmolStr = parser.stream().current().value.clone();
        if !parser.stream().test(TokenKind::Tag, None)
            || !matches!(ended.as_str(), "case" | "else") && ended != end
        {
            let expected = format!("\"case\", \"else\" or \"{}\"", end);
            return Err(quill_compiler::ParseError::unexpected_token(
                &expected,
                parser.stream().current(),
            )
            .into());
        }

        let mut case = 0;
        while ended == "case" {
            parser.enter_args()?;
            let value = parser.parse_expression()?;
            parser.expect_block_end()?;
            let (body, next) = parser.parse_body(&["case", "else", end.as_str()])?;
            nodes.insert(format!("case_{}", case).into(), value);
            nodes.insert(format!("body_{}", case).into(), body);
            ended = next;
            case += 1;
        }
        if ended == "else" {
            parser.close_tag()?;
            let (otherwise, _) = parser.parse_body(&[end.as_str()])?;
            nodes.insert("else".into(), otherwise);
        }
        parser.close_tag()?;

        Ok(Some(parser.tag_node(self.name(), data(), nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let ast = compiler.ast();
        let subject = child(compiler, node, "subject")?;
        let local = compiler.unique_name("switch");

        compiler.indented(&format!("const {} = ", local));
        compiler.compile_node(subject)?;
        compiler.add(";");

        let mut branches = 0;
        for case in 0.. {
            let Some(value) = ast.tag_child(node, &format!("case_{}", case)) else {
                break;
            };
            let body = child(compiler, node, &format!("body_{}", case))?;
            let open = if case == 0 { "if (" } else { "} else if (" };
            compiler.indented(open).add(&format!("{} == ", local));
            compiler.compile_node(value)?;
            compiler.add(") {");
            compiler.indent();
            compiler.compile_body(body)?;
            compiler.outdent();
            branches += 1;
        }
        if let Some(otherwise) = ast.tag_child(node, "else") {
            if branches == 0 {
                compiler.compile_body(otherwise)?;
                return Ok(());
            }
            compiler.indented("} else {");
            compiler.indent();
            compiler.compile_body(otherwise)?;
            compiler.outdent();
        }
        if branches > 0 {
            compiler.indented("}");
        }
        Ok(())
    }
}
