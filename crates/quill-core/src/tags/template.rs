//! Inheritance and composition: blocks, `extends`, `include`, `embed`,
//! `list` and `import`.

use super::{child, children, data, name_data, parse_using};
use quill_compiler::{
    CompileResult, Compiler, NodeId, ParseErrorCode, Parser, Result, Tag, TokenKind, Value,
};

/// `block NAME … endblock`: defines a block and renders it in place.
pub struct BlockTag;

impl Tag for BlockTag {
    fn name(&self) -> &'static str {
        "block"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let name = define(parser, "block", line)?;
        let mut values = data();
        values.insert("name".into(), Value::String(name.to_string()));
        Ok(Some(parser.tag_node(self.name(), values, children(), line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let name = name_data(compiler, node)?;
        compiler
            .indented("this.renderBlock(")
            .string(name)
            .add(", context);");
        Ok(())
    }
}

/// `define NAME … enddefine`: defines a block without rendering it.
pub struct DefineTag;

impl Tag for DefineTag {
    fn name(&self) -> &'static str {
        "define"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        define(parser, "define", line)?;
        Ok(None)
    }

    // The body lives on the class as a block; no node is left in place.
    fn compile(&self, _: &mut Compiler<'_>, _: NodeId) -> CompileResult<()> {
        Ok(())
    }
}

/// Parse `NAME … end<tag>` and register the body as a block.
fn define(parser: &mut Parser<'_>, tag: &str, line: u32) -> Result<smol_str::SmolStr> {
    let end = parser.closing_tag(tag);
    parser.enter_args()?;
    let name = parser.expect_identifier()?;
    parser.expect_block_end()?;

    parser.push_block(name.clone());
    let (body, _) = parser.parse_body(&[end.as_str()])?;
    parser.pop_block();
    parser.close_tag()?;

    parser.define_block(name.clone(), body, line)?;
    Ok(name)
}

/// `display NAME [using EXPR]`: renders a block defined anywhere in the
/// inheritance chain.
pub struct DisplayTag;

impl Tag for DisplayTag {
    fn name(&self) -> &'static str {
        "display"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;
        let name = parser.expect_identifier()?;
        let nodes = parse_using(parser)?;
        parser.expect_block_end()?;

        let mut values = data();
        values.insert("name".into(), Value::String(name.to_string()));
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let name = name_data(compiler, node)?;
        let using = compiler.ast().tag_child(node, "using");
        compiler.indented("this.renderBlock(").string(name).add(", ");
        compiler.compile_context(using)?;
        compiler.add(");");
        Ok(())
    }
}

/// `parent [using EXPR]`: renders the overridden version of the enclosing
/// block.
pub struct ParentTag;

impl Tag for ParentTag {
    fn name(&self) -> &'static str {
        "parent"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let Some(block) = parser.current_block().cloned() else {
            return Err(parser
                .error(
                    "The parent tag is only allowed inside a block",
                    ParseErrorCode::InvalidScope,
                )
                .into());
        };
        parser.enter_args()?;
        let nodes = parse_using(parser)?;
        parser.expect_block_end()?;

        let mut values = data();
        values.insert("name".into(), Value::String(block.to_string()));
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let name = name_data(compiler, node)?;
        let using = compiler.ast().tag_child(node, "using");
        compiler
            .indented("this.renderParentBlock(")
            .string(name)
            .add(", ");
        compiler.compile_context(using)?;
        compiler.add(");");
        Ok(())
    }
}

/// `extends EXPR`: only at the top level of the main template, once.
pub struct ExtendsTag;

impl Tag for ExtendsTag {
    fn name(&self) -> &'static str {
        "extends"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        if !parser.is_main_scope() {
            return Err(parser
                .error(
                    "The extends tag is only allowed at the top level of a template",
                    ParseErrorCode::InvalidScope,
                )
                .into());
        }
        parser.enter_args()?;
        let parent = parser.parse_expression()?;
        parser.expect_block_end()?;
        parser.set_parent_template(parent, line)?;
        Ok(None)
    }

    // Recorded on the class as its parent template; no node is left in place.
    fn compile(&self, _: &mut Compiler<'_>, _: NodeId) -> CompileResult<()> {
        Ok(())
    }
}

/// `include EXPR [using EXPR]`
pub struct IncludeTag;

impl Tag for IncludeTag {
    fn name(&self) -> &'static str {
        "include"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;
        let template = parser.parse_expression()?;
        let mut nodes = parse_using(parser)?;
        parser.expect_block_end()?;

        nodes.insert("template".into(), template);
        Ok(Some(parser.tag_node(self.name(), data(), nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let template = child(compiler, node, "template")?;
        let using = compiler.ast().tag_child(node, "using");
        compiler.indented("this.include(");
        compiler.compile_node(template)?;
        compiler.add(", ");
        compiler.compile_context(using)?;
        compiler.add(");");
        Ok(())
    }
}

/// `embed EXPR [using EXPR] … endembed`
///
/// The body becomes an anonymous template extending EXPR, whose blocks
/// override the parent's; it is rendered in place.
pub struct EmbedTag;

impl Tag for EmbedTag {
    fn name(&self) -> &'static str {
        "embed"
    }

    fn has_closing_tag(&self) -> bool {
        true
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        let end = parser.closing_tag("embed");
        parser.enter_args()?;
        let parent = parser.parse_expression()?;
        let nodes = parse_using(parser)?;
        parser.expect_block_end()?;

        parser.begin_embedded(parent, line);
        let (body, _) = parser.parse_body(&[end.as_str()])?;
        let name = parser.end_embedded(body)?;
        parser.close_tag()?;

        let mut values = data();
        values.insert("name".into(), Value::String(name.to_string()));
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let name = name_data(compiler, node)?;
        let using = compiler.ast().tag_child(node, "using");
        compiler
            .indented("this.renderEmbedded(")
            .string(name)
            .add(", ");
        compiler.compile_context(using)?;
        compiler.add(");");
        Ok(())
    }
}

/// `list ITEMS using TEMPLATE`: renders TEMPLATE once per item, with the
/// item bound to `item`.
pub struct ListTag;

impl Tag for ListTag {
    fn name(&self) -> &'static str {
        "list"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;
        let items = parser.parse_expression()?;
        parser.expect_keyword("using")?;
        let template = parser.parse_expression()?;
        parser.expect_block_end()?;

        let mut nodes = children();
        nodes.insert("items".into(), items);
        nodes.insert("template".into(), template);
        Ok(Some(parser.tag_node(self.name(), data(), nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let items = child(compiler, node, "items")?;
        let template = child(compiler, node, "template")?;
        compiler.indented("this.renderList(");
        compiler.compile_node(items)?;
        compiler.add(", ");
        compiler.compile_node(template)?;
        compiler.add(", context);");
        Ok(())
    }
}

/// `import [NAME, … from] EXPR`: makes blocks of another template
/// available to this one, all of them when no names are given.
pub struct ImportTag;

impl Tag for ImportTag {
    fn name(&self) -> &'static str {
        "import"
    }

    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>> {
        parser.enter_args()?;

        let mut names = Vec::new();
        if has_import_list(parser) {
            loop {
                names.push(parser.expect_identifier()?.to_string());
                if parser.next_keyword_if("from") {
                    break;
                }
                parser
                    .stream()
                    .expect_current(TokenKind::Punctuation, Some(","))?;
                parser.stream().next();
            }
        }
        let template = parser.parse_expression()?;
        parser.expect_block_end()?;

        let mut values = data();
        if !names.is_empty() {
            values.insert("names".into(), Value::strings(names));
        }
        let mut nodes = children();
        nodes.insert("template".into(), template);
        Ok(Some(parser.tag_node(self.name(), values, nodes, line)))
    }

    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()> {
        let template = child(compiler, node, "template")?;
        let names = compiler.ast().tag_data(node, "names");
        compiler.indented("this.importBlocks(");
        compiler.compile_node(template)?;
        compiler.add(", ");
        match names {
            Some(names) => compiler.compile_data(names),
            None => compiler.add("null"),
        };
        compiler.add(");");
        Ok(())
    }
}

/// Whether the arguments start with `NAME,` or `NAME from`.
fn has_import_list(parser: &mut Parser<'_>) -> bool {
    let stream = parser.stream();
    if !stream.test(TokenKind::Identifier, None) {
        return false;
    }
    let next = stream.peek(1);
    next.is_punctuation(",") || next.is(TokenKind::Identifier, Some("from"))
}
