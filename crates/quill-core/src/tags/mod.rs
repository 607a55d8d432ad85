//! The core tag set.

mod control;
mod statement;
mod template;

pub use control::{ForArguments, ForTag, IfTag, SwitchTag};
pub use statement::{
    AutofilterTag, CaptureTag, DoTag, PrintTag, RawTag, SetArguments, SetTag, UnsetTag,
};
pub use template::{
    BlockTag, DefineTag, DisplayTag, EmbedTag, ExtendsTag, ImportTag, IncludeTag, ListTag,
    ParentTag,
};

use indexmap::IndexMap;
use quill_compiler::{
    CompileError, CompileErrorCode, CompileResult, Compiler, NodeId, Parser, Result, Tag, Value,
};
use smol_str::SmolStr;

pub fn all() -> Vec<Box<dyn Tag>> {
    vec![
        Box::new(IfTag),
        Box::new(ForTag),
        Box::new(SwitchTag),
        Box::new(BlockTag),
        Box::new(DefineTag),
        Box::new(DisplayTag),
        Box::new(ParentTag),
        Box::new(ExtendsTag),
        Box::new(IncludeTag),
        Box::new(EmbedTag),
        Box::new(ListTag),
        Box::new(ImportTag),
        Box::new(SetTag),
        Box::new(UnsetTag),
        Box::new(DoTag),
        Box::new(CaptureTag),
        Box::new(PrintTag),
        Box::new(AutofilterTag),
        Box::new(RawTag),
    ]
}

fn children() -> IndexMap<SmolStr, NodeId> {
    IndexMap::new()
}

fn data() -> IndexMap<SmolStr, Value> {
    IndexMap::new()
}

/// A required child of a tag node.
fn child(compiler: &Compiler<'_>, node: NodeId, key: &str) -> CompileResult<NodeId> {
    let ast = compiler.ast();
    ast.tag_child(node, key).ok_or_else(|| {
        CompileError::new(
            format!("Tag node is missing \"{}\"", key),
            ast.line(node),
            CompileErrorCode::InvalidNode,
        )
    })
}

/// The `name` data entry of a tag node.
fn name_data<'a>(compiler: &Compiler<'a>, node: NodeId) -> CompileResult<&'a str> {
    let ast = compiler.ast();
    ast.tag_data(node, "name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CompileError::new(
                "Tag node is missing its name",
                ast.line(node),
                CompileErrorCode::InvalidNode,
            )
        })
}

/// An optional `using EXPR` clause, as the `using` child.
fn parse_using(parser: &mut Parser<'_>) -> Result<IndexMap<SmolStr, NodeId>> {
    let mut nodes = children();
    if parser.next_keyword_if("using") {
        nodes.insert("using".into(), parser.parse_expression()?);
    }
    Ok(nodes)
}
