//! Tag framework.

use crate::ast::NodeId;
use crate::compiler::Compiler;
use crate::error::{CompileResult, Result};
use crate::parser::Parser;
use quill_lexer::ArgumentTokenizer;

/// A block construct such as `if` or `for`.
///
/// One shared, stateless instance exists per tag kind. `parse` is called with
/// the stream positioned on the tag token and must leave it on the first
/// token after the tag (and after its closing tag, for block tags).
pub trait Tag: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the tag has a `<prefix><name>` closing form.
    fn has_closing_tag(&self) -> bool {
        false
    }

    /// Names like `else` that only appear inside this tag.
    fn sub_tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Tokenizer for arguments that are not plain expressions.
    fn argument_tokenizer(&self) -> Option<&dyn ArgumentTokenizer> {
        None
    }

    /// Parse one occurrence. `None` means the tag emits no node.
    fn parse(&self, parser: &mut Parser<'_>, line: u32) -> Result<Option<NodeId>>;

    /// Emit the statements for a node built by `parse`.
    fn compile(&self, compiler: &mut Compiler<'_>, node: NodeId) -> CompileResult<()>;
}
