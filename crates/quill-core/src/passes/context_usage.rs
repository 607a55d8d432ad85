use super::is_method_body;
use quill_compiler::{Ast, NodeId, NodeKind, NodeVisitor, VisitAction, VisitContext};
use tracing::trace;

/// Clears `uses_environment` on method bodies that never dispatch through
/// the function registry, so no `env` local is emitted for them.
pub struct ContextUsageVisitor;

impl NodeVisitor for ContextUsageVisitor {
    fn priority(&self) -> i32 {
        50
    }

    fn leave(&mut self, ast: &mut Ast, node: NodeId, ctx: &VisitContext<'_>) -> VisitAction {
        if !is_method_body(ast, node) {
            return VisitAction::Keep;
        }
        let used = ast.descendants(node).into_iter().any(|id| match ast.kind(id) {
            NodeKind::Function {
                name,
                receiver: None,
                ..
            } => ctx
                .env
                .function(name)
                .is_some_and(|f| f.uses_environment()),
            _ => false,
        });
        trace!(node = node.index(), used, "environment usage");
        if let NodeKind::Root {
            uses_environment, ..
        } = ast.kind_mut(node)
        {
            *uses_environment = used;
        }
        VisitAction::Keep
    }
}
