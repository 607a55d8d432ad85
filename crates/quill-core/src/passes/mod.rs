//! AST passes registered by the core extension.

mod context_usage;
mod loop_temp;
mod safe_output;

pub use context_usage::ContextUsageVisitor;
pub use loop_temp::LoopTempVisitor;
pub use safe_output::{escape_strategy, SafeOutputVisitor};

use quill_compiler::{Ast, NodeId, NodeKind, NodeVisitor, VisitorFactory};

pub fn all() -> Vec<VisitorFactory> {
    vec![
        Box::new(|| Box::new(SafeOutputVisitor::default()) as Box<dyn NodeVisitor>),
        Box::new(|| Box::new(ContextUsageVisitor) as Box<dyn NodeVisitor>),
        Box::new(|| Box::new(LoopTempVisitor::default()) as Box<dyn NodeVisitor>),
    ]
}

/// A `Root` that is the body of a generated method.
fn is_method_body(ast: &Ast, node: NodeId) -> bool {
    matches!(ast.kind(node), NodeKind::Root { .. })
        && ast
            .parent(node)
            .is_some_and(|p| matches!(ast.kind(p), NodeKind::Class { .. }))
}
