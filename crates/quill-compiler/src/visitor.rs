//! AST passes.
//!
//! Visitors run between parsing and code generation. They are grouped by
//! priority, highest first; each group gets one depth-first traversal in
//! which every visitor sees `enter` before the children and `leave` after.

use crate::ast::{Ast, NodeId};
use crate::environment::Environment;
use tracing::debug;

/// What to do with a node after `leave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitAction {
    Keep,
    /// Remove the node from a list-held slot of its parent.
    Drop,
}

/// Read-only state shared by all visitors of one compilation.
pub struct VisitContext<'a> {
    pub env: &'a Environment,
    pub template_name: &'a str,
}

/// A pass over the AST.
///
/// A fresh instance is created per compilation, so visitors may keep state
/// across `enter`/`leave` calls.
pub trait NodeVisitor {
    /// Higher priorities run in earlier traversals.
    fn priority(&self) -> i32 {
        0
    }

    fn enter(&mut self, _ast: &mut Ast, _node: NodeId, _ctx: &VisitContext<'_>) {}

    fn leave(&mut self, _ast: &mut Ast, _node: NodeId, _ctx: &VisitContext<'_>) -> VisitAction {
        VisitAction::Keep
    }
}

/// Creates a visitor instance for one compilation.
pub type VisitorFactory = Box<dyn Fn() -> Box<dyn NodeVisitor> + Send + Sync>;

/// Runs visitors over an AST in priority groups.
pub struct NodeTraverser {
    groups: Vec<(i32, Vec<Box<dyn NodeVisitor>>)>,
}

impl NodeTraverser {
    pub fn new(visitors: Vec<Box<dyn NodeVisitor>>) -> Self {
        let mut groups: Vec<(i32, Vec<Box<dyn NodeVisitor>>)> = Vec::new();
        for visitor in visitors {
            let priority = visitor.priority();
            match groups.iter_mut().find(|(p, _)| *p == priority) {
                Some((_, group)) => group.push(visitor),
                None => groups.push((priority, vec![visitor])),
            }
        }
        groups.sort_by(|a, b| b.0.cmp(&a.0));
        Self { groups }
    }

    /// Run every group over the tree rooted at `root`.
    pub fn traverse(&mut self, ast: &mut Ast, root: NodeId, ctx: &VisitContext<'_>) {
        for (priority, group) in &mut self.groups {
            debug!(priority = *priority, visitors = group.len(), "running passes");
            visit(group, ast, root, ctx);
        }
    }
}

fn visit(
    group: &mut [Box<dyn NodeVisitor>],
    ast: &mut Ast,
    node: NodeId,
    ctx: &VisitContext<'_>,
) -> VisitAction {
    for visitor in group.iter_mut() {
        visitor.enter(ast, node, ctx);
    }

    // Children are read after `enter`, which may have replaced some.
    let mut dropped = Vec::new();
    for child in ast.children(node) {
        if visit(group, ast, child, ctx) == VisitAction::Drop {
            dropped.push(child);
        }
    }
    if !dropped.is_empty() {
        ast.remove_children(node, &dropped);
    }

    let mut action = VisitAction::Keep;
    for visitor in group.iter_mut().rev() {
        if visitor.leave(ast, node, ctx) == VisitAction::Drop {
            action = VisitAction::Drop;
        }
    }
    action
}
