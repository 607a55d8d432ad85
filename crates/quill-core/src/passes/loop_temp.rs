use super::is_method_body;
use quill_compiler::{Ast, NodeId, NodeKind, NodeVisitor, VisitAction, VisitContext, Value};

/// Lets only the outermost `for` of a method save and restore the context.
///
/// A `for` counts as nested only inside another loop's body; its `else`
/// branch runs after the restore, so loops there save their own context.
#[derive(Default)]
pub struct LoopTempVisitor {
    /// Open loop bodies per method body being visited.
    depths: Vec<usize>,
}

fn is_for(ast: &Ast, node: NodeId) -> bool {
    matches!(ast.kind(node), NodeKind::Tag { tag, .. } if tag == "for")
}

fn is_loop_body(ast: &Ast, node: NodeId) -> bool {
    ast.parent(node)
        .is_some_and(|p| is_for(ast, p) && ast.tag_child(p, "body") == Some(node))
}

impl NodeVisitor for LoopTempVisitor {
    fn priority(&self) -> i32 {
        50
    }

    fn enter(&mut self, ast: &mut Ast, node: NodeId, _: &VisitContext<'_>) {
        if is_method_body(ast, node) {
            self.depths.push(0);
            return;
        }
        let Some(depth) = self.depths.last_mut() else {
            return;
        };
        if is_loop_body(ast, node) {
            *depth += 1;
        } else if is_for(ast, node) && *depth > 0 {
            if let NodeKind::Tag { data, .. } = ast.kind_mut(node) {
                data.insert("save_context".into(), Value::Bool(false));
            }
        }
    }

    fn leave(&mut self, ast: &mut Ast, node: NodeId, _: &VisitContext<'_>) -> VisitAction {
        if is_method_body(ast, node) {
            self.depths.pop();
        } else if is_loop_body(ast, node) {
            if let Some(depth) = self.depths.last_mut() {
                *depth = depth.saturating_sub(1);
            }
        }
        VisitAction::Keep
    }
}
