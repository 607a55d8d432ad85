use quill_compiler::{
    Ast, AutofilterMode, Environment, NodeId, NodeKind, NodeVisitor, VisitAction, VisitContext,
    Value,
};
use tracing::trace;

/// The escaping strategy `auto` picks for a template, from its extension.
pub fn escape_strategy(template_name: &str) -> Option<&'static str> {
    let extension = template_name.rsplit_once('.')?.1;
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => Some("html"),
        "js" => Some("js"),
        "css" => Some("css"),
        "xml" => Some("xml"),
        _ => None,
    }
}

/// Wraps printed expressions in `filter(expr, strategy)` according to the
/// autofilter mode in effect, and drops prints of empty strings.
#[derive(Default)]
pub struct SafeOutputVisitor {
    modes: Vec<AutofilterMode>,
}

impl SafeOutputVisitor {
    fn strategy(&self, ctx: &VisitContext<'_>) -> Option<&'static str> {
        let mode = self
            .modes
            .last()
            .copied()
            .unwrap_or(ctx.env.options().autofilter);
        match mode {
            AutofilterMode::On => Some("html"),
            AutofilterMode::Off => None,
            AutofilterMode::Auto => escape_strategy(ctx.template_name),
        }
    }
}

/// The mode an `autofilter` tag, or a block or embed body defined inside
/// one, sets for its subtree.
fn autofilter_mode(ast: &Ast, node: NodeId) -> Option<AutofilterMode> {
    match ast.kind(node) {
        NodeKind::Tag { tag, data, .. } if tag == "autofilter" => data
            .get("mode")
            .and_then(Value::as_str)
            .and_then(AutofilterMode::parse),
        NodeKind::Root { autofilter, .. } => *autofilter,
        _ => None,
    }
}

/// Whether an expression never needs escaping.
fn is_safe(env: &Environment, ast: &Ast, node: NodeId) -> bool {
    match ast.kind(node) {
        NodeKind::Data(_) => true,
        NodeKind::Function {
            name,
            receiver: None,
            ..
        } => env.function(name).is_some_and(|f| f.options().is_safe),
        NodeKind::Operator { operands, .. } => {
            operands.iter().all(|operand| is_safe(env, ast, *operand))
        }
        _ => false,
    }
}

impl NodeVisitor for SafeOutputVisitor {
    fn priority(&self) -> i32 {
        100
    }

    fn enter(&mut self, ast: &mut Ast, node: NodeId, ctx: &VisitContext<'_>) {
        if matches!(ast.kind(node), NodeKind::Class { .. }) {
            self.modes.clear();
            self.modes.push(ctx.env.options().autofilter);
        } else if let Some(mode) = autofilter_mode(ast, node) {
            self.modes.push(mode);
        }
    }

    fn leave(&mut self, ast: &mut Ast, node: NodeId, ctx: &VisitContext<'_>) -> VisitAction {
        if autofilter_mode(ast, node).is_some() {
            self.modes.pop();
            return VisitAction::Keep;
        }
        let NodeKind::Print {
            expression,
            is_safe: false,
        } = *ast.kind(node)
        else {
            return VisitAction::Keep;
        };

        if matches!(ast.kind(expression), NodeKind::Data(Value::String(s)) if s.is_empty()) {
            return VisitAction::Drop;
        }

        let safe = is_safe(ctx.env, ast, expression);
        let strategy = self.strategy(ctx);
        let wrapped = match strategy {
            Some(strategy) if !safe && ctx.env.function("filter").is_some() => {
                let line = ast.line(expression);
                let argument = ast.add(NodeKind::Data(Value::String(strategy.to_string())), line);
                let filter = ast.add(
                    NodeKind::Function {
                        name: "filter".into(),
                        arguments: vec![expression, argument],
                        receiver: None,
                    },
                    line,
                );
                ast.adopt(filter);
                trace!(node = node.index(), strategy, "escaping print");
                Some(filter)
            }
            _ => None,
        };

        if let NodeKind::Print {
            expression,
            is_safe,
        } = ast.kind_mut(node)
        {
            if let Some(filter) = wrapped {
                *expression = filter;
            }
            *is_safe = safe || wrapped.is_some();
        }
        ast.adopt(node);
        VisitAction::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_follows_extension() {
        assert_eq!(escape_strategy("page.html"), Some("html"));
        assert_eq!(escape_strategy("dir/page.HTM"), Some("html"));
        assert_eq!(escape_strategy("app.js"), Some("js"));
        assert_eq!(escape_strategy("feed.xml"), Some("xml"));
        assert_eq!(escape_strategy("notes.txt"), None);
        assert_eq!(escape_strategy("README"), None);
    }
}
