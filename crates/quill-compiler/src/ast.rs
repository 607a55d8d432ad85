//! Template AST.
//!
//! Nodes live in an arena owned by [`Ast`] and refer to each other by
//! [`NodeId`]. Parent links are kept in a side table and updated whenever a
//! node is added or re-parented.

use crate::environment::AutofilterMode;
use crate::operator::OperatorId;
use indexmap::IndexMap;
use smol_str::SmolStr;

/// Index of a node in its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Literal data carried by `Data` nodes and tag data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered entries, each with an optional key.
    Array(Vec<(Option<Value>, Value)>),
}

impl Value {
    /// Parse the text of a `Literal` token.
    pub fn from_literal(text: &str) -> Value {
        match text {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => match text.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => text.parse::<f64>().map_or(Value::Null, Value::Float),
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Array of strings, e.g. a list of names.
    pub fn strings<I, S>(items: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Array(
            items
                .into_iter()
                .map(|s| (None, Value::String(s.into())))
                .collect(),
        )
    }
}

/// An `[key: value]` entry of an array literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayEntry {
    pub key: Option<NodeId>,
    pub value: NodeId,
}

/// A node and the line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: u32,
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Literal value.
    Data(Value),
    /// Name lookup, or a property of `receiver`.
    Identifier {
        name: SmolStr,
        receiver: Option<NodeId>,
    },
    /// `$name` reference.
    Variable { name: SmolStr },
    ArrayIndex { collection: NodeId, key: NodeId },
    Array { entries: Vec<ArrayEntry> },
    Operator {
        operator: OperatorId,
        /// The symbol as written, used to pick between aliases.
        symbol: SmolStr,
        operands: Vec<NodeId>,
    },
    /// Function call, or a method call on `receiver`.
    Function {
        name: SmolStr,
        arguments: Vec<NodeId>,
        receiver: Option<NodeId>,
    },
    Tag {
        tag: SmolStr,
        data: IndexMap<SmolStr, Value>,
        children: IndexMap<SmolStr, NodeId>,
    },
    Print { expression: NodeId, is_safe: bool },
    /// A statement list; method bodies and tag bodies.
    Root {
        children: Vec<NodeId>,
        /// Whether the generated method needs the environment local.
        uses_environment: bool,
        /// Autofilter mode where a block or embed body was defined, when
        /// that differs from the start of its method.
        autofilter: Option<AutofilterMode>,
    },
    Class {
        template_name: SmolStr,
        class_name: String,
        parent_template: Option<NodeId>,
        body: NodeId,
        blocks: IndexMap<SmolStr, NodeId>,
    },
    File { classes: Vec<NodeId> },
}

impl NodeKind {
    /// Child ids in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Data(_) | NodeKind::Variable { .. } => Vec::new(),
            NodeKind::Identifier { receiver, .. } => receiver.iter().copied().collect(),
            NodeKind::ArrayIndex { collection, key } => vec![*collection, *key],
            NodeKind::Array { entries } => entries
                .iter()
                .flat_map(|e| e.key.into_iter().chain(std::iter::once(e.value)))
                .collect(),
            NodeKind::Operator { operands, .. } => operands.clone(),
            NodeKind::Function {
                arguments,
                receiver,
                ..
            } => receiver.iter().chain(arguments.iter()).copied().collect(),
            NodeKind::Tag { children, .. } => children.values().copied().collect(),
            NodeKind::Print { expression, .. } => vec![*expression],
            NodeKind::Root { children, .. } => children.clone(),
            NodeKind::Class {
                parent_template,
                body,
                blocks,
                ..
            } => parent_template
                .iter()
                .chain(std::iter::once(body))
                .chain(blocks.values())
                .copied()
                .collect(),
            NodeKind::File { classes } => classes.clone(),
        }
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let swap = |slot: &mut NodeId| {
            if *slot == old {
                *slot = new;
                true
            } else {
                false
            }
        };
        let mut replaced = false;
        match self {
            NodeKind::Data(_) | NodeKind::Variable { .. } => {}
            NodeKind::Identifier { receiver, .. } => {
                if let Some(r) = receiver {
                    replaced |= swap(r);
                }
            }
            NodeKind::ArrayIndex { collection, key } => {
                replaced |= swap(collection);
                replaced |= swap(key);
            }
            NodeKind::Array { entries } => {
                for entry in entries {
                    if let Some(k) = &mut entry.key {
                        replaced |= swap(k);
                    }
                    replaced |= swap(&mut entry.value);
                }
            }
            NodeKind::Operator { operands, .. } => operands.iter_mut().for_each(|o| {
                replaced |= swap(o);
            }),
            NodeKind::Function {
                arguments,
                receiver,
                ..
            } => {
                if let Some(r) = receiver {
                    replaced |= swap(r);
                }
                arguments.iter_mut().for_each(|a| {
                    replaced |= swap(a);
                });
            }
            NodeKind::Tag { children, .. } => children.values_mut().for_each(|c| {
                replaced |= swap(c);
            }),
            NodeKind::Print { expression, .. } => replaced |= swap(expression),
            NodeKind::Root { children, .. } => children.iter_mut().for_each(|c| {
                replaced |= swap(c);
            }),
            NodeKind::Class {
                parent_template,
                body,
                blocks,
                ..
            } => {
                if let Some(p) = parent_template {
                    replaced |= swap(p);
                }
                replaced |= swap(body);
                blocks.values_mut().for_each(|b| {
                    replaced |= swap(b);
                });
            }
            NodeKind::File { classes } => classes.iter_mut().for_each(|c| {
                replaced |= swap(c);
            }),
        }
        replaced
    }

    /// Remove children held in lists. Fixed-position children stay.
    fn remove_children(&mut self, removed: &[NodeId]) -> usize {
        let before = self.children().len();
        match self {
            NodeKind::Root { children, .. } => children.retain(|c| !removed.contains(c)),
            NodeKind::File { classes } => classes.retain(|c| !removed.contains(c)),
            NodeKind::Tag { children, .. } => children.retain(|_, c| !removed.contains(c)),
            NodeKind::Array { entries } => entries.retain(|e| !removed.contains(&e.value)),
            NodeKind::Class { blocks, .. } => blocks.retain(|_, b| !removed.contains(b)),
            _ => {}
        }
        before - self.children().len()
    }
}

/// Arena of nodes with parent links.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and make it the parent of its children.
    pub fn add(&mut self, kind: NodeKind, line: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, line });
        self.parents.push(None);
        self.adopt(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutable access; call [`Ast::adopt`] after changing child ids.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn line(&self, id: NodeId) -> u32 {
        self.nodes[id.index()].line
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.index()]
    }

    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.parents[id.index()] = parent;
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Point the parent link of every current child at `id`.
    pub fn adopt(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.parents[child.index()] = Some(id);
        }
    }

    /// Swap `old` for `new` among the children of `parent`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let replaced = self.kind_mut(parent).replace_child(old, new);
        if replaced {
            self.parents[new.index()] = Some(parent);
            self.parents[old.index()] = None;
        }
        replaced
    }

    /// Detach list-held children of `parent`; returns how many were removed.
    pub fn remove_children(&mut self, parent: NodeId, removed: &[NodeId]) -> usize {
        let count = self.kind_mut(parent).remove_children(removed);
        for id in removed {
            if self.parents[id.index()] == Some(parent) && !self.children(parent).contains(id) {
                self.parents[id.index()] = None;
            }
        }
        count
    }

    /// Append a statement to a `Root` node.
    pub fn push_child(&mut self, root: NodeId, child: NodeId) {
        if let NodeKind::Root { children, .. } = self.kind_mut(root) {
            children.push(child);
            self.parents[child.index()] = Some(root);
        }
    }

    /// All nodes below `id` in depth-first pre-order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// A named child of a `Tag` node.
    pub fn tag_child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Tag { children, .. } => children.get(key).copied(),
            _ => None,
        }
    }

    /// A data entry of a `Tag` node.
    pub fn tag_data(&self, id: NodeId, key: &str) -> Option<&Value> {
        match self.kind(id) {
            NodeKind::Tag { data, .. } => data.get(key),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(ast: &mut Ast, s: &str) -> NodeId {
        let data = ast.add(NodeKind::Data(Value::String(s.into())), 1);
        ast.add(
            NodeKind::Print {
                expression: data,
                is_safe: false,
            },
            1,
        )
    }

    #[test]
    fn test_add_sets_parents() {
        let mut ast = Ast::new();
        let a = text(&mut ast, "a");
        let b = text(&mut ast, "b");
        let root = ast.add(
            NodeKind::Root {
                children: vec![a, b],
                uses_environment: true,
                autofilter: None,
            },
            1,
        );
        assert_eq!(ast.parent(a), Some(root));
        assert_eq!(ast.parent(root), None);
        assert_eq!(ast.children(root), vec![a, b]);
        assert_eq!(ast.descendants(root).len(), 4);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut ast = Ast::new();
        let a = text(&mut ast, "a");
        let b = text(&mut ast, "b");
        let c = text(&mut ast, "c");
        let root = ast.add(
            NodeKind::Root {
                children: vec![a, b],
                uses_environment: true,
                autofilter: None,
            },
            1,
        );
        assert!(ast.replace_child(root, b, c));
        assert_eq!(ast.parent(c), Some(root));
        assert_eq!(ast.parent(b), None);

        assert_eq!(ast.remove_children(root, &[a]), 1);
        assert_eq!(ast.children(root), vec![c]);
        assert_eq!(ast.parent(a), None);
    }

    #[test]
    fn test_fixed_children_are_not_removed() {
        let mut ast = Ast::new();
        let data = ast.add(NodeKind::Data(Value::Int(1)), 1);
        let print = ast.add(
            NodeKind::Print {
                expression: data,
                is_safe: true,
            },
            1,
        );
        assert_eq!(ast.remove_children(print, &[data]), 0);
        assert_eq!(ast.parent(data), Some(print));
    }

    #[test]
    fn test_value_from_literal() {
        assert_eq!(Value::from_literal("12"), Value::Int(12));
        assert_eq!(Value::from_literal("1.5"), Value::Float(1.5));
        assert_eq!(Value::from_literal("2e3"), Value::Float(2000.0));
        assert_eq!(Value::from_literal("true"), Value::Bool(true));
        assert_eq!(Value::from_literal("null"), Value::Null);
    }
}
