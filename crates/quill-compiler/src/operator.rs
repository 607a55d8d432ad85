//! Operator registry.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::compiler::Compiler;
use crate::error::{CompileResult, ParseError};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Stable identity of a registered operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId(u32);

/// How a chain of the same operator groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
    /// Chaining without parentheses is an error.
    None,
}

/// Which collection an operator is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Binary,
    Prefix,
    Postfix,
    /// The `? :` operator.
    Conditional,
}

/// Node construction and code generation for one operator.
pub trait OperatorHandler: Send + Sync {
    /// Build the node for an application of the operator.
    ///
    /// The default creates an `Operator` node; operators that rewrite their
    /// operands (property access, filters) override this.
    fn build(
        &self,
        ast: &mut Ast,
        operator: OperatorId,
        symbol: &str,
        operands: Vec<NodeId>,
        line: u32,
    ) -> Result<NodeId, ParseError> {
        Ok(ast.add(
            NodeKind::Operator {
                operator,
                symbol: symbol.into(),
                operands,
            },
            line,
        ))
    }

    /// Emit the expression for an `Operator` node.
    fn compile(
        &self,
        compiler: &mut Compiler<'_>,
        symbol: &str,
        operands: &[NodeId],
    ) -> CompileResult<()>;
}

/// A registered operator.
pub struct Operator {
    id: OperatorId,
    symbols: Vec<SmolStr>,
    precedence: u32,
    associativity: Associativity,
    handler: Box<dyn OperatorHandler>,
}

impl Operator {
    /// Create an operator; its id is assigned on registration.
    pub fn new(
        symbols: &[&str],
        precedence: u32,
        associativity: Associativity,
        handler: impl OperatorHandler + 'static,
    ) -> Self {
        Self {
            id: OperatorId(u32::MAX),
            symbols: symbols.iter().map(|s| SmolStr::new(s)).collect(),
            precedence,
            associativity,
            handler: Box::new(handler),
        }
    }

    pub fn id(&self) -> OperatorId {
        self.id
    }

    pub fn symbols(&self) -> &[SmolStr] {
        &self.symbols
    }

    pub fn precedence(&self) -> u32 {
        self.precedence
    }

    pub fn associativity(&self) -> Associativity {
        self.associativity
    }

    pub fn handler(&self) -> &dyn OperatorHandler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("id", &self.id)
            .field("symbols", &self.symbols)
            .field("precedence", &self.precedence)
            .field("associativity", &self.associativity)
            .finish()
    }
}

/// Symbol lookup for one operator kind. Several symbols may share an operator.
#[derive(Debug, Default)]
pub struct OperatorCollection {
    by_symbol: FxHashMap<SmolStr, OperatorId>,
}

impl OperatorCollection {
    pub fn get(&self, symbol: &str) -> Option<OperatorId> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    fn insert(&mut self, symbol: SmolStr, id: OperatorId) {
        self.by_symbol.insert(symbol, id);
    }

    fn symbols(&self) -> impl Iterator<Item = &str> {
        self.by_symbol.keys().map(SmolStr::as_str)
    }
}

/// All operators of an environment.
#[derive(Debug, Default)]
pub struct OperatorRegistry {
    operators: Vec<Operator>,
    binary: OperatorCollection,
    prefix: OperatorCollection,
    postfix: OperatorCollection,
    conditional: Option<OperatorId>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator. A later registration of a symbol replaces the
    /// earlier one within the same kind.
    pub fn register(&mut self, kind: OperatorKind, mut operator: Operator) -> OperatorId {
        let id = OperatorId(self.operators.len() as u32);
        operator.id = id;
        let collection = match kind {
            OperatorKind::Binary => Some(&mut self.binary),
            OperatorKind::Prefix => Some(&mut self.prefix),
            OperatorKind::Postfix => Some(&mut self.postfix),
            OperatorKind::Conditional => {
                self.conditional = Some(id);
                None
            }
        };
        if let Some(collection) = collection {
            for symbol in &operator.symbols {
                collection.insert(symbol.clone(), id);
            }
        }
        self.operators.push(operator);
        id
    }

    pub fn get(&self, id: OperatorId) -> Option<&Operator> {
        self.operators.get(id.0 as usize)
    }

    pub fn binary(&self, symbol: &str) -> Option<&Operator> {
        self.binary.get(symbol).and_then(|id| self.get(id))
    }

    pub fn prefix(&self, symbol: &str) -> Option<&Operator> {
        self.prefix.get(symbol).and_then(|id| self.get(id))
    }

    pub fn postfix(&self, symbol: &str) -> Option<&Operator> {
        self.postfix.get(symbol).and_then(|id| self.get(id))
    }

    pub fn conditional(&self) -> Option<&Operator> {
        self.conditional.and_then(|id| self.get(id))
    }

    /// Every symbol the expression lexer must recognize.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self
            .binary
            .symbols()
            .chain(self.prefix.symbols())
            .chain(self.postfix.symbols())
            .collect();
        symbols.sort_unstable();
        symbols.dedup();
        symbols
    }
}
