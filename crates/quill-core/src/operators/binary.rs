//! Binary operator handlers.

use quill_compiler::{
    Ast, CompileError, CompileErrorCode, CompileResult, Compiler, NodeId, NodeKind, OperatorHandler,
    OperatorId, ParseError, ParseErrorCode,
};
use quill_source::Span;

/// Emit `(left <js> right)`.
pub struct Infix(pub &'static str);

impl OperatorHandler for Infix {
    fn compile(&self, compiler: &mut Compiler<'_>, _: &str, operands: &[NodeId]) -> CompileResult<()> {
        let [left, right] = binary_operands(compiler, operands)?;
        compiler.add("(");
        compiler.compile_node(left)?;
        compiler.add(" ").add(self.0).add(" ");
        compiler.compile_node(right)?;
        compiler.add(")");
        Ok(())
    }
}

/// `~` string concatenation.
pub struct Concat;

impl OperatorHandler for Concat {
    fn compile(&self, compiler: &mut Compiler<'_>, _: &str, operands: &[NodeId]) -> CompileResult<()> {
        let [left, right] = binary_operands(compiler, operands)?;
        compiler.add("(\"\" + ");
        compiler.compile_node(left)?;
        compiler.add(" + ");
        compiler.compile_node(right)?;
        compiler.add(")");
        Ok(())
    }
}

/// Logical `xor`.
pub struct Xor;

impl OperatorHandler for Xor {
    fn compile(&self, compiler: &mut Compiler<'_>, _: &str, operands: &[NodeId]) -> CompileResult<()> {
        let [left, right] = binary_operands(compiler, operands)?;
        compiler.add("(!");
        compiler.compile_node(left)?;
        compiler.add(" !== !");
        compiler.compile_node(right)?;
        compiler.add(")");
        Ok(())
    }
}

/// Emit `this.<method>(left, right)`, negated for the `not` spellings.
pub struct RuntimeCall {
    method: &'static str,
}

impl RuntimeCall {
    pub fn new(method: &'static str) -> Self {
        Self { method }
    }
}

impl OperatorHandler for RuntimeCall {
    fn compile(&self, compiler: &mut Compiler<'_>, symbol: &str, operands: &[NodeId]) -> CompileResult<()> {
        let [left, right] = binary_operands(compiler, operands)?;
        if is_negated(symbol) {
            compiler.add("!");
        }
        compiler.add("this.").add(self.method).add("(");
        compiler.compile_node(left)?;
        compiler.add(", ");
        compiler.compile_node(right)?;
        compiler.add(")");
        Ok(())
    }
}

/// `..` and `...` ranges.
pub struct Range;

impl OperatorHandler for Range {
    fn compile(&self, compiler: &mut Compiler<'_>, symbol: &str, operands: &[NodeId]) -> CompileResult<()> {
        let [low, high] = binary_operands(compiler, operands)?;
        compiler.add("this.range(");
        compiler.compile_node(low)?;
        compiler.add(", ");
        compiler.compile_node(high)?;
        compiler.add(if symbol == ".." { ", true)" } else { ", false)" });
        Ok(())
    }
}

/// `is [not] divisible by`.
pub struct Divisible;

impl OperatorHandler for Divisible {
    fn compile(&self, compiler: &mut Compiler<'_>, symbol: &str, operands: &[NodeId]) -> CompileResult<()> {
        let [left, right] = binary_operands(compiler, operands)?;
        compiler.add("(");
        compiler.compile_node(left)?;
        compiler.add(" % ");
        compiler.compile_node(right)?;
        compiler.add(if is_negated(symbol) { " !== 0)" } else { " === 0)" });
        Ok(())
    }
}

/// `.` property access.
///
/// Never produces an `Operator` node: the right side becomes a property
/// lookup or method call on the left side.
pub struct Property;

impl OperatorHandler for Property {
    fn build(
        &self,
        ast: &mut Ast,
        _: OperatorId,
        symbol: &str,
        operands: Vec<NodeId>,
        line: u32,
    ) -> Result<NodeId, ParseError> {
        let (left, right) = split_operands(symbol, operands, line)?;
        match ast.kind_mut(right) {
            NodeKind::Identifier { receiver, .. } | NodeKind::Function { receiver, .. }
                if receiver.is_none() =>
            {
                *receiver = Some(left);
            }
            _ => {
                return Err(ParseError::new(
                    "Expected a property name after \".\"",
                    line,
                    Span::default(),
                    ParseErrorCode::InvalidOperand,
                ))
            }
        }
        ast.adopt(right);
        Ok(right)
    }

    fn compile(&self, _: &mut Compiler<'_>, symbol: &str, _: &[NodeId]) -> CompileResult<()> {
        Err(unbuilt(symbol))
    }
}

/// `|` filter application: `value|name(args)` calls `name(value, args)`.
pub struct Filter;

impl OperatorHandler for Filter {
    fn build(
        &self,
        ast: &mut Ast,
        _: OperatorId,
        symbol: &str,
        operands: Vec<NodeId>,
        line: u32,
    ) -> Result<NodeId, ParseError> {
        let (left, right) = split_operands(symbol, operands, line)?;
        match ast.kind_mut(right) {
            NodeKind::Function {
                arguments,
                receiver: None,
                ..
            } => {
                arguments.insert(0, left);
                ast.adopt(right);
                Ok(right)
            }
            NodeKind::Identifier {
                name,
                receiver: None,
            } => {
                let name = name.clone();
                Ok(ast.add(
                    NodeKind::Function {
                        name,
                        arguments: vec![left],
                        receiver: None,
                    },
                    line,
                ))
            }
            _ => Err(ParseError::new(
                "Expected a filter name after \"|\"",
                line,
                Span::default(),
                ParseErrorCode::InvalidOperand,
            )),
        }
    }

    fn compile(&self, _: &mut Compiler<'_>, symbol: &str, _: &[NodeId]) -> CompileResult<()> {
        Err(unbuilt(symbol))
    }
}

/// Whether a word operator is its negated spelling.
pub(crate) fn is_negated(symbol: &str) -> bool {
    symbol.starts_with("does not") || symbol.starts_with("is not")
}

pub(crate) fn binary_operands(compiler: &Compiler<'_>, operands: &[NodeId]) -> CompileResult<[NodeId; 2]> {
    match operands {
        [left, right] => Ok([*left, *right]),
        _ => Err(operand_count(compiler, operands, 2)),
    }
}

pub(crate) fn operand_count(compiler: &Compiler<'_>, operands: &[NodeId], expected: usize) -> CompileError {
    let line = operands.first().map_or(0, |o| compiler.ast().line(*o));
    CompileError::new(
        format!("Expected {} operands, found {}", expected, operands.len()),
        line,
        CompileErrorCode::InvalidNode,
    )
}

fn split_operands(symbol: &str, operands: Vec<NodeId>, line: u32) -> Result<(NodeId, NodeId), ParseError> {
    match operands[..] {
        [left, right] => Ok((left, right)),
        _ => Err(ParseError::new(
            format!("Operator \"{}\" needs two operands", symbol),
            line,
            Span::default(),
            ParseErrorCode::InvalidOperand,
        )),
    }
}

fn unbuilt(symbol: &str) -> CompileError {
    CompileError::new(
        format!("Operator \"{}\" is resolved while parsing", symbol),
        0,
        CompileErrorCode::UnknownOperator,
    )
}
