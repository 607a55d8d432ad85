//! Prefix, postfix and conditional operator handlers.

use super::binary::{is_negated, operand_count};
use quill_compiler::{CompileResult, Compiler, NodeId, NodeKind, OperatorHandler};

fn single_operand(compiler: &Compiler<'_>, operands: &[NodeId]) -> CompileResult<NodeId> {
    match operands {
        [operand] => Ok(*operand),
        _ => Err(operand_count(compiler, operands, 1)),
    }
}

/// Emit `(<js>operand)`.
pub struct Prefix(pub &'static str);

impl OperatorHandler for Prefix {
    fn compile(&self, compiler: &mut Compiler<'_>, _: &str, operands: &[NodeId]) -> CompileResult<()> {
        let operand = single_operand(compiler, operands)?;
        compiler.add("(").add(self.0);
        compiler.compile_node(operand)?;
        compiler.add(")");
        Ok(())
    }
}

/// `isset`, `is set` and `is not set`.
///
/// Names and indexes test for presence in their container; any other
/// expression tests for a value other than null or undefined.
pub struct IsSet;

impl OperatorHandler for IsSet {
    fn compile(&self, compiler: &mut Compiler<'_>, symbol: &str, operands: &[NodeId]) -> CompileResult<()> {
        let operand = single_operand(compiler, operands)?;
        if is_negated(symbol) {
            compiler.add("!");
        }
        let ast = compiler.ast();
        match ast.kind(operand) {
            NodeKind::Identifier {
                name,
                receiver: None,
            }
            | NodeKind::Variable { name } => {
                compiler.add("context.has(").string(name).add(")");
            }
            NodeKind::Identifier {
                name,
                receiver: Some(receiver),
            } => {
                compiler.add("this.hasProperty(");
                compiler.compile_node(*receiver)?;
                compiler.add(", ").string(name).add(")");
            }
            NodeKind::ArrayIndex { collection, key } => {
                compiler.add("this.hasProperty(");
                compiler.compile_node(*collection)?;
                compiler.add(", ");
                compiler.compile_node(*key)?;
                compiler.add(")");
            }
            _ => {
                compiler.add("(");
                compiler.compile_node(operand)?;
                compiler.add(" != null)");
            }
        }
        Ok(())
    }
}

/// `empty`, `is empty` and `is not empty`.
pub struct IsEmpty;

impl OperatorHandler for IsEmpty {
    fn compile(&self, compiler: &mut Compiler<'_>, symbol: &str, operands: &[NodeId]) -> CompileResult<()> {
        let operand = single_operand(compiler, operands)?;
        if is_negated(symbol) {
            compiler.add("!");
        }
        compiler.add("this.isEmpty(");
        compiler.compile_node(operand)?;
        compiler.add(")");
        Ok(())
    }
}

/// `even`/`is even`, or `odd`/`is odd` when `odd` is set.
pub struct Parity {
    pub odd: bool,
}

impl OperatorHandler for Parity {
    fn compile(&self, compiler: &mut Compiler<'_>, _: &str, operands: &[NodeId]) -> CompileResult<()> {
        let operand = single_operand(compiler, operands)?;
        compiler.add("(");
        compiler.compile_node(operand)?;
        compiler.add(if self.odd { " % 2 !== 0)" } else { " % 2 === 0)" });
        Ok(())
    }
}

/// `++` and `--`, which yield the adjacent value without assigning.
pub struct Step;

impl OperatorHandler for Step {
    fn compile(&self, compiler: &mut Compiler<'_>, symbol: &str, operands: &[NodeId]) -> CompileResult<()> {
        let operand = single_operand(compiler, operands)?;
        compiler.add("(");
        compiler.compile_node(operand)?;
        compiler.add(if symbol == "++" { " + 1)" } else { " - 1)" });
        Ok(())
    }
}

/// `c ? a : b` and the short form `a ?: b`.
pub struct Conditional;

impl OperatorHandler for Conditional {
    fn compile(&self, compiler: &mut Compiler<'_>, _: &str, operands: &[NodeId]) -> CompileResult<()> {
        match operands {
            [condition, then, otherwise] => {
                compiler.add("(");
                compiler.compile_node(*condition)?;
                compiler.add(" ? ");
                compiler.compile_node(*then)?;
                compiler.add(" : ");
                compiler.compile_node(*otherwise)?;
                compiler.add(")");
            }
            [value, otherwise] => {
                compiler.add("(");
                compiler.compile_node(*value)?;
                compiler.add(" || ");
                compiler.compile_node(*otherwise)?;
                compiler.add(")");
            }
            _ => return Err(operand_count(compiler, operands, 3)),
        }
        Ok(())
    }
}
