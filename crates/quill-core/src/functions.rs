//! The core function set.

use quill_compiler::{
    CompileError, CompileErrorCode, CompileResult, Compiler, FunctionCompiler, NodeId,
    TemplateFunction,
};

/// `raw(value)` compiles to its argument; marking it safe is what skips
/// escaping.
struct Identity;

impl FunctionCompiler for Identity {
    fn compile(
        &self,
        compiler: &mut Compiler<'_>,
        function: &TemplateFunction,
        arguments: &[NodeId],
    ) -> CompileResult<()> {
        match arguments {
            [value] => compiler.compile_node(*value),
            _ => Err(CompileError::new(
                format!("{}() takes exactly one argument", function.name()),
                arguments.first().map_or(0, |a| compiler.ast().line(*a)),
                CompileErrorCode::InvalidNode,
            )),
        }
    }
}

pub fn all() -> Vec<TemplateFunction> {
    vec![
        TemplateFunction::new("raw").with_compiler(Identity).safe(),
        TemplateFunction::new("filter").needs_environment().safe(),
        TemplateFunction::new("escape").needs_environment().safe(),
        TemplateFunction::new("length"),
        TemplateFunction::new("upper"),
        TemplateFunction::new("lower"),
        TemplateFunction::new("join"),
        TemplateFunction::new("keys"),
        TemplateFunction::new("default"),
        TemplateFunction::new("max").with_callback("Math.max"),
        TemplateFunction::new("min").with_callback("Math.min"),
        TemplateFunction::new("abs").with_callback("Math.abs"),
        TemplateFunction::new("round").with_callback("Math.round"),
        TemplateFunction::new("json").with_callback("JSON.stringify"),
    ]
}
