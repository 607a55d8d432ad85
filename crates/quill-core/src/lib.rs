//! The core quill vocabulary.
//!
//! [`CoreExtension`] registers the standard operators, tags, functions and
//! passes on an [`EnvironmentBuilder`]:
//!
//! ```ignore
//! let env = quill_core::environment(EnvironmentOptions::default())?;
//! let compiled = env.compile("{if big}big{else}small{/if}", "size.txt")?;
//! ```

pub mod functions;
pub mod operators;
pub mod passes;
pub mod tags;

use quill_compiler::{
    Environment, EnvironmentBuilder, EnvironmentOptions, Extension, Operator, Result, Tag,
    TemplateFunction, VisitorFactory,
};

/// Operators, tags, functions and passes every quill environment starts
/// with.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreExtension;

impl CoreExtension {
    pub fn new() -> Self {
        Self
    }
}

impl Extension for CoreExtension {
    fn name(&self) -> &'static str {
        "core"
    }

    fn binary_operators(&self) -> Vec<Operator> {
        operators::binary_operators()
    }

    fn prefix_operators(&self) -> Vec<Operator> {
        operators::prefix_operators()
    }

    fn postfix_operators(&self) -> Vec<Operator> {
        operators::postfix_operators()
    }

    fn conditional_operator(&self) -> Option<Operator> {
        Some(operators::conditional_operator())
    }

    fn tags(&self) -> Vec<Box<dyn Tag>> {
        tags::all()
    }

    fn functions(&self) -> Vec<TemplateFunction> {
        functions::all()
    }

    fn node_visitors(&self) -> Vec<VisitorFactory> {
        passes::all()
    }
}

/// An environment with the core extension and the given options.
pub fn environment(options: EnvironmentOptions) -> Result<Environment> {
    EnvironmentBuilder::new()
        .options(options)
        .extension(CoreExtension::new())
        .build()
}
