//! Template functions.

use crate::ast::NodeId;
use crate::compiler::Compiler;
use crate::error::CompileResult;
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

/// Flags describing how a function is called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionOptions {
    /// Output of the function needs no escaping.
    pub is_safe: bool,
    /// The environment is passed as the first argument.
    pub needs_environment: bool,
    /// The render context is passed before the call arguments.
    pub needs_context: bool,
}

/// Custom code generation for a function call.
pub trait FunctionCompiler: Send + Sync {
    fn compile(
        &self,
        compiler: &mut Compiler<'_>,
        function: &TemplateFunction,
        arguments: &[NodeId],
    ) -> CompileResult<()>;
}

/// How calls to a function are emitted, fixed at registration.
#[derive(Clone)]
pub enum CompileStrategy {
    /// `callback(args)`
    Direct,
    /// `env.getFunction("name")(...)`
    Registry,
    Custom(Arc<dyn FunctionCompiler>),
}

impl fmt::Debug for CompileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "Direct"),
            Self::Registry => write!(f, "Registry"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// A function callable from template expressions.
#[derive(Debug, Clone)]
pub struct TemplateFunction {
    name: SmolStr,
    callback: Option<String>,
    options: FunctionOptions,
    strategy: CompileStrategy,
}

impl TemplateFunction {
    /// A function resolved at render time through the environment.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            callback: None,
            options: FunctionOptions::default(),
            strategy: CompileStrategy::Registry,
        }
    }

    /// Call a global JavaScript function, e.g. `Math.max`.
    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self.resolve_strategy()
    }

    pub fn with_options(mut self, options: FunctionOptions) -> Self {
        self.options = options;
        self.resolve_strategy()
    }

    /// Emit calls with a custom compiler.
    pub fn with_compiler(mut self, compiler: impl FunctionCompiler + 'static) -> Self {
        self.strategy = CompileStrategy::Custom(Arc::new(compiler));
        self
    }

    pub fn safe(self) -> Self {
        let options = FunctionOptions {
            is_safe: true,
            ..self.options
        };
        self.with_options(options)
    }

    pub fn needs_environment(self) -> Self {
        let options = FunctionOptions {
            needs_environment: true,
            ..self.options
        };
        self.with_options(options)
    }

    pub fn needs_context(self) -> Self {
        let options = FunctionOptions {
            needs_context: true,
            ..self.options
        };
        self.with_options(options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn callback(&self) -> Option<&str> {
        self.callback.as_deref()
    }

    pub fn options(&self) -> FunctionOptions {
        self.options
    }

    pub fn strategy(&self) -> &CompileStrategy {
        &self.strategy
    }

    /// Whether a call reads the `env` local of the generated method.
    pub fn uses_environment(&self) -> bool {
        matches!(self.strategy, CompileStrategy::Registry)
    }

    fn resolve_strategy(mut self) -> Self {
        if matches!(self.strategy, CompileStrategy::Custom(_)) {
            return self;
        }
        let plain = !self.options.needs_environment && !self.options.needs_context;
        self.strategy = match self.callback {
            Some(_) if plain => CompileStrategy::Direct,
            _ => CompileStrategy::Registry,
        };
        self
    }
}
