//! Template compiler.
//!
//! Parses quill templates into an arena AST, runs the registered passes and
//! emits one JavaScript class per template. The vocabulary (operators, tags,
//! functions, passes) is supplied through [`Extension`]s registered on an
//! [`EnvironmentBuilder`].
//!
//! ```ignore
//! let env = Environment::builder().extension(CoreExtension::new()).build()?;
//! let compiled = env.compile("Hello {name}", "hello.html")?;
//! println!("{}", compiled.code);
//! ```

pub mod ast;
pub mod compiler;
pub mod environment;
pub mod error;
pub mod expression;
pub mod extension;
pub mod function;
pub mod operator;
pub mod parser;
pub mod tag;
pub mod visitor;

pub use ast::{ArrayEntry, Ast, Node, NodeId, NodeKind, Value};
pub use compiler::Compiler;
pub use environment::{
    AutofilterMode, CompiledTemplate, Environment, EnvironmentBuilder, EnvironmentOptions,
};
pub use error::{
    CompileError, CompileErrorCode, CompileResult, Error, ParseError, ParseErrorCode, Result,
};
pub use expression::{ExpressionParser, ACCESS_PRECEDENCE};
pub use extension::Extension;
pub use function::{CompileStrategy, FunctionCompiler, FunctionOptions, TemplateFunction};
pub use operator::{
    Associativity, Operator, OperatorHandler, OperatorId, OperatorKind, OperatorRegistry,
};
pub use parser::Parser;
pub use tag::Tag;
pub use visitor::{NodeTraverser, NodeVisitor, VisitAction, VisitContext, VisitorFactory};

pub use quill_lexer::{
    split_top_level, ArgumentContext, ArgumentTokenizer, LexerOptions, SyntaxError,
    SyntaxErrorCode, Token, TokenKind,
};
