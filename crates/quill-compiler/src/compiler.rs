//! JavaScript code generation.
//!
//! Every template becomes a class extending the runtime `Template` class:
//! `displayTemplate(context)` renders the body and each named block becomes
//! a `block_<name>(context)` method. Statements are emitted on their own
//! indented lines; expressions are emitted inline.

use crate::ast::{ArrayEntry, Ast, NodeId, NodeKind, Value};
use crate::environment::Environment;
use crate::error::{CompileError, CompileErrorCode, CompileResult};
use crate::function::CompileStrategy;
use quill_source::CodeBuilder;

/// Emits JavaScript for an AST.
pub struct Compiler<'a> {
    env: &'a Environment,
    ast: &'a Ast,
    /// Output buffers; the last one receives emitted code.
    buffers: Vec<CodeBuilder>,
    indentation: usize,
    counter: u32,
}

impl<'a> Compiler<'a> {
    pub fn new(env: &'a Environment, ast: &'a Ast) -> Self {
        Self {
            env,
            ast,
            buffers: vec![CodeBuilder::new()],
            indentation: 0,
            counter: 0,
        }
    }

    /// Compile a `File` node into module source.
    pub fn compile(mut self, file: NodeId) -> CompileResult<String> {
        let ast = self.ast;
        let NodeKind::File { classes } = ast.kind(file) else {
            return Err(self.invalid_node(file, "file"));
        };
        for (i, class) in classes.iter().enumerate() {
            if i > 0 {
                self.add("\n");
            }
            self.compile_class(*class)?;
        }
        self.add("\n");
        let mut buffers = self.buffers;
        Ok(buffers.pop().map(CodeBuilder::finish).unwrap_or_default())
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    pub fn env(&self) -> &'a Environment {
        self.env
    }

    /// Append raw code to the current line.
    pub fn add(&mut self, code: &str) -> &mut Self {
        self.buffer().push_str(code);
        self
    }

    /// Start a new line at the current indentation.
    pub fn indented(&mut self, code: &str) -> &mut Self {
        let level = self.indentation;
        let buffer = self.buffer();
        if !buffer.is_empty() {
            buffer.newline();
        }
        buffer.indent(level);
        buffer.push_str(code);
        self
    }

    pub fn indent(&mut self) -> &mut Self {
        self.indentation += 1;
        self
    }

    pub fn outdent(&mut self) -> &mut Self {
        self.indentation = self.indentation.saturating_sub(1);
        self
    }

    /// Redirect output into a fresh buffer.
    pub fn push_buffer(&mut self) {
        self.buffers.push(CodeBuilder::new());
    }

    /// Stop redirecting and return what was emitted since `push_buffer`.
    pub fn pop_buffer(&mut self) -> String {
        if self.buffers.len() > 1 {
            self.buffers.pop().map(CodeBuilder::finish).unwrap_or_default()
        } else {
            String::new()
        }
    }

    /// Emit an expression into a string instead of the output.
    pub fn expression_string(&mut self, node: NodeId) -> CompileResult<String> {
        self.push_buffer();
        let result = self.compile_node(node);
        let code = self.pop_buffer();
        result.map(|_| code)
    }

    /// A fresh local variable name, unique within this compilation.
    pub fn unique_name(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}{}", prefix, self.counter)
    }

    /// Emit a JavaScript string literal.
    pub fn string(&mut self, value: &str) -> &mut Self {
        let literal = serde_json::Value::from(value).to_string();
        self.add(&literal)
    }

    /// Emit a literal value.
    pub fn compile_data(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Null => self.add("null"),
            Value::Bool(b) => self.add(if *b { "true" } else { "false" }),
            Value::Int(i) => self.add(&i.to_string()),
            Value::Float(f) => self.add(&format_float(*f)),
            Value::String(s) => self.string(s),
            Value::Array(entries) => {
                if entries.iter().any(|(key, _)| key.is_some()) {
                    self.add("new Map([");
                    for (i, (key, item)) in entries.iter().enumerate() {
                        if i > 0 {
                            self.add(", ");
                        }
                        self.add("[");
                        match key {
                            Some(key) => self.compile_data(key),
                            None => self.add(&i.to_string()),
                        };
                        self.add(", ");
                        self.compile_data(item);
                        self.add("]");
                    }
                    self.add("])")
                } else {
                    self.add("[");
                    for (i, (_, item)) in entries.iter().enumerate() {
                        if i > 0 {
                            self.add(", ");
                        }
                        self.compile_data(item);
                    }
                    self.add("]")
                }
            }
        }
    }

    /// Emit comma-separated expressions.
    pub fn compile_arguments(&mut self, arguments: &[NodeId]) -> CompileResult<()> {
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                self.add(", ");
            }
            self.compile_node(*argument)?;
        }
        Ok(())
    }

    /// Emit the context for an included template: the current one, or a
    /// copy extended with the `using` expression.
    pub fn compile_context(&mut self, using: Option<NodeId>) -> CompileResult<()> {
        match using {
            None => {
                self.add("context");
            }
            Some(expression) => {
                self.add("this.createContext(context, ");
                self.compile_node(expression)?;
                self.add(")");
            }
        }
        Ok(())
    }

    /// Emit the statements of a `Root` node.
    pub fn compile_body(&mut self, root: NodeId) -> CompileResult<()> {
        let ast = self.ast;
        match ast.kind(root) {
            NodeKind::Root { children, .. } => {
                for child in children {
                    self.compile_node(*child)?;
                }
                Ok(())
            }
            _ => self.compile_node(root),
        }
    }

    /// Emit one node: a statement for `Print`, `Tag` and `Root`, an inline
    /// expression for everything else.
    pub fn compile_node(&mut self, node: NodeId) -> CompileResult<()> {
        let ast = self.ast;
        let env = self.env;
        match ast.kind(node) {
            NodeKind::Root { .. } => self.compile_body(node)?,
            NodeKind::Print { expression, .. } => {
                self.indented("this.write(");
                self.compile_node(*expression)?;
                self.add(");");
            }
            NodeKind::Tag { tag, .. } => {
                let handler = env.tag(tag).ok_or_else(|| {
                    CompileError::new(
                        format!("Unknown tag \"{}\"", tag),
                        ast.line(node),
                        CompileErrorCode::UnknownTag,
                    )
                })?;
                handler.compile(self, node)?;
            }
            NodeKind::Data(value) => {
                self.compile_data(value);
            }
            NodeKind::Identifier {
                name,
                receiver: None,
            }
            | NodeKind::Variable { name } => {
                self.add("context.get(").string(name).add(")");
            }
            NodeKind::Identifier {
                name,
                receiver: Some(receiver),
            } => {
                self.add("this.getProperty(");
                self.compile_node(*receiver)?;
                self.add(", ").string(name).add(")");
            }
            NodeKind::ArrayIndex { collection, key } => {
                self.add("this.getProperty(");
                self.compile_node(*collection)?;
                self.add(", ");
                self.compile_node(*key)?;
                self.add(")");
            }
            NodeKind::Array { entries } => self.compile_array(entries)?,
            NodeKind::Operator {
                operator,
                symbol,
                operands,
            } => {
                let operator = env.operators().get(*operator).ok_or_else(|| {
                    CompileError::new(
                        format!("Unknown operator \"{}\"", symbol),
                        ast.line(node),
                        CompileErrorCode::UnknownOperator,
                    )
                })?;
                operator.handler().compile(self, symbol, operands)?;
            }
            NodeKind::Function { .. } => self.compile_function(node)?,
            NodeKind::Class { .. } | NodeKind::File { .. } => {
                return Err(self.invalid_node(node, "template"));
            }
        }
        Ok(())
    }

    fn compile_array(&mut self, entries: &[ArrayEntry]) -> CompileResult<()> {
        if entries.iter().any(|e| e.key.is_some()) {
            self.add("new Map([");
            for (i, entry) in entries.iter().enumerate() {
                if i > 0 {
                    self.add(", ");
                }
                self.add("[");
                match entry.key {
                    Some(key) => self.compile_node(key)?,
                    None => {
                        self.add(&i.to_string());
                    }
                }
                self.add(", ");
                self.compile_node(entry.value)?;
                self.add("]");
            }
            self.add("])");
        } else {
            self.add("[");
            for (i, entry) in entries.iter().enumerate() {
                if i > 0 {
                    self.add(", ");
                }
                self.compile_node(entry.value)?;
            }
            self.add("]");
        }
        Ok(())
    }

    fn compile_function(&mut self, node: NodeId) -> CompileResult<()> {
        let ast = self.ast;
        let env = self.env;
        let NodeKind::Function {
            name,
            arguments,
            receiver,
        } = ast.kind(node)
        else {
            return Err(self.invalid_node(node, "function call"));
        };

        if let Some(receiver) = receiver {
            self.add("this.callMethod(");
            self.compile_node(*receiver)?;
            self.add(", ").string(name).add(", [");
            self.compile_arguments(arguments)?;
            self.add("])");
            return Ok(());
        }

        let function = env.function(name).ok_or_else(|| {
            CompileError::new(
                format!("Unknown function \"{}\"", name),
                ast.line(node),
                CompileErrorCode::UnknownFunction,
            )
        })?;
        match function.strategy() {
            CompileStrategy::Direct => {
                self.add(function.callback().unwrap_or(name.as_str())).add("(");
                self.compile_arguments(arguments)?;
                self.add(")");
            }
            CompileStrategy::Registry => {
                let options = function.options();
                self.add("env.getFunction(").string(name).add(")(");
                let mut leading = Vec::new();
                if options.needs_environment {
                    leading.push("env");
                }
                if options.needs_context {
                    leading.push("context");
                }
                self.add(&leading.join(", "));
                if !leading.is_empty() && !arguments.is_empty() {
                    self.add(", ");
                }
                self.compile_arguments(arguments)?;
                self.add(")");
            }
            CompileStrategy::Custom(compiler) => compiler.compile(self, function, arguments)?,
        }
        Ok(())
    }

    fn compile_class(&mut self, class: NodeId) -> CompileResult<()> {
        let ast = self.ast;
        let NodeKind::Class {
            template_name,
            class_name,
            parent_template,
            body,
            blocks,
        } = ast.kind(class)
        else {
            return Err(self.invalid_node(class, "class"));
        };

        self.indented(&format!("class {} extends Template {{", class_name));
        self.indent();
        self.indented("constructor(env) {");
        self.indent();
        self.indented("super(env, ").string(template_name).add(");");
        self.outdent();
        self.indented("}");

        self.add("\n");
        self.indented("displayTemplate(context) {");
        self.indent();
        match parent_template {
            Some(parent) => {
                // The body of a child template only defines blocks.
                if self.uses_environment(*parent) {
                    self.indented("const env = this.getEnvironment();");
                }
                self.indented("this.setParentTemplate(");
                self.compile_node(*parent)?;
                self.add(");");
                self.indented("super.displayTemplate(context);");
            }
            None => self.compile_method_body(*body)?,
        }
        self.outdent();
        self.indented("}");

        for (name, block) in blocks {
            self.push_buffer();
            self.indented(&format!("block_{}(context) {{", name));
            self.indent();
            self.compile_method_body(*block)?;
            self.outdent();
            self.indented("}");
            let method = self.pop_buffer();
            self.add("\n\n").add(&method);
        }

        self.outdent();
        self.indented("}");
        Ok(())
    }

    fn compile_method_body(&mut self, root: NodeId) -> CompileResult<()> {
        if let NodeKind::Root {
            uses_environment: true,
            ..
        } = self.ast.kind(root)
        {
            self.indented("const env = this.getEnvironment();");
        }
        self.compile_body(root)
    }

    /// Whether an expression calls a registry function.
    fn uses_environment(&self, node: NodeId) -> bool {
        std::iter::once(node)
            .chain(self.ast.descendants(node))
            .any(|id| match self.ast.kind(id) {
                NodeKind::Function {
                    name,
                    receiver: None,
                    ..
                } => self
                    .env
                    .function(name)
                    .is_some_and(|f| f.uses_environment()),
                _ => false,
            })
    }

    fn buffer(&mut self) -> &mut CodeBuilder {
        if self.buffers.is_empty() {
            self.buffers.push(CodeBuilder::new());
        }
        let last = self.buffers.len() - 1;
        &mut self.buffers[last]
    }

    fn invalid_node(&self, node: NodeId, expected: &str) -> CompileError {
        CompileError::new(
            format!("Expected a {} node", expected),
            self.ast.line(node),
            CompileErrorCode::InvalidNode,
        )
    }
}

/// JavaScript source for a float.
fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let name = if value > 0.0 { "Infinity" } else { "-Infinity" };
        name.to_string()
    } else {
        format!("{:?}", value)
    }
}
