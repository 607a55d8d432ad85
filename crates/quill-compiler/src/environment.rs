//! Compilation environment.
//!
//! An [`Environment`] owns every registry a compile needs. It is assembled
//! once by [`EnvironmentBuilder`] and is read-only afterwards, so one
//! instance can compile many templates, including from several threads.

use crate::ast::{Ast, NodeId, NodeKind, Value};
use crate::compiler::Compiler;
use crate::error::Result;
use crate::extension::Extension;
use crate::function::TemplateFunction;
use crate::operator::{OperatorKind, OperatorRegistry};
use crate::parser::Parser;
use crate::tag::Tag;
use crate::visitor::{NodeTraverser, VisitContext, VisitorFactory};
use quill_lexer::{ArgumentTokenizer, ExpressionLexer, LexerOptions, TagTable, Tokenizer};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use std::fmt;
use tracing::debug;

/// When printed expressions are escaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AutofilterMode {
    On,
    Off,
    /// Pick the strategy from the template name's extension.
    #[default]
    Auto,
}

impl AutofilterMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for AutofilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for an [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct EnvironmentOptions {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub lexer: LexerOptions,
    /// Autofilter mode at the start of every template.
    pub autofilter: AutofilterMode,
    /// Prefix of generated class names.
    pub class_prefix: String,
    /// Maximum depth of nested tag bodies.
    pub max_nesting: usize,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            lexer: LexerOptions::default(),
            autofilter: AutofilterMode::Auto,
            class_prefix: "Template".to_string(),
            max_nesting: 64,
        }
    }
}

/// Output of [`Environment::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    pub template_name: String,
    /// Name of the class rendering the template.
    pub class_name: String,
    /// JavaScript source of all generated classes.
    pub code: String,
    parent_template: Option<String>,
    embedded_templates: Vec<String>,
}

impl CompiledTemplate {
    /// The parent template, when `extends` names it with a string literal.
    pub fn parent_template(&self) -> Option<&str> {
        self.parent_template.as_deref()
    }

    /// Names of the templates defined by `embed` tags.
    pub fn embedded_templates(&self) -> &[String] {
        &self.embedded_templates
    }
}

/// Registries and options for compiling templates.
pub struct Environment {
    options: EnvironmentOptions,
    operators: OperatorRegistry,
    tags: FxHashMap<SmolStr, Box<dyn Tag>>,
    /// Tag names plus sub-tags and closing tags, as seen by the tokenizer.
    tag_names: FxHashSet<SmolStr>,
    functions: FxHashMap<SmolStr, TemplateFunction>,
    visitors: Vec<VisitorFactory>,
    tokenizer: Tokenizer,
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::new()
    }

    pub fn options(&self) -> &EnvironmentOptions {
        &self.options
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn tag(&self, name: &str) -> Option<&dyn Tag> {
        self.tags.get(name).map(|t| t.as_ref())
    }

    pub fn function(&self, name: &str) -> Option<&TemplateFunction> {
        self.functions.get(name)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Generated class name for a template name.
    pub fn class_name(&self, template_name: &str) -> String {
        let sanitized: String = template_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}", self.options.class_prefix, sanitized)
    }

    /// Tokenize and parse a template without running passes.
    pub fn parse(&self, source: &str, template_name: &str) -> Result<(Ast, NodeId)> {
        let stream = self.tokenizer.tokenize(source, self)?;
        debug!(tokens = stream.len(), "tokenized");
        let (ast, file) = Parser::new(self, stream, template_name).parse()?;
        debug!(nodes = ast.len(), "parsed");
        Ok((ast, file))
    }

    /// Compile a template into JavaScript.
    #[tracing::instrument(level = "debug", skip(self, source))]
    pub fn compile(&self, source: &str, template_name: &str) -> Result<CompiledTemplate> {
        let (mut ast, file) = self.parse(source, template_name)?;

        let visitors = self.visitors.iter().map(|factory| factory()).collect();
        let ctx = VisitContext {
            env: self,
            template_name,
        };
        NodeTraverser::new(visitors).traverse(&mut ast, file, &ctx);

        let code = Compiler::new(self, &ast).compile(file)?;
        debug!(bytes = code.len(), "generated code");

        let classes = match ast.kind(file) {
            NodeKind::File { classes } => classes.as_slice(),
            _ => &[],
        };
        let mut compiled = CompiledTemplate {
            template_name: template_name.to_string(),
            class_name: self.class_name(template_name),
            code,
            parent_template: None,
            embedded_templates: Vec::new(),
        };
        for (i, class) in classes.iter().enumerate() {
            let NodeKind::Class {
                template_name,
                parent_template,
                ..
            } = ast.kind(*class)
            else {
                continue;
            };
            if i == 0 {
                compiled.parent_template = parent_template
                    .and_then(|p| match ast.kind(p) {
                        NodeKind::Data(Value::String(name)) => Some(name.clone()),
                        _ => None,
                    });
            } else {
                compiled.embedded_templates.push(template_name.to_string());
            }
        }
        Ok(compiled)
    }
}

impl TagTable for Environment {
    fn contains_tag(&self, name: &str) -> bool {
        self.tag_names.contains(name)
    }

    fn argument_tokenizer(&self, name: &str) -> Option<&dyn ArgumentTokenizer> {
        self.tags.get(name).and_then(|t| t.argument_tokenizer())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("options", &self.options)
            .field("tags", &self.tags.len())
            .field("functions", &self.functions.len())
            .field("visitors", &self.visitors.len())
            .finish()
    }
}

/// Assembles an [`Environment`] from extensions.
///
/// Registrations are applied in order: extensions first, then tags and
/// functions added directly, so later entries replace earlier ones.
#[derive(Default)]
pub struct EnvironmentBuilder {
    options: EnvironmentOptions,
    extensions: Vec<Box<dyn Extension>>,
    tags: Vec<Box<dyn Tag>>,
    functions: Vec<TemplateFunction>,
    visitors: Vec<VisitorFactory>,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: EnvironmentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    pub fn tag(mut self, tag: impl Tag + 'static) -> Self {
        self.tags.push(Box::new(tag));
        self
    }

    pub fn function(mut self, function: TemplateFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn visitor(mut self, factory: VisitorFactory) -> Self {
        self.visitors.push(factory);
        self
    }

    /// Populate every registry and build the tokenizer.
    pub fn build(self) -> Result<Environment> {
        let mut operators = OperatorRegistry::new();
        let mut tags: Vec<Box<dyn Tag>> = Vec::new();
        let mut functions = Vec::new();
        let mut visitors = Vec::new();

        for extension in &self.extensions {
            for operator in extension.binary_operators() {
                operators.register(OperatorKind::Binary, operator);
            }
            for operator in extension.prefix_operators() {
                operators.register(OperatorKind::Prefix, operator);
            }
            for operator in extension.postfix_operators() {
                operators.register(OperatorKind::Postfix, operator);
            }
            if let Some(operator) = extension.conditional_operator() {
                operators.register(OperatorKind::Conditional, operator);
            }
            tags.extend(extension.tags());
            functions.extend(extension.functions());
            visitors.extend(extension.node_visitors());
            debug!(extension = extension.name(), "registered extension");
        }
        tags.extend(self.tags);
        functions.extend(self.functions);
        visitors.extend(self.visitors);

        let prefix = &self.options.lexer.closing_tag_prefix;
        let mut tag_names = FxHashSet::default();
        let mut tag_map = FxHashMap::default();
        for tag in tags {
            tag_names.insert(SmolStr::new(tag.name()));
            tag_names.extend(tag.sub_tags().iter().map(|s| SmolStr::new(s)));
            if tag.has_closing_tag() {
                tag_names.insert(SmolStr::from(format!("{}{}", prefix, tag.name())));
            }
            tag_map.insert(SmolStr::new(tag.name()), tag);
        }
        let functions: FxHashMap<SmolStr, TemplateFunction> = functions
            .into_iter()
            .map(|f| (SmolStr::new(f.name()), f))
            .collect();

        let lexer = ExpressionLexer::new(operators.symbols())?;
        let tokenizer = Tokenizer::new(self.options.lexer.clone(), lexer);
        debug!(
            tags = tag_map.len(),
            functions = functions.len(),
            visitors = visitors.len(),
            "environment ready"
        );

        Ok(Environment {
            options: self.options,
            operators,
            tags: tag_map,
            tag_names,
            functions,
            visitors,
            tokenizer,
        })
    }
}
