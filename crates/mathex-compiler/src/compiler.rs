use mathex_builtins::{Value, ValueKind};
use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheStats, ExpressionCache};
use crate::config::CompilerConfig;
use crate::constants::{ConstantRegistry, PassThrough};
use crate::definition::MathDefinition;
use crate::emit::{Emitter, Program};
use crate::error::{CompileError, InvokeError, Result};
use crate::extract::{
    advertise_parameters, extract_function_calls, extract_literals, LiteralExtractor,
    ScientificNotationExtractor, StringLiteralExtractor,
};
use crate::formatter::adapt;
use crate::instr::Instr;
use crate::nodes::Node;
use crate::optimizer::{optimize, Binding};
use crate::parameters::{ParameterContext, ParameterRegistry};
use crate::parser::{parse_expression, ParseScope};
use crate::provider::{BuiltinFunctionProvider, FunctionProvider};
use crate::symbols::{ExpressionSymbol, PlaceholderAllocator, SymbolTable};
use crate::vm;

/// The cached, immutable result of compiling one expression.
pub struct CompiledExpression {
    source: String,
    program: Program,
    bindings: Vec<Binding>,
    root: Node,
    registry: Arc<ParameterRegistry>,
    parameters: Vec<ParameterContext>,
    return_kind: ValueKind,
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .field("parameters", &self.parameters)
            .field("return_kind", &self.return_kind)
            .field("program", &self.program)
            .finish()
    }
}

impl CompiledExpression {
    /// Lowers each binding to its own segment, then the root, and freezes
    /// `registry`.
    fn generate(
        source: String,
        bindings: Vec<Binding>,
        root: Node,
        registry: Arc<ParameterRegistry>,
    ) -> Result<Self> {
        let mut emitter = Emitter::new();
        for binding in &bindings {
            emitter.begin_binding();
            binding.node.emit(&mut emitter)?;
            emitter.emit(Instr::Return);
        }
        let entry = emitter.position();
        root.emit(&mut emitter)?;
        emitter.emit(Instr::Return);

        let parameters = registry.contexts()?;
        let program = emitter.finish(entry, parameters.len());
        let return_kind = root.kind()?;
        registry.freeze()?;
        Ok(Self {
            source,
            program,
            bindings,
            root,
            registry,
            parameters,
            return_kind,
        })
    }

    /// The original, unmodified expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `(name, kind)` in argument order.
    pub fn parameters(&self) -> Vec<(String, ValueKind)> {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.kind))
            .collect()
    }

    pub fn parameter_contexts(&self) -> &[ParameterContext] {
        &self.parameters
    }

    pub fn return_kind(&self) -> ValueKind {
        self.return_kind
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    /// Adapts `args` to the parameter kinds and runs the program.
    pub fn invoke(&self, args: &[Value]) -> std::result::Result<Value, InvokeError> {
        let adapted = adapt(args, &self.parameters)?;
        vm::execute(&self.program, &adapted)
    }

    /// Rebuilds the expression over a fresh copy of the parameter registry.
    pub fn deep_clone(&self) -> Result<CompiledExpression> {
        let fresh = Arc::new(self.registry.deep_clone()?);
        let bindings = self
            .bindings
            .iter()
            .map(|b| Binding {
                name: b.name.clone(),
                node: b.node.deep_clone(&fresh),
            })
            .collect();
        let root = self.root.deep_clone(&fresh);
        CompiledExpression::generate(self.source.clone(), bindings, root, fresh)
    }
}

/// Intermediate results of one pipeline run, for inspection.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Root text after literal extraction.
    pub literal_text: String,
    /// Symbol table after function extraction, in creation order.
    pub symbols: Vec<ExpressionSymbol>,
    pub constants: ConstantRegistry,
    /// Symbols in the order the optimizer resolved them.
    pub resolution_order: Vec<String>,
    pub bindings: Vec<Binding>,
    pub root: Node,
    pub parameters: Vec<ParameterContext>,
}

struct Build {
    literal_text: String,
    symbols: Vec<ExpressionSymbol>,
    constants: ConstantRegistry,
    resolution_order: Vec<String>,
    bindings: Vec<Binding>,
    root: Node,
    registry: Arc<ParameterRegistry>,
}

/// Compiles expressions for one [`MathDefinition`] and caches the results.
pub struct Compiler {
    definition: MathDefinition,
    config: CompilerConfig,
    providers: Vec<Arc<dyn FunctionProvider>>,
    extractors: Vec<Arc<dyn LiteralExtractor>>,
    pass_through: Vec<PassThrough>,
    cache: ExpressionCache,
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("definition", &self.definition)
            .field("config", &self.config)
            .field("providers", &self.providers.len())
            .field("extractors", &self.extractors.len())
            .finish()
    }
}

impl Compiler {
    pub fn new(definition: MathDefinition) -> Result<Self> {
        CompilerBuilder::new(definition).build()
    }

    pub fn builder(definition: MathDefinition) -> CompilerBuilder {
        CompilerBuilder::new(definition)
    }

    pub fn definition(&self) -> &MathDefinition {
        &self.definition
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles `text`, or returns the cached result for identical text.
    pub fn compile(&self, text: &str) -> Result<Arc<CompiledExpression>> {
        self.cache
            .get_or_compile(text, || self.compile_uncached(text))
    }

    /// Runs the full pipeline without consulting or filling the cache.
    pub fn compile_uncached(&self, text: &str) -> Result<CompiledExpression> {
        log::debug!("compiling {text:?}");
        let build = self.build(text)?;
        build.registry.commit_undetermined(ValueKind::Numeric)?;
        let compiled =
            CompiledExpression::generate(text.to_string(), build.bindings, build.root, build.registry)?;
        log::debug!(
            "compiled {text:?}: {} parameter(s), {} binding(s), returns {}",
            compiled.parameters.len(),
            compiled.bindings.len(),
            compiled.return_kind
        );
        Ok(compiled)
    }

    /// Runs extraction, optimization and tree building, and reports the
    /// intermediate state. Nothing is cached or frozen.
    pub fn analyze(&self, text: &str) -> Result<Analysis> {
        let build = self.build(text)?;
        Ok(Analysis {
            literal_text: build.literal_text,
            symbols: build.symbols,
            constants: build.constants,
            resolution_order: build.resolution_order,
            bindings: build.bindings,
            root: build.root,
            parameters: build.registry.contexts()?,
        })
    }

    pub fn stats(&self) -> Result<CacheStats> {
        self.cache.stats()
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }

    fn build(&self, text: &str) -> Result<Build> {
        let registry = Arc::new(ParameterRegistry::new(self.config.lock_timeout));
        let mut constants = ConstantRegistry::with_pass_through(self.pass_through.clone());
        let mut names = PlaceholderAllocator::default();

        let literal_text = extract_literals(text, &self.extractors, &mut constants, &mut names);
        advertise_parameters(&literal_text, &self.definition, &constants, &registry)?;

        let mut symbols = SymbolTable::with_root(&literal_text);
        extract_function_calls(
            &mut symbols,
            &mut constants,
            &mut names,
            &registry,
            &self.definition,
            self.config.max_extraction_passes,
        )?;
        let extracted: Vec<ExpressionSymbol> = symbols.symbols().cloned().collect();
        if self.config.trace_steps {
            log::debug!("{text:?} after extraction: {literal_text:?}");
            for s in &extracted {
                log::debug!("  {} = {}", s.name, s.expression);
            }
        }

        let definition = &self.definition;
        let providers = self.providers.as_slice();
        let resolution = optimize(&mut symbols, &mut constants, |symbol_text, constants, bindings| {
            parse_expression(
                symbol_text,
                ParseScope {
                    definition,
                    constants,
                    names: &mut names,
                    bindings,
                    parameters: &registry,
                    providers,
                },
            )
        })?;
        if self.config.trace_steps {
            log::debug!("{text:?} resolution order: {:?}", resolution.order);
        }

        let root_text = symbols
            .get(&SymbolTable::root_name())
            .map(|s| s.expression.clone())
            .ok_or_else(|| CompileError::Internal("root symbol missing".to_string()))?;
        let root = parse_expression(
            &root_text,
            ParseScope {
                definition,
                constants: &mut constants,
                names: &mut names,
                bindings: &resolution.bindings,
                parameters: &registry,
                providers,
            },
        )?
        .simplify()?;

        Ok(Build {
            literal_text,
            symbols: extracted,
            constants,
            resolution_order: resolution.order,
            bindings: resolution.bindings,
            root,
            registry,
        })
    }
}

pub struct CompilerBuilder {
    definition: MathDefinition,
    config: CompilerConfig,
    providers: Vec<Arc<dyn FunctionProvider>>,
    extractors: Vec<Arc<dyn LiteralExtractor>>,
    pass_through: Vec<PassThrough>,
}

impl CompilerBuilder {
    pub fn new(definition: MathDefinition) -> Self {
        Self {
            definition,
            config: CompilerConfig::default(),
            providers: Vec::new(),
            extractors: Vec::new(),
            pass_through: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Host providers are consulted in registration order, before builtins.
    pub fn with_function_provider<P: FunctionProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Custom extractors run in registration order, before the string and
    /// scientific-notation extractors.
    pub fn with_literal_extractor<E: LiteralExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractors.push(Arc::new(extractor));
        self
    }

    pub fn with_pass_through<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.pass_through.push(Arc::new(predicate));
        self
    }

    pub fn build(self) -> Result<Compiler> {
        self.definition.validate()?;
        self.config
            .validate()
            .map_err(CompileError::InvalidDefinition)?;

        let mut providers = self.providers;
        providers.push(Arc::new(BuiltinFunctionProvider));

        let mut extractors = self.extractors;
        extractors.push(Arc::new(StringLiteralExtractor::new(
            self.definition.string_delimiter.clone(),
        )));
        extractors.push(Arc::new(ScientificNotationExtractor));

        Ok(Compiler {
            cache: ExpressionCache::new(self.config.cache_capacity, self.config.lock_timeout),
            definition: self.definition,
            config: self.config,
            providers,
            extractors,
            pass_through: self.pass_through,
        })
    }
}
