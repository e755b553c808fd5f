//! The function registry.
//!
//! A [`Library`] maps symbols to codes, arities and evaluators. It is built once by an
//! ordered sequence of registrations (several of which compile source text against the
//! functions registered before them) and is only read afterwards, so a finished library
//! can be shared between threads and evaluations without locking.
use std::{collections::HashMap, fmt, path::Path, sync::Arc};

use log::{debug, info, trace, warn};
use strum::EnumIs;

use crate::{
    bytecode::{CodeSpace, MAX_CALL_ARGS},
    compiler::{self, CompiledExpression},
    config::LibraryConfig,
    decoder,
    error::{CompileError, DecodeError, Error, RegistryError, Result},
    eval::{self, GlobalData, RunContext},
    formula::Formula,
    parser,
};

mod arith;
mod crypto;
mod embedded;

/// Source of the functions every standard library carries on top of the embedded set.
pub const BASE_SOURCE: &str = include_str!("base.easyfl");

/// Default bound on nested calls during one evaluation.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum Arity {
    Fixed(u8),
    Variadic,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => n as usize == count,
            Arity::Variadic => count <= MAX_CALL_ARGS,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic => write!(f, "..."),
        }
    }
}

/// Index of a function inside its [`Library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub(crate) u32);

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result of a native evaluator.
pub type EvalResult = std::result::Result<Vec<u8>, crate::error::EvalFault>;

/// A natively implemented function body.
#[derive(Clone)]
pub struct EmbeddedFn(Arc<dyn Fn(&mut RunContext<'_>) -> EvalResult + Send + Sync>);

impl EmbeddedFn {
    pub fn new(f: impl Fn(&mut RunContext<'_>) -> EvalResult + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, ctx: &mut RunContext<'_>) -> EvalResult {
        (self.0)(ctx)
    }
}

impl fmt::Debug for EmbeddedFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmbeddedFn({:p})", Arc::as_ptr(&self.0))
    }
}

#[derive(Debug, Clone, EnumIs)]
pub enum FunctionKind {
    EmbeddedShort(EmbeddedFn),
    EmbeddedLong(EmbeddedFn),
    /// Compiled from source; the body is evaluated with the call's arguments in scope.
    Extended { body: Formula, bytecode: Vec<u8> },
}

impl FunctionKind {
    pub fn code_space(&self) -> CodeSpace {
        match self {
            FunctionKind::EmbeddedShort(_) => CodeSpace::EmbeddedShort,
            FunctionKind::EmbeddedLong(_) => CodeSpace::EmbeddedLong,
            FunctionKind::Extended { .. } => CodeSpace::Extended,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub symbol: String,
    pub code: u16,
    pub arity: Arity,
    pub kind: FunctionKind,
    /// Body source text of extended functions, whitespace stripped.
    pub source: Option<String>,
}

impl FunctionDescriptor {
    pub fn code_space(&self) -> CodeSpace {
        self.kind.code_space()
    }
}

/// Function counts per code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LibrarySummary {
    pub embedded_short: usize,
    pub embedded_long: usize,
    pub extended: usize,
}

impl LibrarySummary {
    pub fn total(&self) -> usize {
        self.embedded_short + self.embedded_long + self.extended
    }
}

impl fmt::Display for LibrarySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} functions: {}/{} embedded-short, {}/{} embedded-long, {}/{} extended",
            self.total(),
            self.embedded_short,
            CodeSpace::EmbeddedShort.capacity(),
            self.embedded_long,
            CodeSpace::EmbeddedLong.capacity(),
            self.extended,
            CodeSpace::Extended.capacity(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Library {
    functions: Vec<FunctionDescriptor>,
    by_name: HashMap<String, FuncId>,
    by_code: HashMap<u16, FuncId>,
    max_call_depth: usize,
}

impl Default for Library {
    fn default() -> Self {
        Self::empty()
    }
}

impl Library {
    /// A library without any function.
    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
            by_name: HashMap::new(),
            by_code: HashMap::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// The native primitive set only.
    pub fn embedded() -> std::result::Result<Self, RegistryError> {
        let mut lib = Self::empty();
        embedded::register(&mut lib)?;
        Ok(lib)
    }

    /// The native primitive set followed by the bundled base definitions.
    pub fn base() -> Result<Self> {
        let mut lib = Self::embedded()?;
        lib.extend_many(BASE_SOURCE)?;
        info!("Base library ready, {}", lib.summary());
        Ok(lib)
    }

    pub fn from_config(config: &LibraryConfig) -> Result<Self> {
        let mut lib = if config.include_base {
            Self::base()?
        } else {
            if !config.extensions.is_empty() {
                warn!(
                    "Base library disabled, {} extension file(s) may only use embedded functions",
                    config.extensions.len()
                );
            }
            Self::embedded()?
        };
        lib.set_max_call_depth(config.max_call_depth);

        for path in &config.extensions {
            lib.extend_file(path)?;
        }
        info!("Library configured, {}", lib.summary());
        Ok(lib)
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        if depth == 0 {
            warn!("Ignoring a maximum call depth of 0, keeping {}", self.max_call_depth);
            return;
        }
        self.max_call_depth = depth;
    }

    fn next_code(&self, space: CodeSpace) -> std::result::Result<u16, RegistryError> {
        let used = self
            .functions
            .iter()
            .filter(|f| f.code_space() == space)
            .count();
        if used >= space.capacity() {
            return Err(RegistryError::CodeSpaceExhausted { space });
        }
        Ok(space.first_code() + used as u16)
    }

    fn check_symbol(
        &self,
        symbol: &str,
        arity: Arity,
        space: CodeSpace,
    ) -> std::result::Result<(), RegistryError> {
        if is_reserved_symbol(symbol) {
            return Err(RegistryError::ReservedSymbol {
                symbol: symbol.to_string(),
            });
        }
        if self.by_name.contains_key(symbol) {
            return Err(RegistryError::DuplicateSymbol {
                symbol: symbol.to_string(),
            });
        }
        match arity {
            Arity::Fixed(n) if n as usize > MAX_CALL_ARGS => Err(RegistryError::ArityTooLarge {
                symbol: symbol.to_string(),
                arity: n,
            }),
            Arity::Variadic if !space.allows_variadic() => Err(RegistryError::VariadicNotAllowed {
                symbol: symbol.to_string(),
                space,
            }),
            _ => Ok(()),
        }
    }

    fn insert(
        &mut self,
        symbol: &str,
        arity: Arity,
        kind: FunctionKind,
        source: Option<String>,
    ) -> std::result::Result<FuncId, RegistryError> {
        let space = kind.code_space();
        self.check_symbol(symbol, arity, space)?;
        let code = self.next_code(space)?;

        let id = FuncId(self.functions.len() as u32);
        self.functions.push(FunctionDescriptor {
            symbol: symbol.to_string(),
            code,
            arity,
            kind,
            source,
        });
        self.by_name.insert(symbol.to_string(), id);
        self.by_code.insert(code, id);

        debug!("Registered {} function `{}` with code {} and arity {}", space, symbol, code, arity);
        Ok(id)
    }

    /// Register a native function called with a single byte.
    pub fn embed_short(
        &mut self,
        symbol: &str,
        arity: u8,
        f: impl Fn(&mut RunContext<'_>) -> EvalResult + Send + Sync + 'static,
    ) -> std::result::Result<FuncId, RegistryError> {
        self.insert(
            symbol,
            Arity::Fixed(arity),
            FunctionKind::EmbeddedShort(EmbeddedFn::new(f)),
            None,
        )
    }

    /// Register a native function called with a two byte prefix. May be variadic.
    pub fn embed_long(
        &mut self,
        symbol: &str,
        arity: Arity,
        f: impl Fn(&mut RunContext<'_>) -> EvalResult + Send + Sync + 'static,
    ) -> std::result::Result<FuncId, RegistryError> {
        self.insert(
            symbol,
            arity,
            FunctionKind::EmbeddedLong(EmbeddedFn::new(f)),
            None,
        )
    }

    /// Compile `source` against this library and register it under `symbol`. The arity is
    /// one more than the highest argument reference in the body.
    pub fn extend(&mut self, symbol: &str, source: &str) -> Result<FuncId> {
        let expr = parser::parse_expression(source)?;
        let formula = compiler::compile_parsed(self, &expr, None)?;
        let arity = Arity::Fixed(formula.num_args());
        self.register_extended(symbol, arity, formula, parser::strip_whitespace(source))
    }

    /// Like [`Library::extend`] with a declared arity the body is checked against.
    pub fn extend_with_arity(
        &mut self,
        symbol: &str,
        arity: Arity,
        source: &str,
    ) -> Result<FuncId> {
        let Arity::Fixed(n) = arity else {
            return Err(CompileError::VariadicDefinition {
                symbol: symbol.to_string(),
            }
            .into());
        };
        if n as usize > MAX_CALL_ARGS {
            return Err(RegistryError::ArityTooLarge {
                symbol: symbol.to_string(),
                arity: n,
            }
            .into());
        }
        let expr = parser::parse_expression(source)?;
        let formula = compiler::compile_parsed(self, &expr, Some(n))?;
        self.register_extended(symbol, arity, formula, parser::strip_whitespace(source))
    }

    fn register_extended(
        &mut self,
        symbol: &str,
        arity: Arity,
        formula: Formula,
        source: String,
    ) -> Result<FuncId> {
        // Validate the symbol before paying for the round trip.
        self.check_symbol(symbol, arity, CodeSpace::Extended)?;

        let bytecode = formula.to_bytecode(self)?;
        let num_args = match arity {
            Arity::Fixed(n) => n,
            Arity::Variadic => 0,
        };
        let body = decoder::decode_with_arity(self, &bytecode, num_args)?;
        trace!("Compiled `{}` to {}", symbol, hex::encode(&bytecode));

        let id = self.insert(
            symbol,
            arity,
            FunctionKind::Extended { body, bytecode },
            Some(source),
        )?;
        Ok(id)
    }

    /// Register every definition of a multi-definition source, in order.
    pub fn extend_many(&mut self, source: &str) -> Result<Vec<FuncId>> {
        let definitions = parser::parse_definitions(source)?;
        let mut ids = Vec::with_capacity(definitions.len());
        for def in definitions {
            let body = parser::parse_expression_at(&def.body, def.line)?;
            let id = match def.arity {
                Arity::Variadic => Err(Error::from(CompileError::VariadicDefinition {
                    symbol: def.symbol.clone(),
                })),
                Arity::Fixed(n) => compiler::compile_parsed(self, &body, Some(n))
                    .map_err(Error::from)
                    .and_then(|formula| {
                        self.register_extended(&def.symbol, def.arity, formula, def.body.clone())
                    }),
            }
            .map_err(|err| Error::InDefinition {
                symbol: def.symbol.clone(),
                line: def.line,
                source: Box::new(err),
            })?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Register the definitions of a source file.
    pub fn extend_file(&mut self, path: &Path) -> Result<Vec<FuncId>> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            file: path.display().to_string(),
            source,
        })?;
        let ids = self.extend_many(&source)?;
        debug!("Loaded {} definitions from `{}`", ids.len(), path.display());
        Ok(ids)
    }

    pub fn descriptor(&self, id: FuncId) -> &FunctionDescriptor {
        &self.functions[id.index()]
    }

    pub fn function_by_name(&self, symbol: &str) -> Option<(FuncId, &FunctionDescriptor)> {
        let id = *self.by_name.get(symbol)?;
        Some((id, self.descriptor(id)))
    }

    pub fn function_by_code(&self, code: u16) -> Option<(FuncId, &FunctionDescriptor)> {
        let id = *self.by_code.get(&code)?;
        Some((id, self.descriptor(id)))
    }

    /// Look up `symbol` for a call with `arg_count` arguments.
    pub fn resolve_call(
        &self,
        symbol: &str,
        arg_count: usize,
    ) -> std::result::Result<FuncId, CompileError> {
        if arg_count > MAX_CALL_ARGS {
            return Err(CompileError::TooManyArguments {
                symbol: symbol.to_string(),
                count: arg_count,
            });
        }
        let (id, descriptor) = self
            .function_by_name(symbol)
            .ok_or_else(|| CompileError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        if !descriptor.arity.accepts(arg_count) {
            return Err(CompileError::ArityMismatch {
                symbol: symbol.to_string(),
                expected: descriptor.arity,
                found: arg_count,
            });
        }
        Ok(id)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn summary(&self) -> LibrarySummary {
        let mut summary = LibrarySummary::default();
        for function in &self.functions {
            match function.code_space() {
                CodeSpace::EmbeddedShort => summary.embedded_short += 1,
                CodeSpace::EmbeddedLong => summary.embedded_long += 1,
                CodeSpace::Extended => summary.extended += 1,
            }
        }
        summary
    }

    /// Symbol of the function called at the head of `bytecode`, `None` for inline data and
    /// argument references.
    pub fn symbol_of(&self, bytecode: &[u8]) -> std::result::Result<Option<&str>, DecodeError> {
        let prefix = decoder::parse_call_prefix(bytecode)?;
        match prefix.code() {
            Some(code) if code >= crate::bytecode::NUM_ARG_REFS => self
                .function_by_code(code)
                .map(|(_, f)| Some(f.symbol.as_str()))
                .ok_or(DecodeError::UnknownFunctionCode { code }),
            _ => Ok(None),
        }
    }

    /// Compile a bare expression. `$n` references are free and counted in the result.
    pub fn compile(&self, source: &str) -> Result<CompiledExpression> {
        compiler::compile_expression(self, source)
    }

    pub fn decompile(&self, bytecode: &[u8]) -> std::result::Result<String, DecodeError> {
        decoder::decompile(self, bytecode)
    }

    /// Compile, decode and evaluate `source` without global data.
    pub fn eval_source<A: AsRef<[u8]>>(&self, source: &str, args: &[A]) -> Result<Vec<u8>> {
        let compiled = self.compile(source)?;
        self.evaluate_bytecode(&compiled.bytecode, &(), args)
    }

    /// Decode and evaluate `bytecode` with `args` bound to `$0`..`$n`.
    pub fn evaluate_bytecode<A: AsRef<[u8]>>(
        &self,
        bytecode: &[u8],
        global: &dyn GlobalData,
        args: &[A],
    ) -> Result<Vec<u8>> {
        let arity = u8::try_from(args.len())
            .ok()
            .filter(|n| (*n as usize) <= MAX_CALL_ARGS + 1)
            .ok_or(CompileError::TooManyArguments {
                symbol: "<top level>".to_string(),
                count: args.len(),
            })?;
        let formula = decoder::decode_with_arity(self, bytecode, arity)?;
        Ok(eval::evaluate(self, global, &formula, args)?)
    }
}

/// Literals, argument references and anything the call syntax cannot spell.
fn is_reserved_symbol(symbol: &str) -> bool {
    symbol.is_empty()
        || compiler::is_literal(symbol)
        || symbol.starts_with('$')
        || symbol
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ',' | '=' | '/'))
}
