//! EasyFL: a small functional constraint language.
//!
//! Predicates over ledger data are written as `def` definitions, compiled into a compact
//! bytecode and evaluated lazily against a data tree (see the `lazybytes` crate).
//!
//! Pipeline
//!  - [`parser`] turns source text into call trees.
//!  - [`compiler`] resolves call trees against a [`Library`] and emits bytecode.
//!  - [`decoder`] turns bytecode back into [`Formula`] trees.
//!  - [`eval`] runs formulas with call-by-need arguments over some [`GlobalData`].
//!
//! A [`Library`] is built once, by registering native primitives and compiling
//! definitions written in the language itself, and is read-only afterwards.
//!
//! ```
//! use easyfl::Library;
//!
//! let lib = Library::base().unwrap();
//! let sum = lib.eval_source("sum8($0, 6)", &[[125u8]]).unwrap();
//! assert_eq!(sum, vec![131]);
//! ```

/// Bytecode layout and code spaces.
pub mod bytecode;
/// Expression compiler.
pub mod compiler;
/// Library configuration files.
pub mod config;
/// Bytecode decoder.
pub mod decoder;
pub mod error;
/// Evaluator and the global data capability.
pub mod eval;
pub mod formula;
/// Data tree backed global data.
pub mod global;
/// Function registry, native primitives and the base definitions.
pub mod library;
/// Source parser.
pub mod parser;

pub use config::LibraryConfig;
pub use error::{
    CompileError, DecodeError, Error, EvalFault, FaultKind, ParseError, RegistryError, Result,
};
pub use eval::{GlobalData, RunContext, evaluate};
pub use formula::Formula;
pub use global::TreeContext;
pub use library::{Arity, FuncId, FunctionDescriptor, FunctionKind, Library, LibrarySummary};
