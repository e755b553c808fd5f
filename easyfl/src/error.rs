use lazybytes::TreePath;
use strum::EnumIs;
use thiserror::Error;

use crate::{bytecode::CodeSpace, library::Arity};

/// Malformed source text. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum ParseError {
    #[error("line {line}: expected '=' after the definition header")]
    MissingEquals { line: usize },

    #[error("line {line}: unbalanced parentheses")]
    UnbalancedParentheses { line: usize },

    #[error("line {line}: invalid definition header: {message}")]
    InvalidHeader { line: usize, message: String },

    #[error("line {line}: text outside of a definition, lines must start with 'def'")]
    ExpectedDefinition { line: usize },

    #[error("line {line}: empty expression")]
    EmptyExpression { line: usize },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::MissingEquals { line }
            | ParseError::UnbalancedParentheses { line }
            | ParseError::InvalidHeader { line, .. }
            | ParseError::ExpectedDefinition { line }
            | ParseError::EmptyExpression { line }
            | ParseError::Syntax { line, .. } => *line,
        }
    }
}

/// A parsed expression that cannot be turned into bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum CompileError {
    #[error("Unknown function `{symbol}`.")]
    UnknownSymbol { symbol: String },

    #[error("Function `{symbol}` takes {expected} arguments, called with {found}.")]
    ArityMismatch {
        symbol: String,
        expected: Arity,
        found: usize,
    },

    #[error("Call to `{symbol}` has {count} arguments, at most 15 are allowed.")]
    TooManyArguments { symbol: String, count: usize },

    #[error("Literal `{literal}` is not a byte value (0-255).")]
    LiteralOutOfRange { literal: String },

    #[error("Hex constant of {len} bytes exceeds the 127 byte limit.")]
    HexTooLong { len: usize },

    #[error("Invalid hex constant `{literal}`.")]
    InvalidHex { literal: String },

    #[error("Literal `{literal}` cannot take arguments.")]
    LiteralWithArguments { literal: String },

    #[error("Invalid argument reference `{symbol}`.")]
    InvalidArgumentReference { symbol: String },

    #[error("Argument reference `${index}` is out of range for a function of arity {arity}.")]
    ArgumentOutOfRange { index: u8, arity: u8 },

    #[error("Definition `{symbol}` is variadic, only embedded functions may be.")]
    VariadicDefinition { symbol: String },
}

/// Bytecode that does not decode against the library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum DecodeError {
    #[error("Unexpected end of bytecode at offset {offset}.")]
    UnexpectedEnd { offset: usize },

    #[error("Unknown function code {code}.")]
    UnknownFunctionCode { code: u16 },

    #[error("Call header declares {declared} arguments but `{symbol}` takes {registered}.")]
    ArityMismatch {
        symbol: String,
        declared: u8,
        registered: Arity,
    },

    #[error("{count} trailing bytes after the expression.")]
    TrailingBytes { count: usize },

    #[error("Argument reference `${index}` is out of range for arity {arity}.")]
    ArgumentOutOfRange { index: u8, arity: u8 },

    #[error("Calls nested deeper than {max} at offset {offset}.")]
    TooDeep { max: usize, offset: usize },

    #[error("Empty bytecode.")]
    Empty,
}

/// Registration failures. Only expected while the library is being built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum RegistryError {
    #[error("Function `{symbol}` is already registered.")]
    DuplicateSymbol { symbol: String },

    #[error("The {space} code space is exhausted.")]
    CodeSpaceExhausted { space: CodeSpace },

    #[error("Function `{symbol}` declares arity {arity}, the maximum is 15.")]
    ArityTooLarge { symbol: String, arity: u8 },

    #[error("`{symbol}` is a literal or argument reference and cannot name a function.")]
    ReservedSymbol { symbol: String },

    #[error("Function `{symbol}` cannot be variadic in the {space} code space.")]
    VariadicNotAllowed { symbol: String, space: CodeSpace },
}

/// What went wrong inside an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum FaultKind {
    #[error("argument {index} requested from a call with {arity} arguments")]
    ArgumentOutOfBounds { index: usize, arity: usize },

    #[error("index {index} out of bounds for {len} bytes")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("operand must be {expected} bytes long, got {found}")]
    WrongOperandLength { expected: usize, found: usize },

    #[error("operands differ in length ({left} and {right} bytes)")]
    OperandLengthMismatch { left: usize, right: usize },

    #[error("operand of {found} bytes exceeds {max} bytes")]
    OperandTooLong { max: usize, found: usize },

    #[error("call depth exceeds {depth}")]
    StackOverflow { depth: usize },

    #[error("explicit failure: {message}")]
    Failed { message: String },

    #[error("capability `{capability}` is not provided by the global data")]
    CapabilityUnavailable { capability: &'static str },

    #[error("{0}")]
    Data(#[from] lazybytes::Error),
}

/// An aborted evaluation, tagged with the innermost function that raised it and the
/// invocation path of the constraint when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("constraint failed{}: {kind}", location(.function, .path))]
pub struct EvalFault {
    pub kind: FaultKind,
    pub function: Option<String>,
    pub path: Option<TreePath>,
}

fn location(function: &Option<String>, path: &Option<TreePath>) -> String {
    let mut out = String::new();
    if let Some(function) = function {
        out.push_str(&format!(" in `{function}`"));
    }
    if let Some(path) = path {
        out.push_str(&format!(" at {path}"));
    }
    out
}

impl EvalFault {
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            function: None,
            path: None,
        }
    }

    /// Attribute the fault to `symbol` unless an inner call already claimed it.
    pub fn within(mut self, symbol: &str) -> Self {
        if self.function.is_none() {
            self.function = Some(symbol.to_string());
        }
        self
    }

    pub fn at_path(mut self, path: TreePath) -> Self {
        self.path = Some(path);
        self
    }
}

impl From<FaultKind> for EvalFault {
    fn from(kind: FaultKind) -> Self {
        Self::new(kind)
    }
}

impl From<lazybytes::Error> for EvalFault {
    fn from(err: lazybytes::Error) -> Self {
        Self::new(FaultKind::Data(err))
    }
}

#[derive(Debug, EnumIs, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Fault(#[from] EvalFault),

    #[error("In definition of `{symbol}` (line {line}): {source}")]
    InDefinition {
        symbol: String,
        line: usize,
        source: Box<Error>,
    },

    #[error("I/O error on '{file}': {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file '{file}': {source}")]
    Config {
        file: String,
        source: toml::de::Error,
    },
}

impl Error {
    /// The evaluation fault, looking through definition context.
    pub fn as_fault(&self) -> Option<&EvalFault> {
        match self {
            Error::Fault(fault) => Some(fault),
            Error::InDefinition { source, .. } => source.as_fault(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
