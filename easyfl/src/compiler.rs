//! Call trees to formulas and bytecode.
//!
//! Terminals are classified before symbol lookup: `nil` and `false` are the empty value,
//! a decimal `0..=255` is one byte, `0x..` is raw bytes and `$n` references an argument.
//! Every other symbol must name a function of the library with a matching arity.
use log::trace;

use crate::{
    bytecode::{self, MAX_INLINE_DATA, NUM_ARG_REFS},
    error::{CompileError, Result},
    formula::Formula,
    library::Library,
    parser::{self, ParsedExpr},
};

/// Output of [`compile_expression`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledExpression {
    pub bytecode: Vec<u8>,
    /// Arguments the expression references, one more than its highest `$n`.
    pub num_args: u8,
}

/// Whether `symbol` is spelled like a constant rather than a function name.
pub fn is_literal(symbol: &str) -> bool {
    symbol == "nil"
        || symbol == "false"
        || symbol.starts_with("0x")
        || (!symbol.is_empty() && symbol.bytes().all(|b| b.is_ascii_digit()))
}

fn literal_bytes(symbol: &str) -> std::result::Result<Vec<u8>, CompileError> {
    if symbol == "nil" || symbol == "false" {
        return Ok(Vec::new());
    }
    if let Some(digits) = symbol.strip_prefix("0x") {
        let bytes = hex::decode(digits).map_err(|_| CompileError::InvalidHex {
            literal: symbol.to_string(),
        })?;
        if bytes.len() > MAX_INLINE_DATA {
            return Err(CompileError::HexTooLong { len: bytes.len() });
        }
        return Ok(bytes);
    }
    symbol
        .parse::<u8>()
        .map(|b| vec![b])
        .map_err(|_| CompileError::LiteralOutOfRange {
            literal: symbol.to_string(),
        })
}

fn arg_ref(symbol: &str, arity: Option<u8>) -> std::result::Result<u8, CompileError> {
    let index = symbol
        .strip_prefix('$')
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u8>().ok())
        .filter(|n| (*n as u16) < NUM_ARG_REFS)
        .ok_or_else(|| CompileError::InvalidArgumentReference {
            symbol: symbol.to_string(),
        })?;
    match arity {
        Some(arity) if index >= arity => Err(CompileError::ArgumentOutOfRange { index, arity }),
        _ => Ok(index),
    }
}

/// Resolve a call tree against `lib`.
///
/// With `arity` set, argument references are checked against it (a definition body);
/// without, they are free (a bare expression).
pub fn compile_parsed(
    lib: &Library,
    expr: &ParsedExpr,
    arity: Option<u8>,
) -> std::result::Result<Formula, CompileError> {
    if is_literal(&expr.symbol) {
        if !expr.args.is_empty() {
            return Err(CompileError::LiteralWithArguments {
                literal: expr.symbol.clone(),
            });
        }
        return literal_bytes(&expr.symbol).map(Formula::Data);
    }
    if expr.symbol.starts_with('$') {
        if !expr.args.is_empty() {
            return Err(CompileError::LiteralWithArguments {
                literal: expr.symbol.clone(),
            });
        }
        return arg_ref(&expr.symbol, arity).map(Formula::ArgRef);
    }

    let func = lib.resolve_call(&expr.symbol, expr.args.len())?;
    let args = expr
        .args
        .iter()
        .map(|arg| compile_parsed(lib, arg, arity))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Formula::Call { func, args })
}

/// Parse and compile a bare expression to bytecode.
pub fn compile_expression(lib: &Library, source: &str) -> Result<CompiledExpression> {
    let expr = parser::parse_expression(source)?;
    let formula = compile_parsed(lib, &expr, None)?;
    let bytecode = formula.to_bytecode(lib)?;
    trace!("Compiled `{}` to {}", expr, hex::encode(&bytecode));
    Ok(CompiledExpression {
        bytecode,
        num_args: formula.num_args(),
    })
}

/// Bytecode of a constant.
pub fn encode_data(data: &[u8]) -> std::result::Result<Vec<u8>, CompileError> {
    if data.len() > MAX_INLINE_DATA {
        return Err(CompileError::HexTooLong { len: data.len() });
    }
    let mut out = Vec::with_capacity(data.len() + 1);
    out.push(bytecode::data_prefix(data.len()));
    out.extend_from_slice(data);
    Ok(out)
}
