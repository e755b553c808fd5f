//! Bytecode to formula trees, in one pass without backtracking.
use log::trace;

use crate::{
    bytecode::{
        CallPrefix, DATA_FLAG, DATA_LENGTH_MASK, LONG_CALL_FLAG, NUM_ARG_REFS, SHORT_CODE_MASK,
    },
    error::DecodeError,
    formula::Formula,
    library::{Arity, Library},
};

/// Classify the head of `bytecode` without looking at its arguments.
pub fn parse_call_prefix(bytecode: &[u8]) -> Result<CallPrefix, DecodeError> {
    let Some(&first) = bytecode.first() else {
        return Err(DecodeError::Empty);
    };
    if first & DATA_FLAG != 0 {
        return Ok(CallPrefix::Data {
            len: (first & DATA_LENGTH_MASK) as usize,
        });
    }
    if first & LONG_CALL_FLAG == 0 {
        return Ok(CallPrefix::Short {
            code: (first & SHORT_CODE_MASK) as u16,
        });
    }
    let second = *bytecode
        .get(1)
        .ok_or(DecodeError::UnexpectedEnd { offset: 1 })?;
    let word = u16::from_be_bytes([first, second]);
    Ok(CallPrefix::Long {
        code: word & 0x03ff,
        arity: ((word >> 10) & 0x0f) as u8,
    })
}

/// Decode the expression starting at `offset`, returning it with the offset just past it.
///
/// `depth` is the number of calls enclosing the expression. Calls nested as deep as the
/// library's maximum call depth are rejected, since they could never be evaluated.
pub fn decode_step(
    lib: &Library,
    bytecode: &[u8],
    offset: usize,
    arity: Option<u8>,
    depth: usize,
) -> Result<(Formula, usize), DecodeError> {
    let rest = bytecode.get(offset..).unwrap_or_default();
    let prefix = parse_call_prefix(rest).map_err(|err| match err {
        DecodeError::Empty => DecodeError::UnexpectedEnd { offset },
        DecodeError::UnexpectedEnd { offset: at } => DecodeError::UnexpectedEnd {
            offset: offset + at,
        },
        other => other,
    })?;
    let mut next = offset + prefix.width();

    let (func, num_args) = match prefix {
        CallPrefix::Data { len } => {
            let end = next + len;
            let data = bytecode
                .get(next..end)
                .ok_or(DecodeError::UnexpectedEnd {
                    offset: bytecode.len(),
                })?;
            return Ok((Formula::Data(data.to_vec()), end));
        }
        CallPrefix::Short { code } if code < NUM_ARG_REFS => {
            let index = code as u8;
            return match arity {
                Some(arity) if index >= arity => {
                    Err(DecodeError::ArgumentOutOfRange { index, arity })
                }
                _ => Ok((Formula::ArgRef(index), next)),
            };
        }
        CallPrefix::Short { code } => {
            let (id, descriptor) = lib
                .function_by_code(code)
                .ok_or(DecodeError::UnknownFunctionCode { code })?;
            let num_args = match descriptor.arity {
                Arity::Fixed(n) => n,
                Arity::Variadic => 0,
            };
            (id, num_args)
        }
        CallPrefix::Long {
            code,
            arity: declared,
        } => {
            let (id, descriptor) = lib
                .function_by_code(code)
                .ok_or(DecodeError::UnknownFunctionCode { code })?;
            if !descriptor.arity.accepts(declared as usize) {
                return Err(DecodeError::ArityMismatch {
                    symbol: descriptor.symbol.clone(),
                    declared,
                    registered: descriptor.arity,
                });
            }
            (id, declared)
        }
    };

    if depth >= lib.max_call_depth() {
        return Err(DecodeError::TooDeep {
            max: lib.max_call_depth(),
            offset,
        });
    }
    let mut args = Vec::with_capacity(num_args as usize);
    for _ in 0..num_args {
        let (arg, after) = decode_step(lib, bytecode, next, arity, depth + 1)?;
        args.push(arg);
        next = after;
    }
    Ok((Formula::Call { func, args }, next))
}

fn decode_complete(
    lib: &Library,
    bytecode: &[u8],
    arity: Option<u8>,
) -> Result<Formula, DecodeError> {
    let (formula, end) = decode_step(lib, bytecode, 0, arity, 0)?;
    if end < bytecode.len() {
        return Err(DecodeError::TrailingBytes {
            count: bytecode.len() - end,
        });
    }
    trace!("Decoded {} into a formula of depth {}", hex::encode(bytecode), formula.depth());
    Ok(formula)
}

/// Decode a complete expression. Argument references are not bounded.
pub fn decode(lib: &Library, bytecode: &[u8]) -> Result<Formula, DecodeError> {
    decode_complete(lib, bytecode, None)
}

/// Decode a complete expression whose argument references must stay below `arity`.
pub fn decode_with_arity(
    lib: &Library,
    bytecode: &[u8],
    arity: u8,
) -> Result<Formula, DecodeError> {
    decode_complete(lib, bytecode, Some(arity))
}

/// Source text of `bytecode`.
pub fn decompile(lib: &Library, bytecode: &[u8]) -> Result<String, DecodeError> {
    let formula = decode(lib, bytecode)?;
    Ok(formula.display(lib).to_string())
}
