//! The native primitive set. Registration order fixes the function codes, so new
//! primitives are only ever appended.
use lazybytes::ByteArray;

use crate::{
    error::{EvalFault, FaultKind, RegistryError},
    eval::RunContext,
    library::{Arity, EvalResult, Library, arith, crypto},
};

/// Canonical non-empty value returned by predicates.
pub const TRUE: u8 = 0xff;

fn truth(value: bool) -> Vec<u8> {
    if value { vec![TRUE] } else { Vec::new() }
}

fn byte_operand(data: &[u8]) -> Result<usize, FaultKind> {
    Ok(arith::fixed::<1>(data)?[0] as usize)
}

fn failure_message(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) if !text.is_empty() && !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("0x{}", hex::encode(data)),
    }
}

type Unary = fn(&[u8]) -> Result<Vec<u8>, FaultKind>;
type Binary = fn(&[u8], &[u8]) -> Result<Vec<u8>, FaultKind>;

fn short_unary(lib: &mut Library, symbol: &str, f: Unary) -> Result<(), RegistryError> {
    lib.embed_short(symbol, 1, move |ctx| Ok(f(&ctx.arg(0)?)?))?;
    Ok(())
}

fn short_binary(lib: &mut Library, symbol: &str, f: Binary) -> Result<(), RegistryError> {
    lib.embed_short(symbol, 2, move |ctx| {
        let a = ctx.arg(0)?;
        let b = ctx.arg(1)?;
        Ok(f(&a, &b)?)
    })?;
    Ok(())
}

fn long_binary(lib: &mut Library, symbol: &str, f: Binary) -> Result<(), RegistryError> {
    lib.embed_long(symbol, Arity::Fixed(2), move |ctx| {
        let a = ctx.arg(0)?;
        let b = ctx.arg(1)?;
        Ok(f(&a, &b)?)
    })?;
    Ok(())
}

fn all_args(ctx: &mut RunContext<'_>) -> Result<Vec<Vec<u8>>, EvalFault> {
    (0..ctx.arity()).map(|i| ctx.arg(i)).collect()
}

fn slice(ctx: &mut RunContext<'_>) -> EvalResult {
    let data = ctx.arg(0)?;
    let from = byte_operand(&ctx.arg(1)?)?;
    let to = byte_operand(&ctx.arg(2)?)?;
    if to >= data.len() {
        return Err(FaultKind::IndexOutOfBounds {
            index: to,
            len: data.len(),
        }
        .into());
    }
    if from > to {
        return Err(FaultKind::IndexOutOfBounds {
            index: from,
            len: to + 1,
        }
        .into());
    }
    Ok(data[from..=to].to_vec())
}

fn byte(ctx: &mut RunContext<'_>) -> EvalResult {
    let data = ctx.arg(0)?;
    let index = byte_operand(&ctx.arg(1)?)?;
    match data.get(index) {
        Some(b) => Ok(vec![*b]),
        None => Err(FaultKind::IndexOutOfBounds {
            index,
            len: data.len(),
        }
        .into()),
    }
}

fn tail(ctx: &mut RunContext<'_>) -> EvalResult {
    let data = ctx.arg(0)?;
    let from = byte_operand(&ctx.arg(1)?)?;
    if from > data.len() {
        return Err(FaultKind::IndexOutOfBounds {
            index: from,
            len: data.len(),
        }
        .into());
    }
    Ok(data[from..].to_vec())
}

fn len8(data: &[u8]) -> Result<Vec<u8>, FaultKind> {
    u8::try_from(data.len())
        .map(|len| vec![len])
        .map_err(|_| FaultKind::Overflow)
}

fn len16(data: &[u8]) -> Result<Vec<u8>, FaultKind> {
    u16::try_from(data.len())
        .map(|len| len.to_be_bytes().to_vec())
        .map_err(|_| FaultKind::Overflow)
}

fn array_element(ctx: &mut RunContext<'_>) -> EvalResult {
    let raw = ctx.arg(0)?;
    let index = byte_operand(&ctx.arg(1)?)?;
    let mut array = ByteArray::from_bytes(raw);
    Ok(array.at(index)?.to_vec())
}

fn array_length(data: &[u8]) -> Result<Vec<u8>, FaultKind> {
    let len = ByteArray::from_bytes(data).len()?;
    u8::try_from(len)
        .map(|len| vec![len])
        .map_err(|_| FaultKind::Overflow)
}

pub(super) fn register(lib: &mut Library) -> Result<(), RegistryError> {
    lib.embed_short("fail", 1, |ctx| {
        let message = failure_message(&ctx.arg(0)?);
        Err(FaultKind::Failed { message }.into())
    })?;
    lib.embed_short("slice", 3, slice)?;
    lib.embed_short("byte", 2, byte)?;
    lib.embed_short("tail", 2, tail)?;
    short_binary(lib, "equal", |a, b| Ok(truth(a == b)))?;
    short_binary(lib, "hasPrefix", |data, prefix| Ok(truth(data.starts_with(prefix))))?;
    short_unary(lib, "len8", len8)?;
    short_unary(lib, "len16", len16)?;
    short_unary(lib, "not", |data| Ok(truth(data.is_empty())))?;
    lib.embed_short("if", 3, |ctx| {
        if ctx.arg_is_true(0)? {
            ctx.arg(1)
        } else {
            ctx.arg(2)
        }
    })?;
    short_unary(lib, "isZero", |data| Ok(truth(data.iter().all(|b| *b == 0))))?;

    short_binary(lib, "sum8", arith::sum8)?;
    short_binary(lib, "sum8_16", arith::sum8_16)?;
    short_binary(lib, "sum16", arith::sum16)?;
    short_binary(lib, "sum16_32", arith::sum16_32)?;
    short_binary(lib, "sum32", arith::sum32)?;
    short_binary(lib, "sum32_64", arith::sum32_64)?;
    short_binary(lib, "sum64", arith::sum64)?;
    short_binary(lib, "sub8", arith::sub8)?;
    short_binary(lib, "sub16", arith::sub16)?;
    short_binary(lib, "sub32", arith::sub32)?;
    short_binary(lib, "sub64", arith::sub64)?;
    short_binary(lib, "mul8", arith::mul8)?;
    short_binary(lib, "mul16", arith::mul16)?;
    short_binary(lib, "lessThan", |a, b| Ok(truth(arith::less_than(a, b)?)))?;

    lib.embed_short("validSignatureED25519", 3, |ctx| {
        let message = ctx.arg(0)?;
        let signature = ctx.arg(1)?;
        let public_key = ctx.arg(2)?;
        let valid = crypto::valid_signature_ed25519(&message, &signature, &public_key)?;
        Ok(truth(valid))
    })?;

    lib.embed_short("@", 0, |ctx| {
        let path = ctx
            .global()
            .invocation_path()
            .ok_or(FaultKind::CapabilityUnavailable {
                capability: "invocation_path",
            })?;
        Ok(path.as_bytes().to_vec())
    })?;
    lib.embed_short("@Path", 1, |ctx| {
        let path = ctx.arg(0)?;
        Ok(ctx.global().bytes_at_path(&path)?)
    })?;
    lib.embed_short("@Array8", 2, array_element)?;
    short_unary(lib, "ArrayLength8", array_length)?;

    lib.embed_long("concat", Arity::Variadic, |ctx| {
        Ok(all_args(ctx)?.concat())
    })?;
    lib.embed_long("and", Arity::Variadic, |ctx| {
        for i in 0..ctx.arity() {
            if !ctx.arg_is_true(i)? {
                return Ok(truth(false));
            }
        }
        Ok(truth(true))
    })?;
    lib.embed_long("or", Arity::Variadic, |ctx| {
        for i in 0..ctx.arity() {
            if ctx.arg_is_true(i)? {
                return Ok(truth(true));
            }
        }
        Ok(truth(false))
    })?;
    lib.embed_long("blake3", Arity::Variadic, |ctx| {
        let parts = all_args(ctx)?;
        Ok(crypto::blake3_hash(parts.iter().map(Vec::as_slice)))
    })?;
    lib.embed_long("sha256", Arity::Variadic, |ctx| {
        let parts = all_args(ctx)?;
        Ok(crypto::sha256_hash(parts.iter().map(Vec::as_slice)))
    })?;

    long_binary(lib, "bitwiseAND", arith::bitwise_and)?;
    long_binary(lib, "bitwiseOR", arith::bitwise_or)?;
    long_binary(lib, "bitwiseXOR", arith::bitwise_xor)?;
    lib.embed_long("bitwiseNOT", Arity::Fixed(1), |ctx| {
        Ok(arith::bitwise_not(&ctx.arg(0)?))
    })?;
    long_binary(lib, "lshift64", arith::lshift64)?;
    long_binary(lib, "rshift64", arith::rshift64)?;
    long_binary(lib, "add", arith::add)?;
    long_binary(lib, "sub", arith::sub)?;
    long_binary(lib, "mul", arith::mul)?;
    long_binary(lib, "div", arith::div)?;
    long_binary(lib, "mod", arith::rem)?;
    lib.embed_long("uint8Bytes", Arity::Fixed(1), |ctx| {
        Ok(arith::uint64(&ctx.arg(0)?)?.to_be_bytes().to_vec())
    })?;

    Ok(())
}
