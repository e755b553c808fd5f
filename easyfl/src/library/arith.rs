//! Integer and bitwise primitives. Integers are unsigned and big-endian.
use crate::error::FaultKind;

type Outcome = Result<Vec<u8>, FaultKind>;

/// Operand of an exact width.
pub(super) fn fixed<const N: usize>(data: &[u8]) -> Result<[u8; N], FaultKind> {
    data.try_into().map_err(|_| FaultKind::WrongOperandLength {
        expected: N,
        found: data.len(),
    })
}

/// Operand of up to 8 bytes. The empty value reads as zero.
pub(super) fn uint64(data: &[u8]) -> Result<u64, FaultKind> {
    if data.len() > 8 {
        return Err(FaultKind::OperandTooLong {
            max: 8,
            found: data.len(),
        });
    }
    let mut buf = [0u8; 8];
    buf[8 - data.len()..].copy_from_slice(data);
    Ok(u64::from_be_bytes(buf))
}

macro_rules! checked_binary {
    ($name:ident, $in:ty => $out:ty, $op:ident, $fault:expr) => {
        pub(super) fn $name(a: &[u8], b: &[u8]) -> Outcome {
            let a = <$out>::from(<$in>::from_be_bytes(fixed(a)?));
            let b = <$out>::from(<$in>::from_be_bytes(fixed(b)?));
            a.$op(b)
                .map(|v| v.to_be_bytes().to_vec())
                .ok_or($fault)
        }
    };
}

checked_binary!(sum8, u8 => u8, checked_add, FaultKind::Overflow);
checked_binary!(sum8_16, u8 => u16, checked_add, FaultKind::Overflow);
checked_binary!(sum16, u16 => u16, checked_add, FaultKind::Overflow);
checked_binary!(sum16_32, u16 => u32, checked_add, FaultKind::Overflow);
checked_binary!(sum32, u32 => u32, checked_add, FaultKind::Overflow);
checked_binary!(sum32_64, u32 => u64, checked_add, FaultKind::Overflow);
checked_binary!(sum64, u64 => u64, checked_add, FaultKind::Overflow);
checked_binary!(sub8, u8 => u8, checked_sub, FaultKind::Underflow);
checked_binary!(sub16, u16 => u16, checked_sub, FaultKind::Underflow);
checked_binary!(sub32, u32 => u32, checked_sub, FaultKind::Underflow);
checked_binary!(sub64, u64 => u64, checked_sub, FaultKind::Underflow);
checked_binary!(mul8, u8 => u16, checked_mul, FaultKind::Overflow);
checked_binary!(mul16, u16 => u32, checked_mul, FaultKind::Overflow);

/// Lexicographic comparison of operands of equal length.
pub(super) fn less_than(a: &[u8], b: &[u8]) -> Result<bool, FaultKind> {
    if a.len() != b.len() {
        return Err(FaultKind::OperandLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a < b)
}

fn bytewise(a: &[u8], b: &[u8], op: impl Fn(u8, u8) -> u8) -> Outcome {
    if a.len() != b.len() {
        return Err(FaultKind::OperandLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| op(*x, *y)).collect())
}

pub(super) fn bitwise_and(a: &[u8], b: &[u8]) -> Outcome {
    bytewise(a, b, |x, y| x & y)
}

pub(super) fn bitwise_or(a: &[u8], b: &[u8]) -> Outcome {
    bytewise(a, b, |x, y| x | y)
}

pub(super) fn bitwise_xor(a: &[u8], b: &[u8]) -> Outcome {
    bytewise(a, b, |x, y| x ^ y)
}

pub(super) fn bitwise_not(a: &[u8]) -> Vec<u8> {
    a.iter().map(|x| !x).collect()
}

/// Shifts of an 8 byte word; bits shifted out are lost.
pub(super) fn lshift64(a: &[u8], n: &[u8]) -> Outcome {
    let word = u64::from_be_bytes(fixed(a)?);
    let shift = uint64(n)?;
    let shifted = if shift >= 64 { 0 } else { word << shift };
    Ok(shifted.to_be_bytes().to_vec())
}

pub(super) fn rshift64(a: &[u8], n: &[u8]) -> Outcome {
    let word = u64::from_be_bytes(fixed(a)?);
    let shift = uint64(n)?;
    let shifted = if shift >= 64 { 0 } else { word >> shift };
    Ok(shifted.to_be_bytes().to_vec())
}

pub(super) fn add(a: &[u8], b: &[u8]) -> Outcome {
    let v = uint64(a)?.checked_add(uint64(b)?).ok_or(FaultKind::Overflow)?;
    Ok(v.to_be_bytes().to_vec())
}

pub(super) fn sub(a: &[u8], b: &[u8]) -> Outcome {
    let v = uint64(a)?.checked_sub(uint64(b)?).ok_or(FaultKind::Underflow)?;
    Ok(v.to_be_bytes().to_vec())
}

pub(super) fn mul(a: &[u8], b: &[u8]) -> Outcome {
    let v = uint64(a)?.checked_mul(uint64(b)?).ok_or(FaultKind::Overflow)?;
    Ok(v.to_be_bytes().to_vec())
}

pub(super) fn div(a: &[u8], b: &[u8]) -> Outcome {
    let v = uint64(a)?
        .checked_div(uint64(b)?)
        .ok_or(FaultKind::DivisionByZero)?;
    Ok(v.to_be_bytes().to_vec())
}

pub(super) fn rem(a: &[u8], b: &[u8]) -> Outcome {
    let v = uint64(a)?
        .checked_rem(uint64(b)?)
        .ok_or(FaultKind::DivisionByZero)?;
    Ok(v.to_be_bytes().to_vec())
}
