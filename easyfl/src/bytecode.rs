//! Bytecode layout shared by the compiler and the decoder.
//!
//! Every expression starts with a call prefix whose first byte tells what follows:
//!
//! ```text
//! 1LLLLLLL                     inline data, L = payload length 0..=127
//! 00CCCCCC                     short call, C = code 0..=63 (0..=15 are `$0`..`$15`)
//! 01AAAACC CCCCCCCC            long call, A = argument count, C = 10-bit code
//! ```
//!
//! Arguments of a call follow its prefix inline, depth first.

use strum::{Display, EnumIs};

pub const DATA_FLAG: u8 = 0x80;
pub const LONG_CALL_FLAG: u8 = 0x40;
pub const DATA_LENGTH_MASK: u8 = 0x7f;
pub const SHORT_CODE_MASK: u8 = 0x3f;

/// Largest payload an inline data prefix can describe.
pub const MAX_INLINE_DATA: usize = 127;
/// Arguments a single call may carry (the 4-bit arity field).
pub const MAX_CALL_ARGS: usize = 15;
/// Argument references `$0`..`$15` take the first short codes.
pub const NUM_ARG_REFS: u16 = 16;

pub const FIRST_EMBEDDED_SHORT: u16 = NUM_ARG_REFS;
pub const LAST_EMBEDDED_SHORT: u16 = 63;
pub const FIRST_EMBEDDED_LONG: u16 = 64;
pub const LAST_EMBEDDED_LONG: u16 = 255;
pub const FIRST_EXTENDED: u16 = 256;
pub const LAST_EXTENDED: u16 = 1023;

/// Partition of the function code numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIs)]
pub enum CodeSpace {
    #[strum(to_string = "embedded-short")]
    EmbeddedShort,
    #[strum(to_string = "embedded-long")]
    EmbeddedLong,
    #[strum(to_string = "extended")]
    Extended,
}

impl CodeSpace {
    pub const ALL: [CodeSpace; 3] = [
        CodeSpace::EmbeddedShort,
        CodeSpace::EmbeddedLong,
        CodeSpace::Extended,
    ];

    pub fn first_code(self) -> u16 {
        match self {
            CodeSpace::EmbeddedShort => FIRST_EMBEDDED_SHORT,
            CodeSpace::EmbeddedLong => FIRST_EMBEDDED_LONG,
            CodeSpace::Extended => FIRST_EXTENDED,
        }
    }

    pub fn last_code(self) -> u16 {
        match self {
            CodeSpace::EmbeddedShort => LAST_EMBEDDED_SHORT,
            CodeSpace::EmbeddedLong => LAST_EMBEDDED_LONG,
            CodeSpace::Extended => LAST_EXTENDED,
        }
    }

    pub fn capacity(self) -> usize {
        (self.last_code() - self.first_code()) as usize + 1
    }

    /// Short calls cannot carry an argument count, so their arity is always fixed.
    pub fn allows_variadic(self) -> bool {
        self == CodeSpace::EmbeddedLong
    }
}

/// The decoded head of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum CallPrefix {
    /// Inline data of `len` bytes starting right after the prefix byte.
    Data { len: usize },
    /// One byte call; codes below [`NUM_ARG_REFS`] are argument references.
    Short { code: u16 },
    /// Two byte call with an explicit argument count.
    Long { code: u16, arity: u8 },
}

impl CallPrefix {
    /// Bytes taken by the prefix itself.
    pub fn width(&self) -> usize {
        match self {
            CallPrefix::Data { .. } | CallPrefix::Short { .. } => 1,
            CallPrefix::Long { .. } => 2,
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            CallPrefix::Data { .. } => None,
            CallPrefix::Short { code } | CallPrefix::Long { code, .. } => Some(*code),
        }
    }
}

pub(crate) fn data_prefix(len: usize) -> u8 {
    debug_assert!(len <= MAX_INLINE_DATA);
    DATA_FLAG | len as u8
}

pub(crate) fn short_call(code: u16) -> u8 {
    debug_assert!(code <= LAST_EMBEDDED_SHORT);
    code as u8 & SHORT_CODE_MASK
}

pub(crate) fn long_call(code: u16, arity: u8) -> [u8; 2] {
    debug_assert!(code <= LAST_EXTENDED && (arity as usize) <= MAX_CALL_ARGS);
    let word = (LONG_CALL_FLAG as u16) << 8 | (arity as u16) << 10 | code;
    word.to_be_bytes()
}
