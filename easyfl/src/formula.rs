//! Formula trees: the evaluable form of an expression.
use crate::{
    bytecode::{self, CodeSpace},
    compiler,
    error::CompileError,
    library::{FuncId, Library},
};

/// A compiled or decoded expression.
///
/// Calls refer to their function by [`FuncId`], an index into the [`Library`] the formula
/// was resolved against. A formula is only meaningful together with that library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// Inline constant, at most 127 bytes.
    Data(Vec<u8>),
    /// Reference to argument `n` of the enclosing definition.
    ArgRef(u8),
    Call { func: FuncId, args: Vec<Formula> },
}

impl Formula {
    pub fn is_data(&self) -> bool {
        matches!(self, Formula::Data(_))
    }

    /// One more than the highest argument reference, zero when there is none.
    pub fn num_args(&self) -> u8 {
        match self {
            Formula::Data(_) => 0,
            Formula::ArgRef(n) => n + 1,
            Formula::Call { args, .. } => args.iter().map(Formula::num_args).max().unwrap_or(0),
        }
    }

    /// Longest chain of nested calls.
    pub fn depth(&self) -> usize {
        match self {
            Formula::Data(_) | Formula::ArgRef(_) => 0,
            Formula::Call { args, .. } => 1 + args.iter().map(Formula::depth).max().unwrap_or(0),
        }
    }

    /// Append the bytecode of this formula to `out`.
    pub fn encode_into(&self, lib: &Library, out: &mut Vec<u8>) -> Result<(), CompileError> {
        match self {
            Formula::Data(data) => out.extend(compiler::encode_data(data)?),
            Formula::ArgRef(n) => out.push(bytecode::short_call(*n as u16)),
            Formula::Call { func, args } => {
                let descriptor = lib.descriptor(*func);
                if descriptor.code_space() == CodeSpace::EmbeddedShort {
                    out.push(bytecode::short_call(descriptor.code));
                } else {
                    out.extend(bytecode::long_call(descriptor.code, args.len() as u8));
                }
                for arg in args {
                    arg.encode_into(lib, out)?;
                }
            }
        }
        Ok(())
    }

    pub fn to_bytecode(&self, lib: &Library) -> Result<Vec<u8>, CompileError> {
        let mut out = Vec::new();
        self.encode_into(lib, &mut out)?;
        Ok(out)
    }

    /// Render the formula back into source text.
    pub fn display<'a>(&'a self, lib: &'a Library) -> impl std::fmt::Display + 'a {
        pub struct Fmt<'a> {
            formula: &'a Formula,
            lib: &'a Library,
        }

        impl<'a> std::fmt::Display for Fmt<'a> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.formula {
                    Formula::Data(data) if data.is_empty() => write!(f, "nil"),
                    Formula::Data(data) => write!(f, "0x{}", hex::encode(data)),
                    Formula::ArgRef(n) => write!(f, "${}", n),
                    Formula::Call { func, args } => {
                        write!(f, "{}", self.lib.descriptor(*func).symbol)?;
                        if args.is_empty() {
                            return Ok(());
                        }
                        write!(f, "(")?;
                        for (i, arg) in args.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            let nested = Fmt {
                                formula: arg,
                                lib: self.lib,
                            };
                            write!(f, "{}", nested)?;
                        }
                        write!(f, ")")
                    }
                }
            }
        }

        Fmt { formula: self, lib }
    }
}
