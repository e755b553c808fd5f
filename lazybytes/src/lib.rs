//! Lazybytes: self-describing byte arrays and the path-addressable trees built from them.
//!
//! Role
//!  - [`array::ByteArray`] is the atomic container: an ordered list of byte strings with a
//!    compact length-prefixed serialization, parsed and re-serialized on demand.
//!  - [`tree::Tree`] nests arrays inside array elements and addresses them by
//!    [`path::TreePath`], so a transaction and the outputs it consumes can be read and
//!    written by index path without decoding the parts nobody touches.
//!
//! Both conversions (parse and serialize) are deterministic; an untouched array or tree
//! serializes back to the bytes it was read from.

/// Byte arrays and their length-prefixed encoding.
pub mod array;
/// Error type shared by arrays and trees.
pub mod error;
/// Index paths into trees.
pub mod path;
/// Lazily materialized trees of arrays.
pub mod tree;

pub use array::{ByteArray, EMPTY_ARRAY, LengthClass, MAX_ELEMENTS};
pub use error::{Error, Result};
pub use path::TreePath;
pub use tree::{TREE_MAX_ELEMENTS, Tree};
