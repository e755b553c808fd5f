use strum::EnumIs;
use thiserror::Error;

use crate::path::TreePath;

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum Error {
    /// The array was built from absent bytes. It has no elements, not even zero of them.
    #[error("Attempt to access an array that was constructed from absent (nil) bytes.")]
    EmptyArrayAccess,

    /// Element index is past the end of the array.
    #[error("Element index {index} is out of bounds for an array of {len} elements.")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Pushing would exceed the configured maximum number of elements.
    #[error("Array is full: it cannot hold more than {max} elements.")]
    TooManyElements { max: usize },

    /// Element data does not fit in the widest length class.
    #[error("Element of {len} bytes exceeds the maximum encodable element size.")]
    ElementTooLong { len: usize },

    /// Serialized form ends before the prefix or an element is complete.
    #[error("Serialized array is truncated: expected {expected} more bytes at offset {offset}.")]
    Truncated { offset: usize, expected: usize },

    /// Serialized form has bytes left over after the last element.
    #[error("Serialized array has {count} trailing bytes after the last element.")]
    TrailingBytes { count: usize },

    /// An index along the path does not address an existing element.
    #[error("No element exists at path {path}.")]
    PathNotFound { path: TreePath },

    /// The element at the path exists but does not parse as an array.
    #[error("The element at path {path} is not an array.")]
    NotAnArray { path: TreePath },
}

pub type Result<T> = std::result::Result<T, Error>;
