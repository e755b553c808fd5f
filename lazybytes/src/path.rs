use std::{fmt, ops::Deref};

use smallvec::SmallVec;

/// A sequence of element indices addressing a node inside a [`Tree`](crate::tree::Tree).
///
/// The empty path denotes the root. Each byte selects an element of the array reached so far,
/// so a path is also a plain byte string and is handed to constraint code as such.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreePath(SmallVec<u8, 8>);

impl TreePath {
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    pub fn new(indices: &[u8]) -> Self {
        Self(indices.iter().copied().collect())
    }

    /// Path of the element `index` below `self`.
    pub fn child(&self, index: u8) -> Self {
        let mut path = self.clone();
        path.0.push(index);
        path
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self::new(head))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl Deref for TreePath {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl From<&[u8]> for TreePath {
    fn from(indices: &[u8]) -> Self {
        Self::new(indices)
    }
}

impl<const N: usize> From<[u8; N]> for TreePath {
    fn from(indices: [u8; N]) -> Self {
        Self::new(&indices)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "0x{}", hex::encode(self.as_bytes()))
        }
    }
}
