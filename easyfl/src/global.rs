use std::cell::RefCell;

use lazybytes::{Tree, TreePath};

use crate::{error::FaultKind, eval::GlobalData};

/// Global data backed by a data tree, with the path of the constraint being evaluated.
///
/// Reads materialize tree nodes, hence the interior mutability. A context belongs to a
/// single evaluation thread.
#[derive(Debug)]
pub struct TreeContext {
    tree: RefCell<Tree>,
    invocation_path: Option<TreePath>,
}

impl TreeContext {
    pub fn new(tree: Tree) -> Self {
        Self {
            tree: RefCell::new(tree),
            invocation_path: None,
        }
    }

    pub fn with_invocation_path(tree: Tree, path: impl Into<TreePath>) -> Self {
        Self {
            tree: RefCell::new(tree),
            invocation_path: Some(path.into()),
        }
    }

    /// Point the context at another constraint of the same tree.
    pub fn set_invocation_path(&mut self, path: impl Into<TreePath>) {
        self.invocation_path = Some(path.into());
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        self.tree.get_mut()
    }

    pub fn into_tree(self) -> Tree {
        self.tree.into_inner()
    }
}

impl GlobalData for TreeContext {
    fn invocation_path(&self) -> Option<TreePath> {
        self.invocation_path.clone()
    }

    fn bytes_at_path(&self, path: &[u8]) -> Result<Vec<u8>, FaultKind> {
        Ok(self.tree.borrow_mut().bytes_at_path(path)?)
    }
}
