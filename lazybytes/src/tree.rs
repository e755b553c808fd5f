//! Path-addressable trees of [`ByteArray`]s.
//!
//! A tree starts as a single array (the root). Its elements are plain data until a path
//! descends into one of them; at that moment the element is parsed as an array, stored as a
//! new node in the arena and remembered in the parent's child cache under the element index.
//! From then on the cached node is authoritative for that element: reads go through it and
//! writes to it mark it and every ancestor dirty. Serializing the tree folds dirty children
//! back into their parents' elements, deepest first.
//!
//! Nodes refer to their parent by arena index, never by reference, so the structure has no
//! ownership cycles. Nodes whose parent element gets overwritten are only unlinked from the
//! child cache; the arena lives as long as the tree, which is one validation or build step.
use std::collections::BTreeMap;

use log::trace;

use crate::{
    array::{ByteArray, EMPTY_ARRAY},
    error::{Error, Result},
    path::TreePath,
};

/// Element cap of every array inside a tree (indices must fit a path byte).
pub const TREE_MAX_ELEMENTS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct TreeNode {
    array: ByteArray,
    /// Parent node and the element index this node was materialized from.
    parent: Option<(NodeId, u8)>,
    children: BTreeMap<u8, NodeId>,
    /// Set when this node or a cached descendant changed since the last sync.
    dirty: bool,
    /// Set while the parent element still holds bytes older than this node.
    unwritten: bool,
}

impl TreeNode {
    fn new(array: ByteArray, parent: Option<(NodeId, u8)>) -> Self {
        Self {
            array,
            parent,
            children: BTreeMap::new(),
            dirty: false,
            unwritten: false,
        }
    }
}

/// A lazily materialized tree of arrays.
///
/// ```
/// use lazybytes::tree::Tree;
///
/// let mut tree = Tree::new();
/// tree.push_new_subtree_at_path(&[]).unwrap();
/// tree.push_data_at_path(b"leaf".to_vec(), &[0]).unwrap();
/// assert_eq!(tree.bytes_at_path(&[0, 0]).unwrap(), b"leaf");
///
/// let bytes = tree.bytes().unwrap();
/// let mut copy = Tree::from_bytes(bytes);
/// assert_eq!(copy.num_elements_at_path(&[0]).unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// A tree whose root is an empty array.
    pub fn new() -> Self {
        Self::from_array(ByteArray::with_max_elements(TREE_MAX_ELEMENTS))
    }

    /// A tree over serialized bytes. Nothing is parsed until accessed.
    pub fn from_bytes(raw: impl Into<Vec<u8>>) -> Self {
        Self::from_array(ByteArray::from_bytes_with_max(raw, TREE_MAX_ELEMENTS))
    }

    pub fn from_array(array: ByteArray) -> Self {
        Self {
            nodes: vec![TreeNode::new(array, None)],
        }
    }

    fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    /// Resolve `path` to a node, materializing and caching every array along the way.
    fn node_at_path(&mut self, path: &[u8]) -> Result<NodeId> {
        let mut current = NodeId::ROOT;
        if path.is_empty() {
            self.node_mut(current)
                .array
                .materialize()
                .map_err(|_| Error::NotAnArray {
                    path: TreePath::root(),
                })?;
        }

        for (depth, &index) in path.iter().enumerate() {
            if let Some(&child) = self.node(current).children.get(&index) {
                current = child;
                continue;
            }

            let prefix = TreePath::new(&path[..=depth]);
            let element = match self.node_mut(current).array.at(index as usize) {
                Ok(element) => element.to_vec(),
                Err(Error::IndexOutOfBounds { .. }) => {
                    return Err(Error::PathNotFound { path: prefix });
                }
                // Only the root can be unparsed here, children are checked when cached.
                Err(_) => {
                    return Err(Error::NotAnArray {
                        path: TreePath::new(&path[..depth]),
                    });
                }
            };

            let mut array = ByteArray::from_bytes_with_max(element, TREE_MAX_ELEMENTS);
            if array.materialize().is_err() {
                return Err(Error::NotAnArray { path: prefix });
            }

            let child = NodeId(self.nodes.len() as u32);
            trace!("materialized tree node at {prefix}");
            self.nodes.push(TreeNode::new(array, Some((current, index))));
            self.node_mut(current).children.insert(index, child);
            current = child;
        }
        Ok(current)
    }

    /// Mark `id` and all of its ancestors as needing a sync.
    fn invalidate(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_mut(node_id);
            node.dirty = true;
            node.unwritten = true;
            current = node.parent.map(|(parent, _)| parent);
        }
    }

    /// Fold the serialized form of every changed cached child back into its parent element.
    ///
    /// A child synced on its own (by a read through it) is clean but still unwritten, so the
    /// write-back is keyed on `unwritten` rather than `dirty`.
    fn sync(&mut self, id: NodeId) -> Result<()> {
        if !self.node(id).dirty {
            return Ok(());
        }
        let children: Vec<(u8, NodeId)> = self
            .node(id)
            .children
            .iter()
            .map(|(index, child)| (*index, *child))
            .collect();
        for (index, child) in children {
            if self.node(child).unwritten {
                self.sync(child)?;
                let bytes = self.node_mut(child).array.bytes()?.to_vec();
                self.node_mut(id).array.set_at(index as usize, bytes)?;
                self.node_mut(child).unwritten = false;
            }
        }
        self.node_mut(id).dirty = false;
        Ok(())
    }

    /// Serialized form of the whole tree.
    pub fn bytes(&mut self) -> Result<Vec<u8>> {
        self.sync(NodeId::ROOT)?;
        Ok(self.node_mut(NodeId::ROOT).array.bytes()?.to_vec())
    }

    /// Bytes of the element addressed by `path`; the empty path yields the whole tree.
    pub fn bytes_at_path(&mut self, path: &[u8]) -> Result<Vec<u8>> {
        let Some((&index, parent_path)) = path.split_last() else {
            return self.bytes();
        };
        let parent = self.node_at_path(parent_path)?;

        if let Some(&child) = self.node(parent).children.get(&index) {
            self.sync(child)?;
            return Ok(self.node_mut(child).array.bytes()?.to_vec());
        }

        match self.node_mut(parent).array.at(index as usize) {
            Ok(element) => Ok(element.to_vec()),
            Err(Error::IndexOutOfBounds { .. }) => Err(Error::PathNotFound {
                path: TreePath::new(path),
            }),
            Err(err) => Err(err),
        }
    }

    pub fn num_elements_at_path(&mut self, path: &[u8]) -> Result<usize> {
        let node = self.node_at_path(path)?;
        self.node_mut(node).array.len()
    }

    pub fn is_full_at_path(&mut self, path: &[u8]) -> Result<bool> {
        let node = self.node_at_path(path)?;
        self.node_mut(node).array.is_full()
    }

    /// Append `data` to the array at `path` and return its index.
    pub fn push_data_at_path(&mut self, data: impl Into<Vec<u8>>, path: &[u8]) -> Result<u8> {
        let node = self.node_at_path(path)?;
        let index = self.node_mut(node).array.push(data)?;
        self.invalidate(node);
        // Tree arrays hold at most 255 elements, so the index fits.
        Ok(index as u8)
    }

    /// Overwrite element `index` of the array at `path`.
    pub fn set_data_at_path_at_idx(
        &mut self,
        index: u8,
        data: impl Into<Vec<u8>>,
        path: &[u8],
    ) -> Result<()> {
        let node = self.node_at_path(path)?;
        self.node_mut(node).array.set_at(index as usize, data)?;
        self.node_mut(node).children.remove(&index);
        self.invalidate(node);
        Ok(())
    }

    /// Append an empty array to the array at `path` and return its index.
    pub fn push_new_subtree_at_path(&mut self, path: &[u8]) -> Result<u8> {
        self.push_data_at_path(EMPTY_ARRAY.to_vec(), path)
    }

    /// Append the serialized `subtree` to the array at `path` and return its index.
    pub fn push_subtree_at_path(&mut self, subtree: &mut Tree, path: &[u8]) -> Result<u8> {
        let bytes = subtree.bytes()?;
        self.push_data_at_path(bytes, path)
    }

    pub fn set_subtree_at_path_at_idx(
        &mut self,
        index: u8,
        subtree: &mut Tree,
        path: &[u8],
    ) -> Result<()> {
        let bytes = subtree.bytes()?;
        self.set_data_at_path_at_idx(index, bytes, path)
    }

    /// Independent copy of the subtree at `path`.
    pub fn subtree_at_path(&mut self, path: &[u8]) -> Result<Tree> {
        let bytes = self.bytes_at_path(path)?;
        let mut subtree = Tree::from_bytes(bytes);
        subtree
            .node_mut(NodeId::ROOT)
            .array
            .materialize()
            .map_err(|_| Error::NotAnArray {
                path: TreePath::new(path),
            })?;
        Ok(subtree)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_cache_is_reused() {
        let mut tree = Tree::new();
        tree.push_new_subtree_at_path(&[]).unwrap();
        tree.node_at_path(&[0]).unwrap();
        let nodes = tree.nodes.len();
        tree.node_at_path(&[0]).unwrap();
        assert_eq!(tree.nodes.len(), nodes);
    }

    #[test]
    fn invalidation_reaches_root() {
        let mut tree = Tree::new();
        tree.push_new_subtree_at_path(&[]).unwrap();
        tree.push_new_subtree_at_path(&[0]).unwrap();
        tree.bytes().unwrap();
        assert!(!tree.node(NodeId::ROOT).dirty);

        tree.push_data_at_path(vec![1], &[0, 0]).unwrap();
        assert!(tree.node(NodeId::ROOT).dirty);
        tree.bytes().unwrap();
        assert!(tree.nodes.iter().all(|node| !node.dirty));
    }

    #[test]
    fn overwriting_an_element_drops_its_cached_child() {
        let mut tree = Tree::new();
        tree.push_new_subtree_at_path(&[]).unwrap();
        tree.push_data_at_path(vec![9], &[0]).unwrap();
        tree.set_data_at_path_at_idx(0, vec![7, 7], &[]).unwrap();
        assert!(tree.node(NodeId::ROOT).children.is_empty());
        assert_eq!(tree.bytes_at_path(&[0]).unwrap(), vec![7, 7]);
    }
}
