/// Arena-backed directory set produced by the walker.
///
/// Nodes live in a flat `Vec<DirectoryNode>`. The `parent` link is a plain
/// `NodeIndex`, used only to derive relative paths; the walker never follows
/// it, so the arena cannot form cycles.
use compact_str::CompactString;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Lightweight index into the arena `Vec<DirectoryNode>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Create a new `NodeIndex` from a `usize`.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeIndex overflow");
        Self(index as u32)
    }

    /// Return the index as a `usize` for Vec indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A directory that passed the access gate during the walk.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    /// Absolute path of the directory.
    pub path: PathBuf,

    /// Final path component (the root keeps its full display form).
    pub name: CompactString,

    /// Parent in the arena. `None` for the walk root.
    pub parent: Option<NodeIndex>,

    /// Distance from the walk root (root = 0).
    pub depth: u32,
}

impl DirectoryNode {
    /// Create the walk root node.
    pub fn new_root(path: PathBuf) -> Self {
        let name = CompactString::new(path.to_string_lossy());
        Self {
            path,
            name,
            parent: None,
            depth: 0,
        }
    }

    /// Create a child node below `parent`.
    pub fn new_child(path: PathBuf, parent: NodeIndex, depth: u32) -> Self {
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_default();
        Self {
            path,
            name,
            parent: Some(parent),
            depth,
        }
    }
}

/// The set of accessible directories discovered by one walk.
///
/// Iteration order follows discovery order, which depends on the
/// filesystem's enumeration order. Only membership is meaningful.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    /// Arena: every admitted directory.
    pub nodes: Vec<DirectoryNode>,
}

impl DirectoryTree {
    /// Create a tree holding only `root`.
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            nodes: vec![DirectoryNode::new_root(root)],
        }
    }

    /// Index of the walk root.
    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Allocate a new node in the arena and return its index.
    pub fn add_node(&mut self, node: DirectoryNode) -> NodeIndex {
        let idx = NodeIndex::new(self.nodes.len());
        self.nodes.push(node);
        idx
    }

    /// Get a node by index.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> &DirectoryNode {
        &self.nodes[index.idx()]
    }

    /// Number of directories, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false` for a walked tree: the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `true` if `path` was admitted by the walk.
    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.iter().any(|n| n.path == path)
    }

    /// Collect the admitted paths into an unordered set.
    pub fn path_set(&self) -> HashSet<PathBuf> {
        self.nodes.iter().map(|n| n.path.clone()).collect()
    }

    /// Path of `index` relative to the walk root, rebuilt from the parent chain.
    ///
    /// The root itself yields an empty path.
    pub fn relative_path(&self, index: NodeIndex) -> PathBuf {
        let mut segments = Vec::new();
        let mut current = Some(index);
        while let Some(idx) = current {
            let node = self.node(idx);
            if node.parent.is_none() {
                break;
            }
            segments.push(node.name.as_str());
            current = node.parent;
        }
        segments.iter().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> DirectoryTree {
        let mut tree = DirectoryTree::with_root(PathBuf::from("/data"));
        let root = tree.root();
        let src = tree.add_node(DirectoryNode::new_child(PathBuf::from("/data/src"), root, 1));
        tree.add_node(DirectoryNode::new_child(
            PathBuf::from("/data/src/util"),
            src,
            2,
        ));
        tree
    }

    #[test]
    fn relative_path_walks_parent_chain() {
        let tree = sample_tree();
        assert_eq!(tree.relative_path(NodeIndex(2)), PathBuf::from("src").join("util"));
        assert_eq!(tree.relative_path(tree.root()), PathBuf::new());
    }

    #[test]
    fn membership_is_by_absolute_path() {
        let tree = sample_tree();
        assert_eq!(tree.len(), 3);
        assert!(tree.contains(Path::new("/data/src/util")));
        assert!(!tree.contains(Path::new("/data/other")));
        assert_eq!(tree.path_set().len(), 3);
    }

    #[test]
    fn child_nodes_record_depth_and_name() {
        let tree = sample_tree();
        let util = tree.node(NodeIndex(2));
        assert_eq!(util.name, "util");
        assert_eq!(util.depth, 2);
        assert_eq!(util.parent, Some(NodeIndex(1)));
    }
}
