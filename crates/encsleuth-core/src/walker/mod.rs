/// Permission-aware directory walker.
///
/// Explicit-stack depth-first traversal. Every child directory is checked
/// against the [`AccessGate`] before it is entered, so a denied subtree is
/// never enumerated and none of its descendants are ever queried. Only
/// problems with the root are fatal; a non-root directory that cannot be
/// read is logged and its branch dropped.
///
/// Symbolic links are never followed.
use crate::error::ScanError;
use crate::model::{DirectoryNode, DirectoryTree, NodeIndex};
use crate::platform::{AccessGate, AccessRight};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Walk `root`, keeping every directory for which the gate grants `right`.
pub fn walk<G>(root: &Path, gate: &G, right: AccessRight) -> Result<DirectoryTree, ScanError>
where
    G: AccessGate + ?Sized,
{
    walk_inner(root, gate, right, None)
}

/// Like [`walk`], but checks `cancel` before each directory.
///
/// Returns [`ScanError::Cancelled`] and discards the partial tree as soon as
/// the flag is observed set.
pub fn walk_cancellable<G>(
    root: &Path,
    gate: &G,
    right: AccessRight,
    cancel: &AtomicBool,
) -> Result<DirectoryTree, ScanError>
where
    G: AccessGate + ?Sized,
{
    walk_inner(root, gate, right, Some(cancel))
}

fn walk_inner<G>(
    root: &Path,
    gate: &G,
    right: AccessRight,
    cancel: Option<&AtomicBool>,
) -> Result<DirectoryTree, ScanError>
where
    G: AccessGate + ?Sized,
{
    let is_cancelled = || cancel.is_some_and(|c| c.load(Ordering::Relaxed));
    if is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let meta = fs::metadata(root).map_err(|e| ScanError::io(root, e))?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    if !gate.can_access(root, right) {
        return Err(ScanError::RootInaccessible {
            path: root.to_path_buf(),
        });
    }

    let mut tree = DirectoryTree::with_root(root.to_path_buf());
    let mut stack: Vec<NodeIndex> = vec![tree.root()];
    let mut pruned: u64 = 0;

    while let Some(idx) = stack.pop() {
        if is_cancelled() {
            debug!("Walk cancelled with {} directories pending", stack.len() + 1);
            return Err(ScanError::Cancelled);
        }

        let (dir, depth) = {
            let node = tree.node(idx);
            (node.path.clone(), node.depth)
        };

        let children = match child_directories(&dir) {
            Ok(children) => children,
            Err(err) if idx == tree.root() => return Err(ScanError::io(&dir, err)),
            Err(err) => {
                warn!("Cannot read directory {}: {err}", dir.display());
                continue;
            }
        };

        for child in children {
            if !gate.can_access(&child, right) {
                debug!("Pruning {} ({right:?} denied)", child.display());
                pruned += 1;
                continue;
            }
            let child_idx = tree.add_node(DirectoryNode::new_child(child, idx, depth + 1));
            stack.push(child_idx);
        }
    }

    debug!(
        "Walk of {} found {} directories, pruned {pruned}",
        root.display(),
        tree.len()
    );
    Ok(tree)
}

/// Immediate subdirectories of `dir`, symlinks excluded.
///
/// An individual entry that cannot be inspected is skipped; only failure to
/// open the directory itself is an error.
fn child_directories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("Skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };
        match entry.file_type() {
            Ok(ft) if ft.is_dir() && !ft.is_symlink() => children.push(entry.path()),
            Ok(_) => {}
            Err(err) => warn!("Cannot stat {}: {err}", entry.path().display()),
        }
    }
    Ok(children)
}
