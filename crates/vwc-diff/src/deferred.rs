//! Deferred diff tasks.
//!
//! Each variant owns one path and enough state to finish comparing it once
//! its input is available. Running a task either reports events directly or
//! submits further tasks through the run context; recursion never happens on
//! the call stack.

use std::sync::Arc;

use tracing::trace;
use vwc_ignore::IgnoreStack;
use vwc_live::{DirectoryNode, LiveNode, LiveResult};
use vwc_store::{ObjectStore, TreeEntry};
use vwc_types::{Dtype, ObjectId, RelativePath};

use crate::context::DiffContext;
use crate::error::{DiffError, DiffResult};
use crate::tree_diff::{diff_added_tree, diff_removed_tree, diff_trees};
use crate::workdir_diff::diff_live_directory;

/// A live node that may still need loading.
#[derive(Clone, Debug)]
pub enum PendingNode {
    Loaded(LiveNode),
    /// Child `name` of `parent`, not loaded yet.
    Child {
        parent: Arc<DirectoryNode>,
        name: String,
    },
}

impl PendingNode {
    pub async fn resolve(self, store: &dyn ObjectStore) -> LiveResult<LiveNode> {
        match self {
            Self::Loaded(node) => Ok(node),
            Self::Child { parent, name } => parent.load_child(&name, store).await,
        }
    }
}

/// One pending comparison.
#[derive(Debug)]
pub enum DeferredDiffEntry {
    /// The live root against the snapshot root trees.
    Root {
        path: RelativePath,
        dir: Arc<DirectoryNode>,
        scm_tree_ids: Vec<ObjectId>,
        ignore: Arc<IgnoreStack>,
    },
    /// A live directory no snapshot tree knows about.
    Untracked {
        path: RelativePath,
        node: PendingNode,
        ignore: Arc<IgnoreStack>,
        is_ignored: bool,
    },
    /// A live node against one or more snapshot entries at the same path.
    Modified {
        path: RelativePath,
        scm_entries: Vec<TreeEntry>,
        node: PendingNode,
        ignore: Arc<IgnoreStack>,
        is_ignored: bool,
    },
    /// An unloaded live file whose blob may differ from the snapshot's.
    ModifiedBlob {
        path: RelativePath,
        scm_entry: TreeEntry,
        current_blob_id: ObjectId,
        current_dtype: Dtype,
    },
    /// Two snapshot trees at the same path.
    ModifiedScm {
        path: RelativePath,
        scm_tree_id: ObjectId,
        wd_tree_id: ObjectId,
    },
    /// A tree present only on the working side.
    AddedScm {
        path: RelativePath,
        wd_tree_id: ObjectId,
    },
    /// A tree present only in the snapshot.
    RemovedScm {
        path: RelativePath,
        scm_tree_id: ObjectId,
    },
}

impl DeferredDiffEntry {
    pub fn untracked(
        path: RelativePath,
        node: PendingNode,
        ignore: Arc<IgnoreStack>,
        is_ignored: bool,
    ) -> Self {
        Self::Untracked {
            path,
            node,
            ignore,
            is_ignored,
        }
    }

    /// Fails with [`DiffError::NoScmEntries`] when `scm_entries` is empty.
    pub fn modified(
        path: RelativePath,
        scm_entries: Vec<TreeEntry>,
        node: PendingNode,
        ignore: Arc<IgnoreStack>,
        is_ignored: bool,
    ) -> DiffResult<Self> {
        if scm_entries.is_empty() {
            return Err(DiffError::NoScmEntries(path));
        }
        Ok(Self::Modified {
            path,
            scm_entries,
            node,
            ignore,
            is_ignored,
        })
    }

    pub fn path(&self) -> &RelativePath {
        match self {
            Self::Root { path, .. }
            | Self::Untracked { path, .. }
            | Self::Modified { path, .. }
            | Self::ModifiedBlob { path, .. }
            | Self::ModifiedScm { path, .. }
            | Self::AddedScm { path, .. }
            | Self::RemovedScm { path, .. } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Root { .. } => "root",
            Self::Untracked { .. } => "untracked",
            Self::Modified { .. } => "modified",
            Self::ModifiedBlob { .. } => "modified_blob",
            Self::ModifiedScm { .. } => "modified_scm",
            Self::AddedScm { .. } => "added_scm",
            Self::RemovedScm { .. } => "removed_scm",
        }
    }

    pub async fn run(self, ctx: Arc<DiffContext>) -> DiffResult<()> {
        let ctx = ctx.as_ref();
        match self {
            Self::Root {
                path,
                dir,
                scm_tree_ids,
                ignore,
            } => run_root(ctx, &path, dir, scm_tree_ids, ignore).await,
            Self::Untracked {
                path,
                node,
                ignore,
                is_ignored,
            } => {
                let node = node.resolve(ctx.store()).await?;
                let dir = node.as_directory().ok_or_else(|| {
                    DiffError::Bug(format!("untracked entry {path} is not a directory"))
                })?;
                diff_live_directory(ctx, &path, dir, &[], &ignore, is_ignored).await
            }
            Self::Modified {
                path,
                scm_entries,
                node,
                ignore,
                is_ignored,
            } => run_modified(ctx, path, scm_entries, node, ignore, is_ignored).await,
            Self::ModifiedBlob {
                path,
                scm_entry,
                current_blob_id,
                current_dtype,
            } => {
                let equal = ctx
                    .store()
                    .are_blobs_equal(&scm_entry.object_id, &current_blob_id)
                    .await?;
                if !equal {
                    ctx.callback().modified_path(&path, current_dtype);
                }
                Ok(())
            }
            Self::ModifiedScm {
                path,
                scm_tree_id,
                wd_tree_id,
            } => diff_trees(ctx, &path, scm_tree_id, wd_tree_id).await,
            Self::AddedScm { path, wd_tree_id } => diff_added_tree(ctx, &path, wd_tree_id).await,
            Self::RemovedScm { path, scm_tree_id } => {
                diff_removed_tree(ctx, &path, scm_tree_id).await
            }
        }
    }
}

async fn run_root(
    ctx: &DiffContext,
    path: &RelativePath,
    dir: Arc<DirectoryNode>,
    scm_tree_ids: Vec<ObjectId>,
    ignore: Arc<IgnoreStack>,
) -> DiffResult<()> {
    if let Some(tree_id) = dir.tree_id() {
        let store = ctx.store();
        if scm_tree_ids
            .iter()
            .any(|id| store.are_objects_known_identical(id, &tree_id))
        {
            trace!(path = %path, root = %tree_id.short_hex(), "root unchanged");
            return Ok(());
        }
    }
    let trees = ctx.store().get_trees(&scm_tree_ids).await?;
    diff_live_directory(ctx, path, &dir, &trees, &ignore, false).await
}

/// Dispatch on the first candidate's kind against the resolved live node.
async fn run_modified(
    ctx: &DiffContext,
    path: RelativePath,
    scm_entries: Vec<TreeEntry>,
    node: PendingNode,
    ignore: Arc<IgnoreStack>,
    is_ignored: bool,
) -> DiffResult<()> {
    let first = scm_entries
        .first()
        .ok_or_else(|| DiffError::NoScmEntries(path.clone()))?;
    let node = node.resolve(ctx.store()).await?;
    let callback = ctx.callback();

    match (node, first.is_tree()) {
        (LiveNode::File(file), true) => {
            trace!(path = %path, "directory replaced by file");
            ctx.report_untracked(&path, file.dtype(), is_ignored);
            callback.removed_path(&path, Dtype::Dir);
            diff_removed_tree(ctx, &path, first.object_id).await
        }
        (LiveNode::Directory(dir), true) => {
            if let Some(tree_id) = dir.tree_id() {
                let store = ctx.store();
                if scm_entries
                    .iter()
                    .any(|entry| store.are_objects_known_identical(&entry.object_id, &tree_id))
                {
                    return Ok(());
                }
                callback.modified_path(&path, Dtype::Dir);
                return diff_trees(ctx, &path, first.object_id, tree_id).await;
            }
            let tree_ids: Vec<ObjectId> = scm_entries
                .iter()
                .filter(|entry| entry.is_tree())
                .map(|entry| entry.object_id)
                .collect();
            let trees = ctx.store().get_trees(&tree_ids).await?;
            diff_live_directory(ctx, &path, &dir, &trees, &ignore, is_ignored).await
        }
        (LiveNode::Directory(dir), false) => {
            trace!(path = %path, "file replaced by directory");
            callback.removed_path(&path, ctx.filtered_dtype(first.entry_type.dtype()));
            if ctx.report_dir_over_file(&path, is_ignored) {
                ctx.defer(DeferredDiffEntry::untracked(
                    path,
                    PendingNode::Loaded(LiveNode::Directory(dir)),
                    ignore,
                    is_ignored,
                ));
            }
            Ok(())
        }
        (LiveNode::File(file), false) => {
            let scm_type = ctx.filtered_type(first.entry_type);
            if !file.is_same_as(ctx.store(), &first.object_id, scm_type).await? {
                callback.modified_path(&path, file.dtype());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use vwc_ignore::IgnoreConfig;
    use vwc_live::FileNode;
    use vwc_types::EntryType;

    use super::*;
    use crate::testing::path;

    #[test]
    fn modified_requires_candidates() {
        let node = PendingNode::Loaded(LiveNode::File(FileNode::materialized(
            EntryType::RegularFile,
            b"x".to_vec(),
        )));
        let result = DeferredDiffEntry::modified(
            path("a/b"),
            Vec::new(),
            node,
            IgnoreStack::new(IgnoreConfig::default()),
            false,
        );
        match result {
            Err(DiffError::NoScmEntries(p)) => assert_eq!(p, path("a/b")),
            other => panic!("expected NoScmEntries, got {other:?}"),
        }
    }

    #[test]
    fn path_and_kind() {
        let entry = DeferredDiffEntry::AddedScm {
            path: path("x"),
            wd_tree_id: ObjectId::null(),
        };
        assert_eq!(entry.path(), &path("x"));
        assert_eq!(entry.kind(), "added_scm");

        let root = DeferredDiffEntry::Root {
            path: RelativePath::root(),
            dir: DirectoryNode::new_materialized(true),
            scm_tree_ids: Vec::new(),
            ignore: IgnoreStack::new(IgnoreConfig::default()),
        };
        assert!(root.path().is_root());
    }
}
