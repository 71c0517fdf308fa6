//! One level of the live tree against the snapshot trees at the same path.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace, warn};
use vwc_ignore::{FileType, IgnoreStack, IgnoreStatus};
use vwc_live::{DirEntry, DirectoryNode, LiveNode};
use vwc_store::{StoreResult, Tree, TreeEntry};
use vwc_types::{Dtype, EntryType, RelativePath};

use crate::context::DiffContext;
use crate::deferred::{DeferredDiffEntry, PendingNode};
use crate::error::{DiffError, DiffResult};

const GITIGNORE: &str = ".gitignore";

/// Compare live directory `dir` at `path` with `trees`.
///
/// Names are matched across every tree, keeping the tree order so the first
/// candidate for a name comes from the first tree that has it. Anything that
/// needs data not yet in memory is deferred; the rest is reported here.
pub async fn diff_live_directory(
    ctx: &DiffContext,
    path: &RelativePath,
    dir: &Arc<DirectoryNode>,
    trees: &[Arc<Tree>],
    ignore: &Arc<IgnoreStack>,
    is_ignored: bool,
) -> DiffResult<()> {
    let ignore = if is_ignored {
        Arc::clone(ignore)
    } else {
        load_gitignore(ctx, path, dir, ignore).await?
    };

    let listing = dir.snapshot();
    let case_sensitive = ctx.options().case_sensitive;
    let key = |name: &str| {
        if case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    };

    // Names that fold to the same key keep only the first entry per side.
    let mut live: BTreeMap<String, (String, DirEntry)> = BTreeMap::new();
    for (name, entry) in listing.entries {
        match live.entry(key(&name)) {
            Entry::Vacant(slot) => {
                slot.insert((name, entry));
            }
            Entry::Occupied(slot) => {
                warn!(path = %path, kept = %slot.get().0, skipped = %name, "live names collide when case-folded");
            }
        }
    }
    let mut scm: BTreeMap<String, Vec<TreeEntry>> = BTreeMap::new();
    for tree in trees {
        let mut seen = HashSet::new();
        for entry in &tree.entries {
            let k = key(&entry.name);
            if !seen.insert(k.clone()) {
                warn!(path = %path, skipped = %entry.name, "snapshot names collide when case-folded");
                continue;
            }
            scm.entry(k).or_default().push(entry.clone());
        }
    }

    let level = Level {
        ctx,
        path,
        dir,
        ignore: &ignore,
        is_ignored,
    };
    for (k, candidates) in &scm {
        if !live.contains_key(k) {
            level.removed(candidates);
        }
    }
    for (k, (name, entry)) in live {
        match scm.remove(&k) {
            Some(candidates) => level.both_present(&name, entry, candidates)?,
            None => level.untracked(&name, entry),
        }
    }
    Ok(())
}

/// Push `dir/.gitignore` onto `ignore` if the directory has one.
///
/// An unreadable ignore file is logged and treated as empty.
async fn load_gitignore(
    ctx: &DiffContext,
    path: &RelativePath,
    dir: &DirectoryNode,
    ignore: &Arc<IgnoreStack>,
) -> DiffResult<Arc<IgnoreStack>> {
    let contents: StoreResult<Arc<[u8]>> = match dir.get(GITIGNORE) {
        None => return Ok(Arc::clone(ignore)),
        Some(DirEntry::Loaded(LiveNode::File(file))) if file.entry_type() != EntryType::Symlink => {
            file.read_all(ctx.store()).await
        }
        Some(DirEntry::Unloaded {
            entry_type,
            object_id,
        }) if !entry_type.is_tree() && entry_type != EntryType::Symlink => ctx
            .store()
            .get_blob(&object_id)
            .await
            .map(|blob| Arc::from(blob.data.as_slice())),
        Some(_) => {
            debug!(path = %path, "ignoring non-regular .gitignore");
            return Ok(Arc::clone(ignore));
        }
    };
    match contents {
        Ok(data) => Ok(ignore.push(path.clone(), &String::from_utf8_lossy(&data))?),
        Err(err) => {
            warn!(path = %path, error = %err, "failed to load .gitignore");
            Ok(Arc::clone(ignore))
        }
    }
}

struct Level<'a> {
    ctx: &'a DiffContext,
    path: &'a RelativePath,
    dir: &'a Arc<DirectoryNode>,
    ignore: &'a Arc<IgnoreStack>,
    is_ignored: bool,
}

impl Level<'_> {
    fn pending(&self, name: &str, entry: DirEntry) -> PendingNode {
        match entry {
            DirEntry::Loaded(node) => PendingNode::Loaded(node),
            DirEntry::Unloaded { .. } => PendingNode::Child {
                parent: Arc::clone(self.dir),
                name: name.to_string(),
            },
        }
    }

    fn untracked(&self, name: &str, entry: DirEntry) {
        let entry_path = self.path.join(name);
        let mut entry_ignored = self.is_ignored;
        if !self.is_ignored {
            match self.ignore.match_path(&entry_path, file_type(&entry)) {
                IgnoreStatus::Hidden => {
                    trace!(path = %entry_path, "hidden");
                    return;
                }
                IgnoreStatus::Exclude => entry_ignored = true,
                IgnoreStatus::Include => {}
            }
        }

        if entry.is_directory() {
            if !entry_ignored || self.ctx.list_ignored() {
                let node = self.pending(name, entry);
                self.ctx.defer(DeferredDiffEntry::untracked(
                    entry_path,
                    node,
                    Arc::clone(self.ignore),
                    entry_ignored,
                ));
            }
        } else {
            self.ctx.report_untracked(&entry_path, entry.dtype(), entry_ignored);
        }
    }

    fn removed(&self, candidates: &[TreeEntry]) {
        let Some(first) = candidates.first() else {
            return;
        };
        let entry_path = self.path.join(&first.name);
        if first.is_tree() {
            self.ctx.defer(DeferredDiffEntry::RemovedScm {
                path: entry_path,
                scm_tree_id: first.object_id,
            });
        } else {
            let dtype = self.ctx.filtered_dtype(first.entry_type.dtype());
            self.ctx.callback().removed_path(&entry_path, dtype);
        }
    }

    fn both_present(&self, name: &str, entry: DirEntry, candidates: Vec<TreeEntry>) -> DiffResult<()> {
        let ctx = self.ctx;
        let entry_path = self.path.join(name);
        let Some(first) = candidates.first().cloned() else {
            return Err(DiffError::NoScmEntries(entry_path));
        };

        let mut entry_ignored = self.is_ignored;
        if !self.is_ignored && (entry.is_directory() || first.is_tree()) {
            // A tracked entry under a hidden name is treated as ignored.
            entry_ignored = self.ignore.match_path(&entry_path, file_type(&entry)) != IgnoreStatus::Include;
        }

        let (entry_type, object_id) = match entry {
            DirEntry::Loaded(node) => {
                ctx.defer(DeferredDiffEntry::modified(
                    entry_path,
                    candidates,
                    PendingNode::Loaded(node),
                    Arc::clone(self.ignore),
                    entry_ignored,
                )?);
                return Ok(());
            }
            DirEntry::Unloaded {
                entry_type,
                object_id,
            } => (entry_type, object_id),
        };

        let scm_type = ctx.filtered_type(first.entry_type);
        let store = ctx.store();
        if entry_type == scm_type
            && candidates
                .iter()
                .any(|c| store.are_objects_known_identical(&c.object_id, &object_id))
        {
            return Ok(());
        }

        let callback = ctx.callback();
        match (entry_type.is_tree(), scm_type.is_tree()) {
            (true, true) => ctx.defer(DeferredDiffEntry::ModifiedScm {
                path: entry_path,
                scm_tree_id: first.object_id,
                wd_tree_id: object_id,
            }),
            (true, false) => {
                callback.removed_path(&entry_path, scm_type.dtype());
                if ctx.report_dir_over_file(&entry_path, entry_ignored) {
                    let node = PendingNode::Child {
                        parent: Arc::clone(self.dir),
                        name: name.to_string(),
                    };
                    ctx.defer(DeferredDiffEntry::untracked(
                        entry_path,
                        node,
                        Arc::clone(self.ignore),
                        entry_ignored,
                    ));
                }
            }
            (false, true) => {
                callback.removed_path(&entry_path, Dtype::Dir);
                ctx.report_untracked(&entry_path, entry_type.dtype(), entry_ignored);
                ctx.defer(DeferredDiffEntry::RemovedScm {
                    path: entry_path,
                    scm_tree_id: first.object_id,
                });
            }
            (false, false) if entry_type != scm_type => {
                callback.modified_path(&entry_path, entry_type.dtype());
            }
            (false, false) => ctx.defer(DeferredDiffEntry::ModifiedBlob {
                path: entry_path,
                scm_entry: first,
                current_blob_id: object_id,
                current_dtype: entry_type.dtype(),
            }),
        }
        Ok(())
    }
}

fn file_type(entry: &DirEntry) -> FileType {
    if entry.is_directory() {
        FileType::Dir
    } else {
        FileType::File
    }
}
