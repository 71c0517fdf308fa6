//! Snapshot-tree against snapshot-tree comparison.
//!
//! Both sides are immutable trees, so equal ids prove equal subtrees and
//! whole directories are skipped without a fetch. Subdirectories are never
//! compared inline: each becomes a deferred task.

use std::collections::BTreeMap;

use tracing::trace;
use vwc_store::TreeEntry;
use vwc_types::{Dtype, ObjectId, RelativePath};

use crate::context::DiffContext;
use crate::deferred::DeferredDiffEntry;
use crate::error::DiffResult;

/// Compare snapshot tree `scm_id` (old) with `wd_id` (new) at `path`.
pub async fn diff_trees(
    ctx: &DiffContext,
    path: &RelativePath,
    scm_id: ObjectId,
    wd_id: ObjectId,
) -> DiffResult<()> {
    let store = ctx.store();
    if store.are_objects_known_identical(&scm_id, &wd_id) {
        trace!(path = %path, "trees identical");
        return Ok(());
    }
    let (scm_tree, wd_tree) = futures::try_join!(store.get_tree(&scm_id), store.get_tree(&wd_id))?;

    let scm_entries = entries_to_map(&scm_tree.entries);
    let wd_entries = entries_to_map(&wd_tree.entries);

    for (name, scm_entry) in &scm_entries {
        let entry_path = path.join(name);
        match wd_entries.get(name) {
            Some(wd_entry) => diff_entries(ctx, entry_path, scm_entry, wd_entry),
            None => report_removed(ctx, entry_path, scm_entry),
        }
    }
    for (name, wd_entry) in &wd_entries {
        if !scm_entries.contains_key(name) {
            report_added(ctx, path.join(name), wd_entry);
        }
    }
    Ok(())
}

/// Report every leaf under tree `wd_id` as added.
pub async fn diff_added_tree(ctx: &DiffContext, path: &RelativePath, wd_id: ObjectId) -> DiffResult<()> {
    let tree = ctx.store().get_tree(&wd_id).await?;
    for entry in &tree.entries {
        report_added(ctx, path.join(&entry.name), entry);
    }
    Ok(())
}

/// Report every leaf under tree `scm_id` as removed.
pub async fn diff_removed_tree(
    ctx: &DiffContext,
    path: &RelativePath,
    scm_id: ObjectId,
) -> DiffResult<()> {
    let tree = ctx.store().get_tree(&scm_id).await?;
    for entry in &tree.entries {
        report_removed(ctx, path.join(&entry.name), entry);
    }
    Ok(())
}

fn entries_to_map(entries: &[TreeEntry]) -> BTreeMap<&str, &TreeEntry> {
    entries.iter().map(|e| (e.name.as_str(), e)).collect()
}

fn report_added(ctx: &DiffContext, path: RelativePath, entry: &TreeEntry) {
    if entry.is_tree() {
        ctx.defer(DeferredDiffEntry::AddedScm {
            path,
            wd_tree_id: entry.object_id,
        });
    } else {
        let dtype = ctx.filtered_dtype(entry.entry_type.dtype());
        ctx.callback().added_path(&path, dtype);
    }
}

fn report_removed(ctx: &DiffContext, path: RelativePath, entry: &TreeEntry) {
    if entry.is_tree() {
        ctx.defer(DeferredDiffEntry::RemovedScm {
            path,
            scm_tree_id: entry.object_id,
        });
    } else {
        let dtype = ctx.filtered_dtype(entry.entry_type.dtype());
        ctx.callback().removed_path(&path, dtype);
    }
}

/// Same name on both sides.
fn diff_entries(ctx: &DiffContext, path: RelativePath, scm: &TreeEntry, wd: &TreeEntry) {
    let scm_type = ctx.filtered_type(scm.entry_type);
    let wd_type = ctx.filtered_type(wd.entry_type);
    let identical = scm_type == wd_type
        && ctx
            .store()
            .are_objects_known_identical(&scm.object_id, &wd.object_id);
    if identical {
        return;
    }

    let callback = ctx.callback();
    match (scm_type.is_tree(), wd_type.is_tree()) {
        (true, true) => ctx.defer(DeferredDiffEntry::ModifiedScm {
            path,
            scm_tree_id: scm.object_id,
            wd_tree_id: wd.object_id,
        }),
        (false, false) if scm_type != wd_type => callback.modified_path(&path, wd_type.dtype()),
        (false, false) => ctx.defer(DeferredDiffEntry::ModifiedBlob {
            path,
            scm_entry: scm.clone(),
            current_blob_id: wd.object_id,
            current_dtype: wd_type.dtype(),
        }),
        (true, false) => {
            callback.removed_path(&path, Dtype::Dir);
            callback.added_path(&path, wd_type.dtype());
            ctx.defer(DeferredDiffEntry::RemovedScm {
                path,
                scm_tree_id: scm.object_id,
            });
        }
        (false, true) => {
            callback.removed_path(&path, scm_type.dtype());
            callback.added_path(&path, Dtype::Dir);
            ctx.defer(DeferredDiffEntry::AddedScm {
                path,
                wd_tree_id: wd.object_id,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use vwc_store::{InMemoryObjectStore, Tree};
    use vwc_types::EntryType;

    use super::*;
    use crate::engine::DiffEngine;
    use crate::error::DiffError;
    use crate::options::DiffOptions;
    use crate::testing::{blob, nested_tree, tree, Event, Recorder};

    async fn run(store: &Arc<InMemoryObjectStore>, old: ObjectId, new: ObjectId) -> Arc<Recorder> {
        let recorder = Arc::new(Recorder::default());
        DiffEngine::new(store.clone(), DiffOptions::default())
            .diff_snapshots(old, new, recorder.clone())
            .await
            .unwrap();
        recorder
    }

    #[tokio::test]
    async fn identical_trees_fetch_nothing() {
        let store = Arc::new(InMemoryObjectStore::new());
        let root = nested_tree(&store, 4, "same");
        let recorder = run(&store, root, root).await;
        assert!(recorder.events().is_empty());
        assert_eq!(store.stats().tree_fetches(), 0);
    }

    #[tokio::test]
    async fn added_removed_and_modified_files() {
        let store = Arc::new(InMemoryObjectStore::new());
        let keep = blob(&store, "keep");
        let old = tree(
            &store,
            vec![
                ("keep.txt", EntryType::RegularFile, keep),
                ("modify.txt", EntryType::RegularFile, blob(&store, "v1")),
                ("delete.txt", EntryType::RegularFile, blob(&store, "gone")),
            ],
        );
        let new = tree(
            &store,
            vec![
                ("keep.txt", EntryType::RegularFile, keep),
                ("modify.txt", EntryType::RegularFile, blob(&store, "v2")),
                ("added.txt", EntryType::RegularFile, blob(&store, "new")),
            ],
        );

        let recorder = run(&store, old, new).await;
        let expected: BTreeSet<_> = [
            (Event::Modified, "modify.txt".to_string(), Dtype::Regular),
            (Event::Removed, "delete.txt".to_string(), Dtype::Regular),
            (Event::Added, "added.txt".to_string(), Dtype::Regular),
        ]
        .into_iter()
        .collect();
        assert_eq!(recorder.event_set(), expected);
    }

    #[tokio::test]
    async fn mode_change_is_modified_without_fetch() {
        let store = Arc::new(InMemoryObjectStore::new());
        let script = blob(&store, "#!/bin/sh");
        let old = tree(&store, vec![("run.sh", EntryType::RegularFile, script)]);
        let new = tree(&store, vec![("run.sh", EntryType::ExecutableFile, script)]);

        let recorder = run(&store, old, new).await;
        assert_eq!(
            recorder.events(),
            vec![(Event::Modified, "run.sh".to_string(), Dtype::Regular)]
        );
        assert_eq!(store.stats().blob_fetches(), 0);
    }

    #[tokio::test]
    async fn unchanged_subdirectory_is_skipped() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sub = nested_tree(&store, 3, "deep");
        let old = tree(
            &store,
            vec![
                ("sub", EntryType::Tree, sub),
                ("a", EntryType::RegularFile, blob(&store, "1")),
            ],
        );
        let new = tree(
            &store,
            vec![
                ("sub", EntryType::Tree, sub),
                ("a", EntryType::RegularFile, blob(&store, "2")),
            ],
        );

        let recorder = run(&store, old, new).await;
        assert_eq!(recorder.events().len(), 1);
        assert_eq!(store.stats().tree_fetches(), 2, "only the two roots");
    }

    #[tokio::test]
    async fn directory_replaced_by_file_reports_every_leaf() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sub = nested_tree(&store, 1, "x");
        let old = tree(&store, vec![("p", EntryType::Tree, sub)]);
        let new = tree(&store, vec![("p", EntryType::Symlink, blob(&store, "target"))]);

        let recorder = run(&store, old, new).await;
        let expected: BTreeSet<_> = [
            (Event::Removed, "p".to_string(), Dtype::Dir),
            (Event::Added, "p".to_string(), Dtype::Symlink),
            (Event::Removed, "p/f0.txt".to_string(), Dtype::Regular),
            (Event::Removed, "p/d/f1.txt".to_string(), Dtype::Regular),
        ]
        .into_iter()
        .collect();
        assert_eq!(recorder.event_set(), expected);
    }

    #[tokio::test]
    async fn file_replaced_by_directory_reports_every_leaf() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sub = nested_tree(&store, 0, "x");
        let old = tree(&store, vec![("p", EntryType::RegularFile, blob(&store, "f"))]);
        let new = tree(&store, vec![("p", EntryType::Tree, sub)]);

        let recorder = run(&store, old, new).await;
        let expected: BTreeSet<_> = [
            (Event::Removed, "p".to_string(), Dtype::Regular),
            (Event::Added, "p".to_string(), Dtype::Dir),
            (Event::Added, "p/f0.txt".to_string(), Dtype::Regular),
        ]
        .into_iter()
        .collect();
        assert_eq!(recorder.event_set(), expected);
    }

    #[tokio::test]
    async fn symlinks_compare_as_files_when_unsupported() {
        let store = Arc::new(InMemoryObjectStore::new());
        let target = blob(&store, "target");
        let old = tree(&store, vec![("l", EntryType::Symlink, target)]);
        let new = tree(&store, vec![("l", EntryType::RegularFile, target)]);

        let options = DiffOptions {
            symlinks_enabled: false,
            ..Default::default()
        };
        let recorder = Arc::new(Recorder::default());
        DiffEngine::new(store.clone(), options)
            .diff_snapshots(old, new, recorder.clone())
            .await
            .unwrap();
        assert!(recorder.events().is_empty());

        let recorder = run(&store, old, new).await;
        assert!(recorder.has(Event::Modified, "l", Dtype::Regular));
    }

    #[tokio::test]
    async fn missing_tree_fails_but_siblings_report() {
        let store = Arc::new(InMemoryObjectStore::new());
        let broken = store.put_tree(&Tree::empty()).unwrap();
        let fine = nested_tree(&store, 0, "ok");
        let old = tree(
            &store,
            vec![
                ("broken", EntryType::Tree, nested_tree(&store, 0, "old")),
                ("fine", EntryType::Tree, nested_tree(&store, 0, "before")),
            ],
        );
        let new = tree(
            &store,
            vec![
                ("broken", EntryType::Tree, broken),
                ("fine", EntryType::Tree, fine),
            ],
        );
        store.remove(&broken);

        let recorder = Arc::new(Recorder::default());
        let result = DiffEngine::new(store.clone(), DiffOptions::default())
            .diff_snapshots(old, new, recorder.clone())
            .await;
        assert!(matches!(result, Err(DiffError::Store(_))));
        assert!(recorder.has(Event::Modified, "fine/f0.txt", Dtype::Regular));
    }
}
