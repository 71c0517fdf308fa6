//! Loading on-disk directories into the object store and the live tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::debug;
use vwc_live::WorkingCopy;
use vwc_store::{InMemoryObjectStore, ObjectStore, Tree, TreeEntry};
use vwc_types::{EntryType, ObjectId, RelativePath};
use walkdir::{DirEntry, WalkDir};

/// Store every file under `root` and return the id of its root tree.
///
/// Entries named in `skip` are left out along with everything beneath them.
pub fn import_snapshot(store: &InMemoryObjectStore, root: &Path, skip: &[String]) -> anyhow::Result<ObjectId> {
    let mut pending: HashMap<PathBuf, Vec<TreeEntry>> = HashMap::new();
    let walker = WalkDir::new(root)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry, skip));

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let (entry_type, id) = if entry.file_type().is_dir() {
            let entries = pending.remove(entry.path()).unwrap_or_default();
            let id = store.put_tree(&Tree::new(entries))?;
            if entry.depth() == 0 {
                debug!(root = %root.display(), tree = %id.short_hex(), "imported snapshot");
                return Ok(id);
            }
            (EntryType::Tree, id)
        } else {
            let (entry_type, data) = read_leaf(&entry)?;
            (entry_type, store.put_blob(data)?)
        };

        let name = file_name(&entry)?;
        let parent = entry
            .path()
            .parent()
            .ok_or_else(|| anyhow!("{} has no parent", entry.path().display()))?;
        pending
            .entry(parent.to_path_buf())
            .or_default()
            .push(TreeEntry::new(name, entry_type, id));
    }
    Err(anyhow!("{} is not a directory", root.display()))
}

/// Build a fully materialized working copy mirroring `root`.
pub async fn load_working_copy(
    store: Arc<dyn ObjectStore>,
    root: &Path,
    symlinks_enabled: bool,
    skip: &[String],
) -> anyhow::Result<WorkingCopy> {
    let wc = WorkingCopy::empty(store, symlinks_enabled);
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry, skip));

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let path = relative_path(root, entry.path())?;
        if entry.file_type().is_dir() {
            wc.mkdir(&path).await?;
        } else {
            let (entry_type, data) = read_leaf(&entry)?;
            wc.write_file(&path, data, entry_type).await?;
        }
    }
    Ok(wc)
}

fn is_skipped(entry: &DirEntry, skip: &[String]) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| skip.iter().any(|s| s == name))
}

fn file_name(entry: &DirEntry) -> anyhow::Result<String> {
    entry
        .file_name()
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("non-UTF-8 file name: {}", entry.path().display()))
}

fn relative_path(root: &Path, path: &Path) -> anyhow::Result<RelativePath> {
    let relative = path.strip_prefix(root)?;
    let mut components = Vec::new();
    for component in relative.components() {
        let name = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF-8 path: {}", path.display()))?;
        components.push(name);
    }
    Ok(RelativePath::new(components.join("/"))?)
}

/// Entry type and content of a file or symlink. A symlink's content is its
/// target.
fn read_leaf(entry: &DirEntry) -> anyhow::Result<(EntryType, Vec<u8>)> {
    let path = entry.path();
    if entry.file_type().is_symlink() {
        let target = std::fs::read_link(path).with_context(|| format!("reading link {}", path.display()))?;
        let target = target
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF-8 symlink target: {}", path.display()))?;
        return Ok((EntryType::Symlink, target.as_bytes().to_vec()));
    }
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let metadata = entry.metadata()?;
    Ok((file_entry_type(&metadata), data))
}

#[cfg(unix)]
fn file_entry_type(metadata: &std::fs::Metadata) -> EntryType {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        EntryType::ExecutableFile
    } else {
        EntryType::RegularFile
    }
}

#[cfg(not(unix))]
fn file_entry_type(_metadata: &std::fs::Metadata) -> EntryType {
    EntryType::RegularFile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, data: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn import_is_content_addressed() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for dir in [a.path(), b.path()] {
            write(dir, "x.txt", "x");
            write(dir, "sub/y.txt", "y");
        }
        let store = InMemoryObjectStore::new();
        let id_a = import_snapshot(&store, a.path(), &[]).unwrap();
        let id_b = import_snapshot(&store, b.path(), &[]).unwrap();
        assert_eq!(id_a, id_b);

        write(b.path(), "sub/y.txt", "changed");
        let id_b = import_snapshot(&store, b.path(), &[]).unwrap();
        assert_ne!(id_a, id_b);
    }

    #[tokio::test]
    async fn import_builds_nested_trees() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sub/deeper/z.txt", "z");
        write(dir.path(), ".git/HEAD", "ref");
        let store = InMemoryObjectStore::new();
        let id = import_snapshot(&store, dir.path(), &[".git".to_string()]).unwrap();

        let root = store.get_tree(&id).await.unwrap();
        assert_eq!(root.len(), 1);
        let sub = root.get("sub").unwrap();
        assert!(sub.is_tree());
        let sub = store.get_tree(&sub.object_id).await.unwrap();
        assert!(sub.get("deeper").unwrap().is_tree());
    }

    #[tokio::test]
    async fn empty_directories_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        let store = Arc::new(InMemoryObjectStore::new());
        let id = import_snapshot(&store, dir.path(), &[]).unwrap();
        assert!(store.get_tree(&id).await.unwrap().get("empty").unwrap().is_tree());

        let wc = load_working_copy(store.clone(), dir.path(), true, &[]).await.unwrap();
        let node = wc.lookup(&RelativePath::new("empty").unwrap()).await.unwrap();
        assert!(node.is_directory());
    }

    #[test]
    fn import_of_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "f", "x");
        let store = InMemoryObjectStore::new();
        assert!(import_snapshot(&store, &dir.path().join("f"), &[]).is_err());
    }
}
