use std::sync::Arc;

use tracing::debug;
use vwc_store::ObjectStore;
use vwc_types::{filtered_entry_type, EntryType, ObjectId, RelativePath};

use crate::directory::{DirEntry, DirectoryNode};
use crate::error::{LiveError, LiveResult};
use crate::file::FileNode;
use crate::node::LiveNode;

/// Root handle of a live tree.
///
/// Every mutation walks from the root and materializes each directory on the
/// way down, so an unmaterialized directory's tree id is never stale.
pub struct WorkingCopy {
    root: Arc<DirectoryNode>,
    store: Arc<dyn ObjectStore>,
    symlinks_enabled: bool,
}

impl WorkingCopy {
    /// A working copy checked out from snapshot tree `root_tree`.
    ///
    /// Only the root listing is fetched; everything below loads on demand.
    pub async fn checkout(
        store: Arc<dyn ObjectStore>,
        root_tree: ObjectId,
        symlinks_enabled: bool,
    ) -> LiveResult<Self> {
        let tree = store.get_tree(&root_tree).await?;
        debug!(root = %root_tree.short_hex(), entries = tree.len(), "checked out working copy");
        Ok(Self {
            root: DirectoryNode::from_tree(root_tree, &tree, symlinks_enabled),
            store,
            symlinks_enabled,
        })
    }

    /// An empty, materialized working copy.
    pub fn empty(store: Arc<dyn ObjectStore>, symlinks_enabled: bool) -> Self {
        Self {
            root: DirectoryNode::new_materialized(symlinks_enabled),
            store,
            symlinks_enabled,
        }
    }

    pub fn root(&self) -> &Arc<DirectoryNode> {
        &self.root
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Resolve `path`, loading nodes along the way.
    pub async fn lookup(&self, path: &RelativePath) -> LiveResult<LiveNode> {
        let mut node = LiveNode::Directory(Arc::clone(&self.root));
        for name in path.components() {
            let dir = match &node {
                LiveNode::Directory(dir) => Arc::clone(dir),
                LiveNode::File(_) => return Err(LiveError::NotADirectory(path.clone())),
            };
            node = match dir.load_child(name, self.store.as_ref()).await {
                Ok(child) => child,
                Err(LiveError::NoSuchEntry { .. }) => {
                    return Err(LiveError::NotFound(path.clone()))
                }
                Err(err) => return Err(err),
            };
        }
        Ok(node)
    }

    /// Create or overwrite a file, creating missing parent directories.
    pub async fn write_file(
        &self,
        path: &RelativePath,
        data: impl Into<Vec<u8>>,
        entry_type: EntryType,
    ) -> LiveResult<()> {
        if entry_type.is_tree() {
            return Err(LiveError::IsADirectory(path.clone()));
        }
        let entry_type = filtered_entry_type(entry_type, self.symlinks_enabled);
        let (parent, name) = self.materialize_parent(path).await?;
        match parent.get(&name) {
            Some(entry) if entry.is_directory() => Err(LiveError::IsADirectory(path.clone())),
            Some(DirEntry::Loaded(LiveNode::File(file))) => {
                file.write(entry_type, data.into());
                parent.materialize();
                Ok(())
            }
            _ => {
                let file = FileNode::materialized(entry_type, data);
                parent.insert(name, LiveNode::File(file));
                Ok(())
            }
        }
    }

    /// Create a symlink pointing at `target`.
    pub async fn symlink(&self, path: &RelativePath, target: &str) -> LiveResult<()> {
        self.write_file(path, target.as_bytes().to_vec(), EntryType::Symlink)
            .await
    }

    /// Create a directory and any missing parents. Existing directories are
    /// left untouched.
    pub async fn mkdir(&self, path: &RelativePath) -> LiveResult<Arc<DirectoryNode>> {
        let mut dir = Arc::clone(&self.root);
        let mut walked = RelativePath::root();
        for name in path.components() {
            walked = walked.join(name);
            dir = self.child_dir(&dir, name, &walked, true).await?;
        }
        Ok(dir)
    }

    /// Remove a file or a whole directory.
    pub async fn remove(&self, path: &RelativePath) -> LiveResult<()> {
        let (parent, name) = self.materialize_parent(path).await?;
        match parent.remove(&name) {
            Some(_) => Ok(()),
            None => Err(LiveError::NotFound(path.clone())),
        }
    }

    /// Materialize every ancestor of `path`, returning its parent and name.
    async fn materialize_parent(
        &self,
        path: &RelativePath,
    ) -> LiveResult<(Arc<DirectoryNode>, String)> {
        let name = path.file_name().ok_or(LiveError::RootPath)?.to_string();
        let parent_path = path.parent().unwrap_or_default();
        let parent = self.mkdir(&parent_path).await?;
        self.root.materialize();
        Ok((parent, name))
    }

    async fn child_dir(
        &self,
        dir: &Arc<DirectoryNode>,
        name: &str,
        path: &RelativePath,
        create: bool,
    ) -> LiveResult<Arc<DirectoryNode>> {
        dir.materialize();
        match dir.load_child(name, self.store.as_ref()).await {
            Ok(LiveNode::Directory(child)) => {
                child.materialize();
                Ok(child)
            }
            Ok(LiveNode::File(_)) => Err(LiveError::NotADirectory(path.clone())),
            Err(LiveError::NoSuchEntry { .. }) if create => {
                let child = DirectoryNode::new_materialized(self.symlinks_enabled);
                dir.insert(name.to_string(), LiveNode::Directory(Arc::clone(&child)));
                Ok(child)
            }
            Err(LiveError::NoSuchEntry { .. }) => Err(LiveError::NotFound(path.clone())),
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for WorkingCopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingCopy")
            .field("root_tree", &self.root.tree_id())
            .field("symlinks_enabled", &self.symlinks_enabled)
            .finish()
    }
}
