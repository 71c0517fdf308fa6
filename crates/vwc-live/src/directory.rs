use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::trace;
use vwc_store::{ObjectStore, Tree};
use vwc_types::{filtered_entry_type, Dtype, EntryType, ObjectId};

use crate::error::{LiveError, LiveResult};
use crate::file::FileNode;
use crate::node::LiveNode;

/// One child of a directory: either a loaded node or a store reference.
#[derive(Clone, Debug)]
pub enum DirEntry {
    Loaded(LiveNode),
    Unloaded {
        entry_type: EntryType,
        object_id: ObjectId,
    },
}

impl DirEntry {
    pub fn entry_type(&self) -> EntryType {
        match self {
            Self::Loaded(node) => node.entry_type(),
            Self::Unloaded { entry_type, .. } => *entry_type,
        }
    }

    pub fn dtype(&self) -> Dtype {
        self.entry_type().dtype()
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type().is_tree()
    }

    pub fn loaded(&self) -> Option<&LiveNode> {
        match self {
            Self::Loaded(node) => Some(node),
            Self::Unloaded { .. } => None,
        }
    }

    /// Store id of the entry's content, when it still mirrors the store.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Loaded(node) => node.stable_id(),
            Self::Unloaded { object_id, .. } => Some(*object_id),
        }
    }

    pub fn is_materialized(&self) -> bool {
        match self {
            Self::Loaded(node) => node.is_materialized(),
            Self::Unloaded { .. } => false,
        }
    }
}

/// Point-in-time copy of a directory's listing, taken under its lock.
#[derive(Clone, Debug)]
pub struct DirSnapshot {
    /// `Some` while the directory is unmaterialized.
    pub tree_id: Option<ObjectId>,
    /// Children sorted by name.
    pub entries: Vec<(String, DirEntry)>,
}

#[derive(Debug)]
struct DirContents {
    tree_id: Option<ObjectId>,
    entries: BTreeMap<String, DirEntry>,
}

/// A directory in the live tree.
///
/// While unmaterialized, `tree_id` names the snapshot tree the directory was
/// loaded from, and its listing equals that tree's. Any change to the
/// directory or a descendant clears it.
#[derive(Debug)]
pub struct DirectoryNode {
    contents: RwLock<DirContents>,
    symlinks_enabled: bool,
}

impl DirectoryNode {
    /// An unmaterialized directory mirroring `tree`.
    ///
    /// Entry types are filtered for the platform so a checked-out symlink
    /// without symlink support looks like the plain file it was written as.
    pub fn from_tree(tree_id: ObjectId, tree: &Tree, symlinks_enabled: bool) -> Arc<Self> {
        let entries = tree
            .entries
            .iter()
            .map(|entry| {
                let child = DirEntry::Unloaded {
                    entry_type: filtered_entry_type(entry.entry_type, symlinks_enabled),
                    object_id: entry.object_id,
                };
                (entry.name.clone(), child)
            })
            .collect();
        Arc::new(Self {
            contents: RwLock::new(DirContents {
                tree_id: Some(tree_id),
                entries,
            }),
            symlinks_enabled,
        })
    }

    /// An empty, materialized directory.
    pub fn new_materialized(symlinks_enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            contents: RwLock::new(DirContents {
                tree_id: None,
                entries: BTreeMap::new(),
            }),
            symlinks_enabled,
        })
    }

    pub fn tree_id(&self) -> Option<ObjectId> {
        self.contents.read().expect("lock poisoned").tree_id
    }

    pub fn is_materialized(&self) -> bool {
        self.tree_id().is_none()
    }

    pub fn symlinks_enabled(&self) -> bool {
        self.symlinks_enabled
    }

    pub fn len(&self) -> usize {
        self.contents.read().expect("lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name: &str) -> Option<DirEntry> {
        self.contents
            .read()
            .expect("lock poisoned")
            .entries
            .get(name)
            .cloned()
    }

    pub fn snapshot(&self) -> DirSnapshot {
        let contents = self.contents.read().expect("lock poisoned");
        DirSnapshot {
            tree_id: contents.tree_id,
            entries: contents
                .entries
                .iter()
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect(),
        }
    }

    /// Resolve child `name`, fetching its tree from the store if needed.
    ///
    /// The loaded node replaces the reference so later lookups are free. If
    /// another caller loaded the same child concurrently, its node wins.
    pub async fn load_child(&self, name: &str, store: &dyn ObjectStore) -> LiveResult<LiveNode> {
        let (entry_type, object_id) = match self.get(name) {
            None => {
                return Err(LiveError::NoSuchEntry {
                    name: name.to_string(),
                })
            }
            Some(DirEntry::Loaded(node)) => return Ok(node),
            Some(DirEntry::Unloaded {
                entry_type,
                object_id,
            }) => (entry_type, object_id),
        };

        let node = if entry_type.is_tree() {
            let tree = store.get_tree(&object_id).await?;
            LiveNode::Directory(DirectoryNode::from_tree(
                object_id,
                &tree,
                self.symlinks_enabled,
            ))
        } else {
            LiveNode::File(FileNode::unmaterialized(entry_type, object_id))
        };
        trace!(name, id = %object_id.short_hex(), "loaded child");

        let mut contents = self.contents.write().expect("lock poisoned");
        match contents.entries.get_mut(name) {
            Some(DirEntry::Loaded(existing)) => Ok(existing.clone()),
            Some(slot @ DirEntry::Unloaded { .. }) => {
                if slot.object_id() == Some(object_id) && slot.entry_type() == entry_type {
                    *slot = DirEntry::Loaded(node.clone());
                }
                Ok(node)
            }
            None => Ok(node),
        }
    }

    /// Detach from the snapshot tree this directory was loaded from.
    pub(crate) fn materialize(&self) {
        self.contents.write().expect("lock poisoned").tree_id = None;
    }

    pub(crate) fn insert(&self, name: String, node: LiveNode) {
        let mut contents = self.contents.write().expect("lock poisoned");
        contents.tree_id = None;
        contents.entries.insert(name, DirEntry::Loaded(node));
    }

    pub(crate) fn remove(&self, name: &str) -> Option<DirEntry> {
        let mut contents = self.contents.write().expect("lock poisoned");
        let removed = contents.entries.remove(name);
        if removed.is_some() {
            contents.tree_id = None;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vwc_store::{InMemoryObjectStore, TreeEntry};

    fn checkout_fixture(store: &InMemoryObjectStore) -> (ObjectId, Tree) {
        let file = store.put_blob(b"content".to_vec()).unwrap();
        let link = store.put_blob(b"target".to_vec()).unwrap();
        let sub_id = store
            .put_tree(&Tree::new(vec![TreeEntry::new(
                "inner.txt",
                EntryType::RegularFile,
                file,
            )]))
            .unwrap();
        let tree = Tree::new(vec![
            TreeEntry::new("file.txt", EntryType::RegularFile, file),
            TreeEntry::new("link", EntryType::Symlink, link),
            TreeEntry::new("sub", EntryType::Tree, sub_id),
        ]);
        (store.put_tree(&tree).unwrap(), tree)
    }

    #[tokio::test]
    async fn children_start_unloaded() {
        let store = InMemoryObjectStore::new();
        let (id, tree) = checkout_fixture(&store);
        let dir = DirectoryNode::from_tree(id, &tree, true);

        assert_eq!(dir.tree_id(), Some(id));
        let snapshot = dir.snapshot();
        assert_eq!(snapshot.entries.len(), 3);
        assert!(snapshot.entries.iter().all(|(_, e)| e.loaded().is_none()));
        assert_eq!(store.stats().tree_fetches(), 0);
    }

    #[tokio::test]
    async fn load_child_fetches_once() {
        let store = InMemoryObjectStore::new();
        let (id, tree) = checkout_fixture(&store);
        let dir = DirectoryNode::from_tree(id, &tree, true);

        let sub = dir.load_child("sub", &store).await.unwrap();
        let sub = sub.as_directory().expect("sub is a directory");
        assert!(!sub.is_materialized());
        assert_eq!(sub.len(), 1);

        dir.load_child("sub", &store).await.unwrap();
        assert_eq!(store.stats().tree_fetches(), 1);
        assert!(dir.get("sub").unwrap().loaded().is_some());
    }

    #[tokio::test]
    async fn missing_child_is_an_error() {
        let store = InMemoryObjectStore::new();
        let dir = DirectoryNode::new_materialized(true);
        assert!(matches!(
            dir.load_child("nope", &store).await,
            Err(LiveError::NoSuchEntry { .. })
        ));
    }

    #[tokio::test]
    async fn symlinks_filtered_when_unsupported() {
        let store = InMemoryObjectStore::new();
        let (id, tree) = checkout_fixture(&store);
        let dir = DirectoryNode::from_tree(id, &tree, false);
        assert_eq!(dir.get("link").unwrap().dtype(), Dtype::Regular);

        let dir = DirectoryNode::from_tree(id, &tree, true);
        assert_eq!(dir.get("link").unwrap().dtype(), Dtype::Symlink);
    }

    #[test]
    fn mutation_materializes() {
        let store = InMemoryObjectStore::new();
        let (id, tree) = checkout_fixture(&store);
        let dir = DirectoryNode::from_tree(id, &tree, true);

        assert!(dir.remove("missing").is_none());
        assert!(!dir.is_materialized(), "no-op removal keeps the tree id");

        dir.insert(
            "new.txt".to_string(),
            LiveNode::File(FileNode::materialized(EntryType::RegularFile, b"x".to_vec())),
        );
        assert!(dir.is_materialized());
        assert!(dir.get("new.txt").unwrap().is_materialized());
    }
}
