use serde::{Deserialize, Serialize};
use vwc_types::{EntryType, ObjectId, RelativePath};

use crate::error::{StoreError, StoreResult};
use crate::hasher::ContentHasher;

/// Tag distinguishing blobs from trees in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Blob,
    Tree,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// A stored object: kind tag plus serialized data.
///
/// The store never interprets `data`; decoding happens in [`Blob`] and
/// [`Tree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Content address under the kind's hashing domain.
    pub fn compute_id(&self) -> ObjectId {
        let hasher = match self.kind {
            ObjectKind::Blob => &ContentHasher::BLOB,
            ObjectKind::Tree => &ContentHasher::TREE,
        };
        hasher.hash(&self.data)
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Raw file contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// The id this content would be stored under.
    pub fn id(&self) -> ObjectId {
        ContentHasher::BLOB.hash(&self.data)
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    pub fn from_stored_object(id: &ObjectId, obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Blob {
            return Err(StoreError::UnexpectedKind {
                id: *id,
                expected: "blob",
                actual: obj.kind.to_string(),
            });
        }
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

/// One child listing inside a snapshot tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub entry_type: EntryType,
    pub object_id: ObjectId,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, entry_type: EntryType, object_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            entry_type,
            object_id,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.entry_type.is_tree()
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Immutable directory listing from source control.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries sorted by name.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Entries are sorted by name for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    /// Decode and validate a stored tree.
    ///
    /// Entry names must be single path components and unique.
    pub fn from_stored_object(id: &ObjectId, obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Tree {
            return Err(StoreError::UnexpectedKind {
                id: *id,
                expected: "tree",
                actual: obj.kind.to_string(),
            });
        }
        let tree: Tree = serde_json::from_slice(&obj.data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let root = RelativePath::root();
        for entry in &tree.entries {
            root.try_join(&entry.name)
                .map_err(|e| StoreError::CorruptObject {
                    id: *id,
                    reason: e.to_string(),
                })?;
        }
        if tree.entries.windows(2).any(|w| w[0].name >= w[1].name) {
            return Err(StoreError::CorruptObject {
                id: *id,
                reason: "entries are not sorted and unique".to_string(),
            });
        }
        Ok(tree)
    }

    /// The id this tree would be stored under.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
