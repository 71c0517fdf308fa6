use std::sync::{Arc, RwLock};

use vwc_store::{ContentHasher, ObjectStore, StoreResult};
use vwc_types::{Dtype, EntryType, ObjectId};

#[derive(Clone, Debug)]
enum FileContent {
    /// Unchanged since checkout: content lives in the store.
    Unmaterialized(ObjectId),
    /// Written locally.
    Materialized(Arc<[u8]>),
}

#[derive(Debug)]
struct FileState {
    entry_type: EntryType,
    content: FileContent,
}

/// A regular file, executable, or symlink in the live tree.
#[derive(Debug)]
pub struct FileNode {
    state: RwLock<FileState>,
}

impl FileNode {
    /// A file whose content is blob `blob_id` in the store.
    pub fn unmaterialized(entry_type: EntryType, blob_id: ObjectId) -> Arc<Self> {
        debug_assert!(!entry_type.is_tree());
        Arc::new(Self {
            state: RwLock::new(FileState {
                entry_type,
                content: FileContent::Unmaterialized(blob_id),
            }),
        })
    }

    /// A file with locally-held content.
    pub fn materialized(entry_type: EntryType, data: impl Into<Vec<u8>>) -> Arc<Self> {
        debug_assert!(!entry_type.is_tree());
        let data: Vec<u8> = data.into();
        Arc::new(Self {
            state: RwLock::new(FileState {
                entry_type,
                content: FileContent::Materialized(data.into()),
            }),
        })
    }

    pub fn entry_type(&self) -> EntryType {
        self.state.read().expect("lock poisoned").entry_type
    }

    pub fn dtype(&self) -> Dtype {
        self.entry_type().dtype()
    }

    pub fn is_materialized(&self) -> bool {
        matches!(
            self.state.read().expect("lock poisoned").content,
            FileContent::Materialized(_)
        )
    }

    /// Blob id while unmaterialized.
    pub fn blob_id(&self) -> Option<ObjectId> {
        match self.state.read().expect("lock poisoned").content {
            FileContent::Unmaterialized(id) => Some(id),
            FileContent::Materialized(_) => None,
        }
    }

    /// Replace the content, materializing the file.
    pub(crate) fn write(&self, entry_type: EntryType, data: Vec<u8>) {
        let mut state = self.state.write().expect("lock poisoned");
        state.entry_type = entry_type;
        state.content = FileContent::Materialized(data.into());
    }

    /// Full content, fetching the blob if unmaterialized.
    pub async fn read_all(&self, store: &dyn ObjectStore) -> StoreResult<Arc<[u8]>> {
        let content = self.state.read().expect("lock poisoned").content.clone();
        match content {
            FileContent::Materialized(data) => Ok(data),
            FileContent::Unmaterialized(id) => {
                let blob = store.get_blob(&id).await?;
                Ok(blob.data.as_slice().into())
            }
        }
    }

    /// Whether this file matches source-control blob `blob_id` of type
    /// `entry_type`.
    ///
    /// A type mismatch is a difference without looking at content. An
    /// unmaterialized file defers to the store's blob comparison; a
    /// materialized one is hashed locally and, failing a known-identical id,
    /// compared byte for byte with the fetched blob.
    pub async fn is_same_as(
        &self,
        store: &dyn ObjectStore,
        blob_id: &ObjectId,
        entry_type: EntryType,
    ) -> StoreResult<bool> {
        let (own_type, content) = {
            let state = self.state.read().expect("lock poisoned");
            (state.entry_type, state.content.clone())
        };
        if own_type != entry_type {
            return Ok(false);
        }
        match content {
            FileContent::Unmaterialized(own_id) => store.are_blobs_equal(&own_id, blob_id).await,
            FileContent::Materialized(data) => {
                let local_id = ContentHasher::BLOB.hash(&data);
                if store.are_objects_known_identical(&local_id, blob_id) {
                    return Ok(true);
                }
                let scm = store.get_blob(blob_id).await?;
                Ok(scm.data.as_slice() == &data[..])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vwc_store::InMemoryObjectStore;

    #[tokio::test]
    async fn unmaterialized_compares_through_store() {
        let store = InMemoryObjectStore::new();
        let a = store.put_blob(b"a".to_vec()).unwrap();
        let b = store.put_blob(b"b".to_vec()).unwrap();
        let file = FileNode::unmaterialized(EntryType::RegularFile, a);

        assert!(file.is_same_as(&store, &a, EntryType::RegularFile).await.unwrap());
        assert!(!file.is_same_as(&store, &b, EntryType::RegularFile).await.unwrap());
        assert_eq!(file.blob_id(), Some(a));
        assert!(!file.is_materialized());
    }

    #[tokio::test]
    async fn materialized_with_same_content_matches_without_fetch() {
        let store = InMemoryObjectStore::new();
        let id = store.put_blob(b"same".to_vec()).unwrap();
        let file = FileNode::materialized(EntryType::RegularFile, b"same".to_vec());

        assert!(file.is_same_as(&store, &id, EntryType::RegularFile).await.unwrap());
        assert_eq!(store.stats().blob_fetches(), 0);
    }

    #[tokio::test]
    async fn materialized_with_new_content_differs() {
        let store = InMemoryObjectStore::new();
        let id = store.put_blob(b"old".to_vec()).unwrap();
        let file = FileNode::materialized(EntryType::RegularFile, b"new".to_vec());

        assert!(!file.is_same_as(&store, &id, EntryType::RegularFile).await.unwrap());
        assert_eq!(store.stats().blob_fetches(), 1);
    }

    #[tokio::test]
    async fn type_change_is_a_difference() {
        let store = InMemoryObjectStore::new();
        let id = store.put_blob(b"x".to_vec()).unwrap();
        let file = FileNode::unmaterialized(EntryType::ExecutableFile, id);
        assert!(!file.is_same_as(&store, &id, EntryType::RegularFile).await.unwrap());
    }

    #[tokio::test]
    async fn write_materializes() {
        let store = InMemoryObjectStore::new();
        let id = store.put_blob(b"before".to_vec()).unwrap();
        let file = FileNode::unmaterialized(EntryType::RegularFile, id);
        assert_eq!(&file.read_all(&store).await.unwrap()[..], b"before");

        file.write(EntryType::Symlink, b"target".to_vec());
        assert!(file.is_materialized());
        assert_eq!(file.blob_id(), None);
        assert_eq!(file.dtype(), Dtype::Symlink);
        assert_eq!(&file.read_all(&store).await.unwrap()[..], b"target");
    }
}
