use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;
use vwc_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, ObjectKind, StoredObject, Tree};
use crate::traits::ObjectStore;

/// Simulated per-fetch latency.
///
/// Each object id gets a stable delay in `[0, max)` derived from `seed`, so
/// different seeds reorder fetch completion without changing results.
#[derive(Clone, Copy, Debug)]
pub struct FetchLatency {
    pub max: Duration,
    pub seed: u64,
}

impl FetchLatency {
    fn delay_for(&self, id: &ObjectId) -> Duration {
        let max_micros = self.max.as_micros() as u64;
        if max_micros == 0 {
            return Duration::ZERO;
        }
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&id.as_bytes()[..8]);
        let mixed = u64::from_le_bytes(prefix) ^ self.seed.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Duration::from_micros(mixed % max_micros)
    }
}

/// Fetch counters, readable while a diff is running.
#[derive(Debug, Default)]
pub struct FetchStats {
    trees: AtomicU64,
    blobs: AtomicU64,
}

impl FetchStats {
    pub fn tree_fetches(&self) -> u64 {
        self.trees.load(Ordering::Relaxed)
    }

    pub fn blob_fetches(&self) -> u64 {
        self.blobs.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.trees.store(0, Ordering::Relaxed);
        self.blobs.store(0, Ordering::Relaxed);
    }
}

/// In-memory, HashMap-based object store.
///
/// Objects are held behind a `RwLock` and cloned on write. Every
/// `get_tree` / `get_blob` call is counted, including failed ones.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    stats: FetchStats,
    latency: Option<FetchLatency>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            stats: FetchStats::default(),
            latency: None,
        }
    }

    /// Delay every fetch by a per-object amount.
    pub fn with_latency(mut self, latency: FetchLatency) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Write an object and return its id. Idempotent.
    pub fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    pub fn put_blob(&self, data: impl Into<Vec<u8>>) -> StoreResult<ObjectId> {
        self.write(&Blob::new(data).to_stored_object())
    }

    pub fn put_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(id)
    }

    /// Remove an object. Used to simulate data that is unavailable.
    pub fn remove(&self, id: &ObjectId) -> bool {
        self.objects
            .write()
            .expect("lock poisoned")
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    async fn fetch(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        if let Some(latency) = self.latency {
            let delay = latency.delay_for(id);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        let map = self.objects.read().expect("lock poisoned");
        map.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_tree(&self, id: &ObjectId) -> StoreResult<Arc<Tree>> {
        self.stats.trees.fetch_add(1, Ordering::Relaxed);
        trace!(id = %id.short_hex(), "fetch tree");
        let stored = self.fetch(id).await?;
        Ok(Arc::new(Tree::from_stored_object(id, &stored)?))
    }

    async fn get_blob(&self, id: &ObjectId) -> StoreResult<Arc<Blob>> {
        self.stats.blobs.fetch_add(1, Ordering::Relaxed);
        trace!(id = %id.short_hex(), "fetch blob");
        let stored = self.fetch(id).await?;
        Ok(Arc::new(Blob::from_stored_object(id, &stored)?))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("tree_fetches", &self.stats.tree_fetches())
            .field("blob_fetches", &self.stats.blob_fetches())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::TreeEntry;
    use vwc_types::EntryType;

    fn sample_tree(store: &InMemoryObjectStore) -> (ObjectId, ObjectId) {
        let blob = store.put_blob(b"hello".to_vec()).unwrap();
        let tree = Tree::new(vec![TreeEntry::new("hello.txt", EntryType::RegularFile, blob)]);
        (store.put_tree(&tree).unwrap(), blob)
    }

    #[tokio::test]
    async fn write_and_fetch_tree() {
        let store = InMemoryObjectStore::new();
        let (tree_id, blob_id) = sample_tree(&store);

        let tree = store.get_tree(&tree_id).await.unwrap();
        assert_eq!(tree.get("hello.txt").unwrap().object_id, blob_id);
        assert_eq!(store.stats().tree_fetches(), 1);
        assert_eq!(store.stats().blob_fetches(), 0);
    }

    #[tokio::test]
    async fn kind_mismatch_is_an_error() {
        let store = InMemoryObjectStore::new();
        let (_, blob_id) = sample_tree(&store);
        let err = store.get_tree(&blob_id).await.unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedKind { .. }));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_bytes(b"nowhere");
        assert!(matches!(
            store.get_blob(&id).await,
            Err(StoreError::NotFound(missing)) if missing == id
        ));
        assert_eq!(store.stats().blob_fetches(), 1);
    }

    #[tokio::test]
    async fn write_is_idempotent() {
        let store = InMemoryObjectStore::new();
        let a = store.put_blob(b"same".to_vec()).unwrap();
        let b = store.put_blob(b"same".to_vec()).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert!(store.remove(&a));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn blob_equality() {
        let store = InMemoryObjectStore::new();
        let a = store.put_blob(b"one".to_vec()).unwrap();
        let b = store.put_blob(b"two".to_vec()).unwrap();

        assert!(store.are_blobs_equal(&a, &a).await.unwrap());
        assert_eq!(store.stats().blob_fetches(), 0, "identical ids never fetch");

        assert!(!store.are_blobs_equal(&a, &b).await.unwrap());
        assert_eq!(store.stats().blob_fetches(), 2);
    }

    #[tokio::test]
    async fn get_trees_preserves_order_and_fails_fast() {
        let store = InMemoryObjectStore::new();
        let (first, blob) = sample_tree(&store);
        let second = store.put_tree(&Tree::empty()).unwrap();

        let trees = store.get_trees(&[second, first]).await.unwrap();
        assert!(trees[0].is_empty());
        assert_eq!(trees[1].get("hello.txt").unwrap().object_id, blob);

        let missing = ObjectId::from_bytes(b"missing");
        assert!(store.get_trees(&[first, missing]).await.is_err());
    }

    #[tokio::test]
    async fn delayed_fetches_still_resolve() {
        let store = InMemoryObjectStore::new().with_latency(FetchLatency {
            max: Duration::from_millis(5),
            seed: 7,
        });
        let (tree_id, _) = sample_tree(&store);
        let tree = store.get_tree(&tree_id).await.unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn latency_is_stable_per_seed() {
        let latency = FetchLatency {
            max: Duration::from_millis(10),
            seed: 3,
        };
        let id = ObjectId::from_bytes(b"x");
        assert_eq!(latency.delay_for(&id), latency.delay_for(&id));
        assert!(latency.delay_for(&id) < Duration::from_millis(10));
    }
}
