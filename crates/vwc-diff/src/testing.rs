//! Fixtures shared by the unit tests of this crate.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vwc_store::{Blob, InMemoryObjectStore, ObjectStore, StoreResult, Tree, TreeEntry};
use vwc_types::{Dtype, EntryType, ObjectId, RelativePath};

use crate::callback::DiffCallback;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Event {
    Added,
    Removed,
    Modified,
    Ignored,
}

/// Records every event, tolerating concurrent calls.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<(Event, String, Dtype)>>,
}

impl Recorder {
    /// Events in call order.
    pub fn events(&self) -> Vec<(Event, String, Dtype)> {
        self.events.lock().expect("lock poisoned").clone()
    }

    /// Events as a set, independent of scheduling order.
    pub fn event_set(&self) -> BTreeSet<(Event, String, Dtype)> {
        self.events().into_iter().collect()
    }

    pub fn has(&self, event: Event, path: &str, dtype: Dtype) -> bool {
        self.events()
            .iter()
            .any(|(e, p, d)| *e == event && p == path && *d == dtype)
    }

    fn push(&self, event: Event, path: &RelativePath, dtype: Dtype) {
        self.events
            .lock()
            .expect("lock poisoned")
            .push((event, path.to_string(), dtype));
    }
}

impl DiffCallback for Recorder {
    fn added_path(&self, path: &RelativePath, dtype: Dtype) {
        self.push(Event::Added, path, dtype);
    }

    fn removed_path(&self, path: &RelativePath, dtype: Dtype) {
        self.push(Event::Removed, path, dtype);
    }

    fn modified_path(&self, path: &RelativePath, dtype: Dtype) {
        self.push(Event::Modified, path, dtype);
    }

    fn ignored_path(&self, path: &RelativePath, dtype: Dtype) {
        self.push(Event::Ignored, path, dtype);
    }
}

/// A chain `depth` directories deep; each level holds `f<level>.txt` whose
/// content is tagged with `tag`, and all but the last hold a subdirectory `d`.
pub fn nested_tree(store: &InMemoryObjectStore, depth: usize, tag: &str) -> ObjectId {
    let mut child: Option<ObjectId> = None;
    for level in (0..=depth).rev() {
        let blob = store
            .put_blob(format!("{tag}-{level}").into_bytes())
            .expect("put blob");
        let mut entries = vec![TreeEntry::new(format!("f{level}.txt"), EntryType::RegularFile, blob)];
        if let Some(id) = child {
            entries.push(TreeEntry::new("d", EntryType::Tree, id));
        }
        child = Some(store.put_tree(&Tree::new(entries)).expect("put tree"));
    }
    child.expect("at least one level")
}

/// Build and store a tree from `(name, entry)` pairs.
pub fn tree(store: &InMemoryObjectStore, entries: Vec<(&str, EntryType, ObjectId)>) -> ObjectId {
    let entries = entries
        .into_iter()
        .map(|(name, ty, id)| TreeEntry::new(name, ty, id))
        .collect();
    store.put_tree(&Tree::new(entries)).expect("put tree")
}

pub fn blob(store: &InMemoryObjectStore, content: &str) -> ObjectId {
    store.put_blob(content.as_bytes().to_vec()).expect("put blob")
}

pub fn path(s: &str) -> RelativePath {
    RelativePath::new(s).expect("valid path")
}

/// Delays every fetch by a fixed amount.
pub struct SlowStore {
    inner: Arc<InMemoryObjectStore>,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: Arc<InMemoryObjectStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl ObjectStore for SlowStore {
    async fn get_tree(&self, id: &ObjectId) -> StoreResult<Arc<Tree>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_tree(id).await
    }

    async fn get_blob(&self, id: &ObjectId) -> StoreResult<Arc<Blob>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_blob(id).await
    }
}
