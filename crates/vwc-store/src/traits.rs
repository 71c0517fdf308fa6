use std::sync::Arc;

use async_trait::async_trait;
use vwc_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{Blob, Tree};

/// Read side of a content-addressed snapshot store.
///
/// Implementations must satisfy:
/// - Objects are immutable; a fetched tree or blob may be cached forever.
/// - Any number of fetches may be outstanding at once.
/// - Failures are returned, never retried inside the diff engine.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch and decode a tree.
    async fn get_tree(&self, id: &ObjectId) -> StoreResult<Arc<Tree>>;

    /// Fetch a blob.
    async fn get_blob(&self, id: &ObjectId) -> StoreResult<Arc<Blob>>;

    /// Fetch several trees concurrently, preserving order.
    ///
    /// Fails with the first error if any fetch fails.
    async fn get_trees(&self, ids: &[ObjectId]) -> StoreResult<Vec<Arc<Tree>>> {
        futures::future::try_join_all(ids.iter().map(|id| self.get_tree(id))).await
    }

    /// Compare two blobs by content.
    ///
    /// Default implementation short-circuits on known-identical ids and
    /// otherwise fetches both sides. Backends that keep content hashes may
    /// override to avoid the fetch.
    async fn are_blobs_equal(&self, a: &ObjectId, b: &ObjectId) -> StoreResult<bool> {
        if self.are_objects_known_identical(a, b) {
            return Ok(true);
        }
        let (left, right) = futures::try_join!(self.get_blob(a), self.get_blob(b))?;
        Ok(left.data == right.data)
    }

    /// Cheap, synchronous identity oracle.
    ///
    /// `true` guarantees identical content. `false` only means identity
    /// could not be proven without a fetch.
    fn are_objects_known_identical(&self, a: &ObjectId, b: &ObjectId) -> bool {
        a == b
    }
}
