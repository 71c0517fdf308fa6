//! Content-addressed snapshot storage for the virtual working copy.
//!
//! Source-control snapshots are stored as immutable objects keyed by their
//! BLAKE3 hash (domain-separated by object kind). The change-detection engine
//! only ever reads from the store, through the asynchronous [`ObjectStore`]
//! trait, so a remote or lazily-fetching backend can sit behind it.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file contents
//! - [`Tree`] -- directory listing mapping names to object references
//!
//! # Backends
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store with fetch accounting
//!   and optional simulated latency, for tests and the CLI
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content addressing guarantees this).
//! 2. Equal ids imply equal content; [`ObjectStore::are_objects_known_identical`]
//!    never fetches.
//! 3. Fetch failures are returned to the caller, never retried here.

pub mod error;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use hasher::ContentHasher;
pub use memory::{FetchLatency, FetchStats, InMemoryObjectStore};
pub use object::{Blob, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
