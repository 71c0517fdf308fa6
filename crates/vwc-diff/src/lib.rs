//! Change detection between a live working copy and snapshot trees.
//!
//! A diff run compares the live tree (see `vwc-live`) with one or more
//! content-addressed snapshot trees and reports every difference to a
//! [`DiffCallback`] as an added, removed, modified or ignored path.
//!
//! The work is split into [`DeferredDiffEntry`] tasks, one per path that needs
//! data not yet in memory. A scheduler runs them concurrently and tasks submit
//! children as they go, so traversal depth is independent of stack depth and
//! unrelated subtrees are fetched in parallel. Equal content ids skip whole
//! subtrees without a fetch.
//!
//! # Key Types
//!
//! - [`DiffEngine`] -- starts runs and owns the cancellation token
//! - [`DiffCallback`] / [`StatusCollector`] -- event sink and a status map built from it
//! - [`DeferredDiffEntry`] -- one pending comparison
//! - [`DiffOptions`] -- per-run settings, loadable from TOML
//! - [`DiffStats`] -- task counters returned by a completed run

pub mod callback;
pub mod context;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod options;
pub mod scheduler;
pub mod tree_diff;
pub mod workdir_diff;

#[cfg(test)]
mod testing;

pub use callback::{DiffCallback, FileStatus, ScmStatus, StatusCollector};
pub use context::DiffContext;
pub use deferred::{DeferredDiffEntry, PendingNode};
pub use engine::DiffEngine;
pub use error::{DiffError, DiffResult};
pub use options::DiffOptions;
pub use scheduler::DiffStats;
