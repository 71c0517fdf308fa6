//! Ignore-rule oracle for the virtual working copy.
//!
//! An [`IgnoreStack`] is a chain of gitignore layers, one per directory that
//! carries a `.gitignore` file, plus a root layer holding global rules and
//! hidden names. The diff engine pushes a layer when it enters a directory and
//! simply drops its handle when done; layers are shared through `Arc`.

pub mod error;
pub mod stack;

pub use error::{IgnoreError, IgnoreResult};
pub use stack::{FileType, IgnoreConfig, IgnoreStack, IgnoreStatus};
