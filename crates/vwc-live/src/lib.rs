//! Live working-copy tree for the virtual working copy.
//!
//! The live tree is a mutable hierarchy of [`FileNode`]s and
//! [`DirectoryNode`]s. Nodes start out as references into the object store
//! (unmaterialized) and become local mutable state (materialized) when the
//! working copy is modified. Children are loaded lazily: an entry that was
//! never looked at is just an `(EntryType, ObjectId)` pair until
//! [`DirectoryNode::load_child`] resolves it.
//!
//! # Key Types
//!
//! - [`LiveNode`] -- a file or directory node
//! - [`DirectoryNode`] / [`DirEntry`] -- a directory and one of its children
//! - [`FileNode`] -- file, executable, or symlink contents
//! - [`WorkingCopy`] -- root handle; all mutation goes through it so that
//!   materialization propagates to every ancestor

pub mod directory;
pub mod error;
pub mod file;
pub mod node;
pub mod working_copy;

pub use directory::{DirEntry, DirSnapshot, DirectoryNode};
pub use error::{LiveError, LiveResult};
pub use file::FileNode;
pub use node::LiveNode;
pub use working_copy::WorkingCopy;
