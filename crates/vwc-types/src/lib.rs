//! Value types for the virtual working copy (VWC).
//!
//! Every other VWC crate depends on `vwc-types`. The types here carry no
//! behavior beyond their invariants.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content address of a tree or blob (BLAKE3 hash)
//! - [`RelativePath`] — Normalized, slash-separated path from the diff root
//! - [`EntryType`] — Source-control entry kind (file, executable, symlink, tree)
//! - [`Dtype`] — Directory-entry type tag reported to diff consumers

pub mod entry_type;
pub mod error;
pub mod object;
pub mod path;

pub use entry_type::{filtered_entry_dtype, filtered_entry_type, Dtype, EntryType};
pub use error::TypeError;
pub use object::ObjectId;
pub use path::RelativePath;
