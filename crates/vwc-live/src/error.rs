use vwc_store::StoreError;
use vwc_types::{RelativePath, TypeError};

/// Errors from live tree operations.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// Loading a node required a store fetch that failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("no entry named {name:?}")]
    NoSuchEntry { name: String },

    #[error("path not found: {0}")]
    NotFound(RelativePath),

    #[error("not a directory: {0}")]
    NotADirectory(RelativePath),

    #[error("is a directory: {0}")]
    IsADirectory(RelativePath),

    #[error("cannot modify the root itself")]
    RootPath,

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type LiveResult<T> = Result<T, LiveError>;
