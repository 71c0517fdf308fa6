//! Error types for the diff crate.

use std::path::PathBuf;

use vwc_types::RelativePath;

/// Errors that can fail a diff run.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A snapshot object could not be fetched or decoded.
    #[error("store error: {0}")]
    Store(#[from] vwc_store::StoreError),

    /// Resolving a live node failed.
    #[error("live tree error: {0}")]
    Live(#[from] vwc_live::LiveError),

    #[error("ignore rules: {0}")]
    Ignore(#[from] vwc_ignore::IgnoreError),

    /// A "compare against snapshot entries" task was built with no entries.
    #[error("no snapshot entries to compare {0} against")]
    NoScmEntries(RelativePath),

    /// An internal invariant did not hold.
    #[error("diff invariant violated: {0}")]
    Bug(String),

    #[error("diff cancelled")]
    Cancelled,

    #[error("diff task panicked: {0}")]
    TaskPanicked(String),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
