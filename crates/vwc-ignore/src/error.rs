/// Errors from building ignore layers.
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    /// The matcher could not be built from the collected patterns.
    #[error("failed to build ignore rules for {dir:?}: {source}")]
    Build {
        dir: String,
        #[source]
        source: ignore::Error,
    },
}

pub type IgnoreResult<T> = Result<T, IgnoreError>;
