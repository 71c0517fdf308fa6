use vwc_types::ObjectId;

/// Failures reading or writing snapshot objects.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no object {0} in store")]
    NotFound(ObjectId),

    /// The object exists but has a different kind than requested.
    #[error("object {id} is a {actual}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: &'static str,
        actual: String,
    },

    #[error("encoding: {0}")]
    Serialization(String),

    /// Decoded, but the contents break a tree invariant.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    #[error("object hashes to the null id")]
    NullObjectId,
}

pub type StoreResult<T> = Result<T, StoreError>;
