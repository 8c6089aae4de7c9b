use thiserror::Error;

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under the requested key.
    #[error("no record for {0}")]
    NotFound(String),

    /// The backend itself failed (I/O, map full, transaction aborted).
    /// Retrying later may succeed.
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("record encoding: {0}")]
    Serialization(String),

    /// Decoded records contradict each other or their keys.
    #[error("stored state is inconsistent: {0}")]
    Corruption(String),
}
