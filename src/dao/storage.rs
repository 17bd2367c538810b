use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by local storage backends regardless of where they keep their data.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend cannot be reached or written.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The write would exceed the store quota.
    #[error("storage quota exceeded writing `{key}` ({needed} bytes, limit {limit})")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Quota in bytes.
        limit: usize,
    },
    /// The value could not be serialized.
    #[error("failed to encode value for `{key}`")]
    Encode {
        /// Key being written.
        key: String,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },
    /// The stored value is not valid JSON for the requested type.
    #[error("failed to decode value stored under `{key}`")]
    Decode {
        /// Key being read.
        key: String,
        /// Deserializer error.
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
