use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("malformed snapshot: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
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

    /// Construct a malformed-data error from a decoding failure.
    ///
    /// Callers treat this differently from [`StorageError::Unavailable`]: the
    /// backend is healthy, the persisted bytes are not. The in-memory round
    /// stays authoritative and the bad snapshot is ignored.
    pub fn malformed(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Malformed {
            message,
            source: Box::new(source),
        }
    }

    /// Whether this error denotes undecodable persisted data rather than an
    /// unreachable backend.
    pub fn is_malformed(&self) -> bool {
        matches!(self, StorageError::Malformed { .. })
    }
}
