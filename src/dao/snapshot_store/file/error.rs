//! Error types for the file-backed snapshot store.

use std::path::PathBuf;

use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`FileDaoError`] failures.
pub type FileResult<T> = Result<T, FileDaoError>;

/// Failures that can occur while reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum FileDaoError {
    /// The snapshot directory could not be created.
    #[error("failed to create snapshot directory `{path}`")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file could not be read.
    #[error("failed to read snapshot file `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file could not be written.
    #[error("failed to write snapshot file `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Swapping the freshly written snapshot into place failed.
    #[error("failed to replace snapshot file `{path}`")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file exists but does not hold a valid snapshot document.
    #[error("failed to decode snapshot file `{path}`")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The in-memory snapshot could not be serialized.
    #[error("failed to encode snapshot")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

impl From<FileDaoError> for StorageError {
    fn from(err: FileDaoError) -> Self {
        match err {
            decode @ FileDaoError::Decode { .. } => {
                StorageError::malformed(decode.to_string(), decode)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
