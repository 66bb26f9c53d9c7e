#[cfg(feature = "couch-store")]
pub mod couchdb;
#[cfg(feature = "file-store")]
pub mod file;

use crate::dao::models::RoundSnapshotEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use tokio::sync::broadcast;

/// Abstraction over the persistence layer for the shared round snapshot.
///
/// Backends store exactly one document: the current round. Polling backends
/// return `None` from [`SnapshotStore::changes`]; backends with a push
/// channel hand out a receiver that fires a unit nudge whenever the remote
/// copy may have changed, and the sync loop re-reads on either signal.
pub trait SnapshotStore: Send + Sync {
    /// Short backend name used in logs and the health report.
    fn kind(&self) -> &'static str;
    /// Read the persisted round snapshot, if any has been written yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<RoundSnapshotEntity>>>;
    /// Overwrite the persisted round snapshot.
    fn save(&self, snapshot: RoundSnapshotEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Subscribe to remote-change nudges, when the backend can push them.
    fn changes(&self) -> Option<broadcast::Receiver<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Storage backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Local JSON file, one per host. No push channel.
    #[cfg(feature = "file-store")]
    File,
    /// Shared CouchDB document with a `_changes` push feed.
    #[cfg(feature = "couch-store")]
    Couch,
}

/// Environment variable selecting the storage backend (`file` or `couch`).
pub const STORE_BACKEND_ENV: &str = "TASK_RACE_STORE";

impl StoreBackend {
    /// Resolve the backend from `TASK_RACE_STORE`, falling back to the first
    /// compiled-in backend when the variable is unset or unknown.
    pub fn from_env() -> Self {
        match std::env::var(STORE_BACKEND_ENV) {
            Ok(value) => match Self::parse(&value) {
                Some(backend) => backend,
                None => {
                    tracing::warn!(
                        "unknown {STORE_BACKEND_ENV} value `{value}`, using {:?}",
                        Self::default_backend()
                    );
                    Self::default_backend()
                }
            },
            Err(_) => Self::default_backend(),
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            #[cfg(feature = "file-store")]
            "file" => Some(StoreBackend::File),
            #[cfg(feature = "couch-store")]
            "couch" | "couchdb" => Some(StoreBackend::Couch),
            _ => None,
        }
    }

    fn default_backend() -> Self {
        #[cfg(feature = "file-store")]
        {
            StoreBackend::File
        }
        #[cfg(not(feature = "file-store"))]
        {
            StoreBackend::Couch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "file-store")]
    #[test]
    fn parses_file_backend() {
        assert_eq!(StoreBackend::parse("file"), Some(StoreBackend::File));
        assert_eq!(StoreBackend::parse(" FILE "), Some(StoreBackend::File));
    }

    #[cfg(feature = "couch-store")]
    #[test]
    fn parses_couch_backend() {
        assert_eq!(StoreBackend::parse("couch"), Some(StoreBackend::Couch));
        assert_eq!(StoreBackend::parse("couchdb"), Some(StoreBackend::Couch));
    }

    #[test]
    fn rejects_unknown_backend() {
        assert_eq!(StoreBackend::parse("redis"), None);
    }
}
