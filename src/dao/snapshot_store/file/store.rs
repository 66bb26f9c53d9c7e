use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::fs;
use tokio::sync::broadcast;

use crate::dao::{
    models::RoundSnapshotEntity, snapshot_store::SnapshotStore, storage::StorageResult,
};

use super::{
    config::FileStoreConfig,
    error::{FileDaoError, FileResult},
};

/// Snapshot store keeping the round as a single JSON file on local disk,
/// the server-side analog of the browser's localStorage copy.
///
/// There is no push channel; consumers poll. Writes land in a sibling temp
/// file first and are renamed into place, so a crash mid-write never leaves
/// a truncated snapshot behind.
#[derive(Clone)]
pub struct FileSnapshotStore {
    path: Arc<Path>,
}

impl FileSnapshotStore {
    /// Open the store, creating the snapshot directory when missing.
    pub async fn open(config: FileStoreConfig) -> FileResult<Self> {
        let store = Self {
            path: Arc::from(config.path),
        };
        store.ensure_directory().await?;
        Ok(store)
    }

    async fn ensure_directory(&self) -> FileResult<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(parent)
            .await
            .map_err(|source| FileDaoError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
    }

    async fn read_snapshot(&self) -> FileResult<Option<RoundSnapshotEntity>> {
        let bytes = match fs::read(&*self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(FileDaoError::Read {
                    path: self.path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| FileDaoError::Decode {
                path: self.path.to_path_buf(),
                source,
            })
    }

    async fn write_snapshot(&self, snapshot: &RoundSnapshotEntity) -> FileResult<()> {
        let bytes =
            serde_json::to_vec_pretty(snapshot).map_err(|source| FileDaoError::Encode { source })?;

        self.ensure_directory().await?;
        let staging = staging_path(&self.path);
        fs::write(&staging, &bytes)
            .await
            .map_err(|source| FileDaoError::Write {
                path: staging.clone(),
                source,
            })?;
        fs::rename(&staging, &*self.path)
            .await
            .map_err(|source| FileDaoError::Replace {
                path: self.path.to_path_buf(),
                source,
            })
    }
}

/// Sibling path the snapshot is staged at before the atomic rename.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl SnapshotStore for FileSnapshotStore {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<RoundSnapshotEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.read_snapshot().await.map_err(Into::into) })
    }

    fn save(&self, snapshot: RoundSnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_snapshot(&snapshot).await.map_err(Into::into) })
    }

    fn changes(&self) -> Option<broadcast::Receiver<()>> {
        None
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_directory().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_directory().await.map_err(Into::into) })
    }
}
