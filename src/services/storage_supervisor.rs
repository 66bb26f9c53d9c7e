use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{snapshot_store::SnapshotStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the snapshot backend and keep the shared state in degraded mode
/// while it is unavailable.
///
/// On a successful connection the store is installed and the backend is
/// health-checked periodically. A failing health check triggers a bounded
/// reconnect sequence with exponential backoff; when every attempt fails the
/// store is uninstalled and the outer loop starts over with a fresh
/// connection, so a handle wired to a dead backend never lingers in the
/// state.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn SnapshotStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_snapshot_store(store.clone()).await;
                info!(
                    backend = store.kind(),
                    "storage connection established; leaving degraded mode"
                );
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.update_degraded(false);
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(_) => {
                            let mut attempt = 0;
                            let mut reconnect_delay = INITIAL_DELAY;
                            let mut reconnected = false;

                            while attempt < MAX_RECONNECT_ATTEMPTS {
                                match store.try_reconnect().await {
                                    Ok(()) => {
                                        info!(
                                            "storage reconnection succeeded after health check failure"
                                        );
                                        reconnected = true;
                                        break;
                                    }
                                    Err(reconnect_err) => {
                                        if attempt == 0 {
                                            warn!(
                                                attempt, error = %reconnect_err,
                                                "storage reconnect first attempt failed; entering degraded mode"
                                            );
                                            state.update_degraded(true);
                                        } else {
                                            warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                                        };
                                        attempt += 1;
                                        sleep(reconnect_delay).await;
                                        reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                                    }
                                }
                            }

                            if reconnected {
                                state.update_degraded(false);
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            } else {
                                warn!(
                                    "exhausted storage reconnect attempts; dropping the store and reconnecting from scratch"
                                );
                                state.clear_snapshot_store().await;
                                break;
                            }
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use futures::future::BoxFuture;
    use tokio::sync::broadcast;
    use tokio::time::timeout;

    use crate::config::AppConfig;
    use crate::dao::models::RoundSnapshotEntity;
    use crate::dao::storage::StorageResult;
    use crate::state::AppState;

    struct HealthyStore;

    impl SnapshotStore for HealthyStore {
        fn kind(&self) -> &'static str {
            "stub"
        }

        fn load(&self) -> BoxFuture<'static, StorageResult<Option<RoundSnapshotEntity>>> {
            Box::pin(async { Ok(None) })
        }

        fn save(&self, _snapshot: RoundSnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn changes(&self) -> Option<broadcast::Receiver<()>> {
            None
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn connection_refused() -> StorageError {
        StorageError::unavailable(
            "backend unreachable".into(),
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        )
    }

    #[tokio::test]
    async fn failed_connections_keep_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());

        let task = tokio::spawn(run(state.clone(), || async {
            Err::<Arc<dyn SnapshotStore>, _>(connection_refused())
        }));
        sleep(Duration::from_millis(50)).await;

        assert!(state.is_degraded());
        assert!(state.snapshot_store().await.is_none());
        task.abort();
    }

    #[tokio::test]
    async fn a_successful_connection_installs_the_store_and_clears_degraded() {
        let state = AppState::new(AppConfig::default());
        let task = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(HealthyStore) as Arc<dyn SnapshotStore>)
        }));

        let connected = async {
            while state.is_degraded() {
                sleep(Duration::from_millis(5)).await;
            }
        };
        timeout(Duration::from_secs(2), connected).await.unwrap();

        let store = state.snapshot_store().await.unwrap();
        assert_eq!(store.kind(), "stub");
        task.abort();
    }
}
