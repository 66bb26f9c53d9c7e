pub mod events;
pub mod reconcile;
pub mod round;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::config::AppConfig;
use crate::dao::snapshot_store::SnapshotStore;
use crate::error::ServiceError;
use crate::state::round::Round;

pub use self::sse::SseHub;

/// Cheaply clonable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the shared round, the storage slot,
/// and the SSE hub.
pub struct AppState {
    config: AppConfig,
    snapshot_store: RwLock<Option<Arc<dyn SnapshotStore>>>,
    sse: SseHub,
    round: RwLock<Round>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The round starts seeded with the configured family roster, and the
    /// application starts in degraded mode until a storage backend is
    /// installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let round = Round::seeded(config.seed_players());
        Arc::new(Self {
            config,
            snapshot_store: RwLock::new(None),
            sse: SseHub::new(16),
            round: RwLock::new(round),
            degraded: degraded_tx,
        })
    }

    /// Application configuration (avatar catalog, task template, roster).
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The shared round, guarded for concurrent handler access.
    pub fn round(&self) -> &RwLock<Round> {
        &self.round
    }

    /// Obtain a handle to the current snapshot store, if one is installed.
    pub async fn snapshot_store(&self) -> Option<Arc<dyn SnapshotStore>> {
        let guard = self.snapshot_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current snapshot store or fail with the degraded error.
    pub async fn require_snapshot_store(&self) -> Result<Arc<dyn SnapshotStore>, ServiceError> {
        self.snapshot_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new snapshot store implementation and leave degraded mode.
    pub async fn install_snapshot_store(&self, store: Arc<dyn SnapshotStore>) {
        {
            let mut guard = self.snapshot_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current snapshot store and enter degraded mode.
    pub async fn clear_snapshot_store(&self) {
        {
            let mut guard = self.snapshot_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    ///
    /// The watch channel is the source of truth: the supervisor may flag a
    /// still-installed but unhealthy store as degraded while it retries.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }
}
