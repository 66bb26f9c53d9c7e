use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    services::sse_events,
    state::{SharedState, events::RoundEvent, reconcile},
};

/// Default pause between two reconciliation reads.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(2);
/// Environment variable overriding the poll interval, in milliseconds.
pub const SYNC_INTERVAL_ENV: &str = "TASK_RACE_SYNC_INTERVAL_MS";

/// Resolve the poll interval from the environment, keeping the default when
/// the variable is unset or not a positive number.
pub fn interval_from_env() -> Duration {
    std::env::var(SYNC_INTERVAL_ENV)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_SYNC_INTERVAL)
}

/// Owner handle for the background reconciliation task.
///
/// Dropping the handle leaves the task running; call [`SyncHandle::shutdown`]
/// during teardown to stop the loop and wait for it to finish. A read that is
/// in flight when shutdown is requested completes and its result is merged
/// before the task exits.
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop the reconciliation loop and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            if err.is_panic() {
                warn!(error = %err, "sync task panicked during shutdown");
            }
        }
    }
}

/// Spawn the reconciliation loop polling at the given interval.
pub fn spawn(state: SharedState, period: Duration) -> SyncHandle {
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(run(state, period, stop_rx));
    SyncHandle {
        stop: stop_tx,
        task,
    }
}

/// Poll-and-merge loop.
///
/// Every tick reads the persisted snapshot and folds it into the shared
/// round. Stores with a push channel additionally nudge the loop between
/// ticks for lower latency; the poll itself is never suspended, so a missed
/// or dropped nudge only costs one interval of staleness.
async fn run(state: SharedState, period: Duration, mut stop: watch::Receiver<bool>) {
    info!(period_ms = period.as_millis() as u64, "starting round sync loop");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut nudges: Option<broadcast::Receiver<()>> = None;

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
            nudge = wait_for_nudge(&mut nudges) => {
                if let Err(RecvError::Closed) = nudge {
                    // The store owning this channel is gone; resubscribe to
                    // whatever store is installed on the next pass.
                    nudges = None;
                    continue;
                }
            }
        }

        // Subscribe before reading so a change landing mid-read still nudges.
        if nudges.is_none() {
            if let Some(store) = state.snapshot_store().await {
                nudges = store.changes();
            }
        }
        sync_once(&state).await;
    }
    info!("round sync loop stopped");
}

async fn wait_for_nudge(
    nudges: &mut Option<broadcast::Receiver<()>>,
) -> Result<(), RecvError> {
    match nudges {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Read the persisted snapshot once and fold it into the shared round.
///
/// Degraded mode, an empty store, and read failures all leave the in-memory
/// round untouched; malformed data is logged and skipped the same way, so a
/// corrupt snapshot can never displace a healthy round.
pub async fn sync_once(state: &SharedState) {
    let Some(store) = state.snapshot_store().await else {
        return;
    };

    let snapshot = match store.load().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return,
        Err(err) if err.is_malformed() => {
            warn!(error = %err, "persisted round snapshot is malformed; keeping in-memory state");
            return;
        }
        Err(err) => {
            debug!(error = %err, "snapshot read failed; retrying on the next tick");
            return;
        }
    };

    let mut round = state.round().write().await;
    let outcome = reconcile::merge_snapshot(&mut round, &snapshot);
    if outcome.is_noop() {
        return;
    }

    debug!(
        changed = outcome.changed_players.len(),
        added = outcome.added_players.len(),
        "adopted externally observed round changes"
    );
    sse_events::publish(
        state,
        &RoundEvent::RosterSynced {
            changed_player_ids: outcome.touched_players(),
        },
        &round,
    );
    if let Some(winner_id) = outcome.adopted_winner {
        sse_events::publish(state, &RoundEvent::RoundWon { winner_id }, &round);
    }
    if outcome.winner_cleared {
        sse_events::publish(state, &RoundEvent::RoundReset, &round);
    }
}
