use tracing::warn;

use crate::{
    dao::models::RoundSnapshotEntity,
    dto::game::{AvatarSummary, JoinRequest, RoundSummary},
    error::ServiceError,
    services::sse_events,
    state::{SharedState, events::RoundEvent, round::CompleteOutcome},
};

/// Project the shared round for REST clients.
pub async fn get_round(state: &SharedState) -> RoundSummary {
    let round = state.round().read().await;
    RoundSummary::from(&*round)
}

/// The avatar catalog a joining player picks from.
pub fn list_avatars(state: &SharedState) -> Vec<AvatarSummary> {
    state.config().avatars().iter().map(Into::into).collect()
}

/// Join the round under a display name, re-joining when the name already
/// matches a roster entry case-insensitively.
///
/// The resolved player becomes the current selection either way. Only a
/// genuinely new player changes the persisted snapshot, so re-joins skip
/// the storage write.
pub async fn join_round(
    state: &SharedState,
    request: JoinRequest,
) -> Result<RoundSummary, ServiceError> {
    let avatar = state
        .config()
        .avatar(&request.avatar_id)
        .cloned()
        .ok_or_else(|| {
            ServiceError::NotFound(format!("avatar `{}` not found", request.avatar_id))
        })?;

    let (summary, snapshot, rejoined) = {
        let mut round = state.round().write().await;
        let outcome = round.add_player(&request.name, avatar, state.config().fresh_tasks());
        sse_events::publish(
            state,
            &RoundEvent::PlayerJoined {
                player_id: outcome.player_id.clone(),
                rejoined: outcome.rejoined,
            },
            &round,
        );
        sse_events::publish(
            state,
            &RoundEvent::PlayerSelected {
                player_id: Some(outcome.player_id),
            },
            &round,
        );
        (
            RoundSummary::from(&*round),
            round.to_snapshot(),
            outcome.rejoined,
        )
    };

    if !rejoined {
        persist_round(state, snapshot).await;
    }
    Ok(summary)
}

/// Point subsequent task completions at the given roster member.
///
/// The domain operation clears the selection when the id is unknown; the
/// service still reports a not-found so stale clients learn the id is gone.
pub async fn select_player(
    state: &SharedState,
    player_id: &str,
) -> Result<RoundSummary, ServiceError> {
    let (found, summary) = {
        let mut round = state.round().write().await;
        let found = round.select_player(player_id).is_some();
        sse_events::publish(
            state,
            &RoundEvent::PlayerSelected {
                player_id: round.current_player_id.clone(),
            },
            &round,
        );
        (found, RoundSummary::from(&*round))
    };

    if !found {
        return Err(ServiceError::NotFound(format!(
            "player `{player_id}` not found"
        )));
    }
    Ok(summary)
}

/// Check a task off the selected player's list, detecting a win.
pub async fn complete_task(
    state: &SharedState,
    task_id: &str,
) -> Result<RoundSummary, ServiceError> {
    let (summary, snapshot) = {
        let mut round = state.round().write().await;
        match round.complete_task(task_id) {
            CompleteOutcome::NoCurrentPlayer => {
                return Err(ServiceError::InvalidState(
                    "no player is currently selected".into(),
                ));
            }
            CompleteOutcome::UnknownTask => {
                return Err(ServiceError::NotFound(format!("task `{task_id}` not found")));
            }
            CompleteOutcome::Completed {
                player_id,
                newly_won,
            } => {
                sse_events::publish(
                    state,
                    &RoundEvent::TaskCompleted {
                        player_id,
                        task_id: task_id.to_string(),
                    },
                    &round,
                );
                if let Some(winner_id) = newly_won {
                    sse_events::publish(state, &RoundEvent::RoundWon { winner_id }, &round);
                }
            }
        }
        (RoundSummary::from(&*round), round.to_snapshot())
    };

    persist_round(state, snapshot).await;
    Ok(summary)
}

/// Clear every checklist and start the next race.
pub async fn reset_round(state: &SharedState) -> RoundSummary {
    let (summary, snapshot) = {
        let mut round = state.round().write().await;
        round.reset();
        sse_events::publish(state, &RoundEvent::RoundReset, &round);
        (RoundSummary::from(&*round), round.to_snapshot())
    };

    persist_round(state, snapshot).await;
    summary
}

/// Write the round snapshot behind an in-memory change.
///
/// Storage failures are logged and otherwise ignored: the in-memory round
/// stays authoritative and the next action or reconciliation pass writes
/// again.
async fn persist_round(state: &SharedState, snapshot: RoundSnapshotEntity) {
    let Some(store) = state.snapshot_store().await else {
        return;
    };
    if let Err(err) = store.save(snapshot).await {
        warn!(error = %err, "failed to persist round snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::config::AppConfig;
    use crate::dao::snapshot_store::SnapshotStore;
    use crate::dao::snapshot_store::file::{FileSnapshotStore, FileStoreConfig};
    use crate::state::AppState;

    fn join(name: &str, avatar_id: &str) -> JoinRequest {
        JoinRequest {
            name: name.into(),
            avatar_id: avatar_id.into(),
        }
    }

    async fn complete_all(state: &SharedState, player_id: &str) -> RoundSummary {
        select_player(state, player_id).await.unwrap();
        let mut last = None;
        for task_id in ["task1", "task2", "task3", "task4"] {
            last = Some(complete_task(state, task_id).await.unwrap());
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn round_starts_with_the_configured_family() {
        let state = AppState::new(AppConfig::default());
        let summary = get_round(&state).await;

        assert!(summary.is_game_active);
        assert_eq!(summary.players.len(), 4);
        assert!(summary.current_player_id.is_none());
        assert!(summary.winner.is_none());
        assert_eq!(list_avatars(&state).len(), 6);
    }

    #[tokio::test]
    async fn joining_appends_a_player_and_selects_it() {
        let state = AppState::new(AppConfig::default());
        let summary = join_round(&state, join("Grandma", "5")).await.unwrap();

        assert_eq!(summary.players.len(), 5);
        let grandma = summary.players.last().unwrap();
        assert_eq!(grandma.name, "Grandma");
        assert_eq!(grandma.avatar.name, "Bear");
        assert_eq!(summary.current_player_id.as_deref(), Some(grandma.id.as_str()));
    }

    #[tokio::test]
    async fn joining_a_known_name_reuses_the_player() {
        let state = AppState::new(AppConfig::default());
        let summary = join_round(&state, join("dad", "6")).await.unwrap();

        assert_eq!(summary.players.len(), 4);
        assert_eq!(summary.current_player_id.as_deref(), Some("dad"));
        // The original avatar survives a re-join with a different pick.
        let dad = summary.players.iter().find(|p| p.id == "dad").unwrap();
        assert_eq!(dad.avatar.name, "Fox");
    }

    #[tokio::test]
    async fn joining_with_an_unknown_avatar_fails() {
        let state = AppState::new(AppConfig::default());
        let err = join_round(&state, join("Grandma", "404")).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(get_round(&state).await.players.len(), 4);
    }

    #[tokio::test]
    async fn selecting_an_unknown_player_reports_not_found_and_clears() {
        let state = AppState::new(AppConfig::default());
        select_player(&state, "mom").await.unwrap();

        let err = select_player(&state, "grandpa").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(get_round(&state).await.current_player_id.is_none());
    }

    #[tokio::test]
    async fn completing_without_a_selection_conflicts() {
        let state = AppState::new(AppConfig::default());
        let err = complete_task(&state, "task1").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn completing_an_unknown_task_reports_not_found() {
        let state = AppState::new(AppConfig::default());
        select_player(&state, "mom").await.unwrap();
        let err = complete_task(&state, "task99").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn finishing_a_checklist_wins_and_reset_restarts() {
        let state = AppState::new(AppConfig::default());
        let summary = complete_all(&state, "mom").await;

        assert!(!summary.is_game_active);
        assert_eq!(summary.winner.as_ref().map(|w| w.id.as_str()), Some("mom"));

        let summary = reset_round(&state).await;
        assert!(summary.is_game_active);
        assert!(summary.winner.is_none());
        assert!(summary.current_player_id.is_none());
        assert!(summary.players.iter().all(|p| p.progress == 0 && !p.is_winner));
    }

    #[tokio::test]
    async fn operations_keep_working_without_a_store() {
        // Degraded mode: no snapshot store is ever installed.
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());

        join_round(&state, join("Grandma", "5")).await.unwrap();
        let summary = complete_all(&state, "mom").await;
        assert_eq!(summary.winner.as_ref().map(|w| w.id.as_str()), Some("mom"));
    }

    #[tokio::test]
    async fn actions_persist_the_snapshot_when_a_store_is_installed() {
        let dir = std::env::temp_dir().join(format!("task-race-service-{}", Uuid::new_v4()));
        let store = FileSnapshotStore::open(FileStoreConfig::new(dir.join("round.json")))
            .await
            .unwrap();

        let state = AppState::new(AppConfig::default());
        state.install_snapshot_store(Arc::new(store.clone())).await;
        assert!(!state.is_degraded());

        select_player(&state, "dad").await.unwrap();
        complete_task(&state, "task1").await.unwrap();

        let stored = store.load().await.unwrap().unwrap();
        let dad = stored.player("dad").unwrap();
        assert!(dad.tasks[0].completed);
        assert!(stored.is_game_active);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn mutations_broadcast_domain_and_notify_events() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.sse().subscribe();

        join_round(&state, join("Grandma", "5")).await.unwrap();

        let joined = receiver.try_recv().unwrap();
        assert_eq!(joined.event.as_deref(), Some("player.joined"));
        assert!(joined.data.contains("Grandma"));
        let notify = receiver.try_recv().unwrap();
        assert_eq!(notify.event.as_deref(), Some("notify"));
        assert!(notify.data.contains("joined the game"));
        let selected = receiver.try_recv().unwrap();
        assert_eq!(selected.event.as_deref(), Some("player.selected"));
    }
}
