use serde::Serialize;
use tracing::warn;

use crate::{
    dto::sse::{
        NotifyEvent, PlayerJoinedEvent, PlayerSelectedEvent, RosterSyncedEvent, RoundResetEvent,
        RoundWonEvent, ServerEvent, SoundCue, SystemStatus, TaskCompletedEvent, Toast,
    },
    state::{SharedState, events::RoundEvent, round::Round},
};

const EVENT_PLAYER_JOINED: &str = "player.joined";
const EVENT_PLAYER_SELECTED: &str = "player.selected";
const EVENT_TASK_COMPLETED: &str = "task.completed";
const EVENT_ROUND_WON: &str = "round.won";
const EVENT_ROUND_RESET: &str = "round.reset";
const EVENT_ROSTER_SYNCED: &str = "roster.synced";
const EVENT_NOTIFY: &str = "notify";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Map a domain event onto the public SSE stream.
///
/// Every event carries its domain payload; events the game decorates with a
/// toast or a sound are followed by a `notify` event with the cue. The round
/// reference projects player and round summaries at the moment the event
/// happened, so callers publish while still holding the round guard.
pub fn publish(state: &SharedState, event: &RoundEvent, round: &Round) {
    match event {
        RoundEvent::PlayerJoined { player_id, rejoined } => {
            let Some(player) = round.player(player_id) else {
                return;
            };
            let toast = if *rejoined {
                Toast {
                    title: format!("Welcome back, {}!", player.name),
                    description: "Continue completing your tasks!".into(),
                }
            } else {
                Toast {
                    title: format!("{} joined the game!", player.name),
                    description: "Complete your tasks as fast as you can!".into(),
                }
            };
            send_event(
                state,
                EVENT_PLAYER_JOINED,
                &PlayerJoinedEvent {
                    player: player.into(),
                    rejoined: *rejoined,
                },
            );
            send_notify(state, Some(toast), Some(SoundCue::Click));
        }
        RoundEvent::PlayerSelected { player_id } => {
            send_event(
                state,
                EVENT_PLAYER_SELECTED,
                &PlayerSelectedEvent {
                    player_id: player_id.clone(),
                },
            );
        }
        RoundEvent::TaskCompleted { player_id, task_id } => {
            let Some(player) = round.player(player_id) else {
                return;
            };
            send_event(
                state,
                EVENT_TASK_COMPLETED,
                &TaskCompletedEvent {
                    task_id: task_id.clone(),
                    player: player.into(),
                },
            );
            send_notify(state, None, Some(SoundCue::TaskComplete));
        }
        RoundEvent::RoundWon { winner_id } => {
            let Some(winner) = round.player(winner_id) else {
                return;
            };
            let toast = Toast {
                title: format!("{} wins the Morning Tasks Race! 🎉", winner.name),
                description: "All tasks completed! Great job!".into(),
            };
            send_event(
                state,
                EVENT_ROUND_WON,
                &RoundWonEvent {
                    winner: winner.into(),
                },
            );
            send_notify(state, Some(toast), Some(SoundCue::Victory));
        }
        RoundEvent::RoundReset => {
            send_event(
                state,
                EVENT_ROUND_RESET,
                &RoundResetEvent {
                    round: round.into(),
                },
            );
            send_notify(
                state,
                Some(Toast {
                    title: "Game Reset! Ready, Set, Go!".into(),
                    description: "Everyone's tasks have been reset. Good luck!".into(),
                }),
                None,
            );
        }
        RoundEvent::RosterSynced { changed_player_ids } => {
            send_event(
                state,
                EVENT_ROSTER_SYNCED,
                &RosterSyncedEvent {
                    round: round.into(),
                    changed_player_ids: changed_player_ids.clone(),
                },
            );
        }
    }
}

/// Broadcast a degraded-mode flip to every subscriber.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_notify(state: &SharedState, toast: Option<Toast>, sound: Option<SoundCue>) {
    send_event(state, EVENT_NOTIFY, &NotifyEvent { toast, sound });
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
