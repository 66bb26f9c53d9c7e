use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::game::{PlayerSummary, RoundSummary};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a snapshot store connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player joins the round or re-joins under a known name.
pub struct PlayerJoinedEvent {
    pub player: PlayerSummary,
    pub rejoined: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the acting player changes on some device.
pub struct PlayerSelectedEvent {
    /// `None` when the selection was cleared.
    pub player_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a task has been checked off.
pub struct TaskCompletedEvent {
    pub task_id: String,
    pub player: PlayerSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player finishes their whole checklist first.
pub struct RoundWonEvent {
    pub winner: PlayerSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the round has been reset for the next race.
pub struct RoundResetEvent {
    pub round: RoundSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when reconciliation with the snapshot store changed the round.
pub struct RosterSyncedEvent {
    pub round: RoundSummary,
    /// Ids of the players whose checklist or winner flag changed.
    pub changed_player_ids: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Audio cue clients may play alongside an event.
pub enum SoundCue {
    Click,
    TaskComplete,
    Victory,
}

#[derive(Debug, Serialize, ToSchema)]
/// Toast contents shown by clients alongside a notification.
pub struct Toast {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// User-facing notification broadcast next to a domain event.
///
/// Purely advisory: clients decide whether to show the toast or play the
/// cue, and a client that ignores notifications loses nothing but polish.
pub struct NotifyEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<Toast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<SoundCue>,
}
