use serde::{Deserialize, Serialize};

/// Avatar description carried inside persisted player records.
///
/// Field names follow the camelCase snapshot shape shared with the web
/// clients, which read and write the same JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvatarEntity {
    /// Catalog identifier of the avatar.
    pub id: String,
    /// Display name (e.g. "Fox").
    pub name: String,
    /// Emoji glyph rendered by clients.
    pub image: String,
    /// Pastel background color as a hex string (e.g. "#FDE1D3").
    pub background_color: String,
}

/// Task entry inside a persisted player record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntity {
    /// Stable identifier of the task within the round.
    pub id: String,
    /// Human readable task title.
    pub title: String,
    /// Whether the task has been checked off.
    pub completed: bool,
}

/// Representation of a player stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: String,
    /// Display name chosen for the player.
    pub name: String,
    /// Avatar picked by the player.
    pub avatar: AvatarEntity,
    /// The player's personal task checklist.
    pub tasks: Vec<TaskEntity>,
    /// Whether this player won the current round.
    pub is_winner: bool,
}

/// Aggregate round snapshot persisted by the storage layer.
///
/// This is the whole shared state of one morning race, written verbatim on
/// every mutation and read back by the sync adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshotEntity {
    /// Participating players and their checklists, in roster order.
    pub players: Vec<PlayerEntity>,
    /// Whether the round is still accepting task completions.
    pub is_game_active: bool,
    /// Full record of the winning player, if the round has been won.
    pub winner: Option<PlayerEntity>,
}

impl RoundSnapshotEntity {
    /// Look up a persisted player by id.
    pub fn player(&self, id: &str) -> Option<&PlayerEntity> {
        self.players.iter().find(|player| player.id == id)
    }
}
