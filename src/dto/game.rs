use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{validate_avatar_id, validate_player_name},
    state::round::{Avatar, Player, Round, Task, progress},
};

/// Payload used to join the round (or re-join an existing player).
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Display name; matched case-insensitively against the roster.
    pub name: String,
    /// Catalog id of the avatar to use when the name is new.
    pub avatar_id: String,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_player_name(&self.name) {
            errors.add("name", e);
        }
        if let Err(e) = validate_avatar_id(&self.avatar_id) {
            errors.add("avatar_id", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of a catalog avatar exposed to REST/SSE clients.
pub struct AvatarSummary {
    pub id: String,
    pub name: String,
    /// Emoji glyph rendered by clients.
    pub image: String,
    pub background_color: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of one checklist entry.
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of a player exposed to REST/SSE clients.
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
    pub avatar: AvatarSummary,
    pub tasks: Vec<TaskSummary>,
    pub is_winner: bool,
    /// Checklist completion percentage, rounded to the nearest integer.
    pub progress: u8,
}

/// Full view of the shared round returned by every mutating endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundSummary {
    pub players: Vec<PlayerSummary>,
    /// Selection of this server instance, `null` when nobody is selected.
    pub current_player_id: Option<String>,
    pub is_game_active: bool,
    pub winner: Option<PlayerSummary>,
}

impl From<&Avatar> for AvatarSummary {
    fn from(avatar: &Avatar) -> Self {
        Self {
            id: avatar.id.clone(),
            name: avatar.name.clone(),
            image: avatar.glyph.clone(),
            background_color: avatar.background_color.clone(),
        }
    }
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            completed: task.completed,
        }
    }
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            avatar: (&player.avatar).into(),
            tasks: player.tasks.iter().map(Into::into).collect(),
            is_winner: player.is_winner,
            progress: progress(&player.tasks),
        }
    }
}

impl From<&Round> for RoundSummary {
    fn from(round: &Round) -> Self {
        Self {
            players: round.players.values().map(Into::into).collect(),
            current_player_id: round.current_player_id.clone(),
            is_game_active: round.is_active,
            winner: round.winner().map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fox() -> Avatar {
        Avatar {
            id: "1".into(),
            name: "Fox".into(),
            glyph: "🦊".into(),
            background_color: "#FDE1D3".into(),
        }
    }

    fn player_with_tasks(completed: usize) -> Player {
        let tasks = (1..=4)
            .map(|n| Task {
                id: format!("task{n}"),
                title: format!("Task {n}"),
                completed: n <= completed,
            })
            .collect();
        Player {
            id: "dad".into(),
            name: "DAD".into(),
            avatar: fox(),
            tasks,
            is_winner: false,
        }
    }

    #[test]
    fn player_summary_reports_rounded_progress() {
        let summary = PlayerSummary::from(&player_with_tasks(2));
        assert_eq!(summary.progress, 50);
        assert_eq!(summary.tasks.len(), 4);
        assert!(!summary.is_winner);
    }

    #[test]
    fn round_summary_carries_selection_and_winner() {
        let mut round = Round::seeded([player_with_tasks(0)]);
        round.select_player("dad");
        for id in ["task1", "task2", "task3", "task4"] {
            round.complete_task(id);
        }

        let summary = RoundSummary::from(&round);
        assert_eq!(summary.current_player_id.as_deref(), Some("dad"));
        assert!(!summary.is_game_active);
        assert_eq!(summary.winner.as_ref().map(|w| w.id.as_str()), Some("dad"));
        assert_eq!(summary.players[0].progress, 100);
    }

    #[test]
    fn join_request_validation_flags_blank_fields() {
        let valid = JoinRequest {
            name: "Grandma".into(),
            avatar_id: "5".into(),
        };
        assert!(valid.validate().is_ok());

        let blank_name = JoinRequest {
            name: "  ".into(),
            avatar_id: "5".into(),
        };
        let errors = blank_name.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let blank_avatar = JoinRequest {
            name: "Grandma".into(),
            avatar_id: "".into(),
        };
        let errors = blank_avatar.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("avatar_id"));
    }
}
