use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::models::{AvatarEntity, PlayerEntity, RoundSnapshotEntity, TaskEntity};

/// Avatar picked by a player, taken from the configured catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    /// Catalog identifier of the avatar.
    pub id: String,
    /// Display name (e.g. "Fox").
    pub name: String,
    /// Emoji glyph rendered by clients.
    pub glyph: String,
    /// Pastel background color as a hex string.
    pub background_color: String,
}

/// One checklist item owned by a single player.
///
/// Every player gets their own copy of the configured task template, so
/// checking a task off never leaks into another player's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Stable identifier of the task within the round.
    pub id: String,
    /// Human readable task title.
    pub title: String,
    /// Whether the task has been checked off.
    pub completed: bool,
}

/// Player info tracked during a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identifier, also the key in the roster map.
    pub id: String,
    /// Display name chosen by the player.
    pub name: String,
    /// Avatar picked by the player.
    pub avatar: Avatar,
    /// The player's personal task checklist.
    pub tasks: Vec<Task>,
    /// Whether this player won the current round.
    pub is_winner: bool,
}

/// Outcome of an [`Round::add_player`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Identifier of the joined (or re-joined) player, now selected.
    pub player_id: String,
    /// True when an existing player was matched by name instead of creating
    /// a new one.
    pub rejoined: bool,
}

/// Outcome of a [`Round::complete_task`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The task was flagged complete on the selected player's checklist.
    Completed {
        /// Player whose checklist was updated.
        player_id: String,
        /// Identifier of the winning player when this completion ended the
        /// round, `None` otherwise.
        newly_won: Option<String>,
    },
    /// No player is currently selected; nothing was changed.
    NoCurrentPlayer,
    /// The selected player's checklist has no task with the given id;
    /// nothing was changed.
    UnknownTask,
}

/// Aggregated state for the shared morning race.
///
/// Invariants upheld by the operations below: the roster key always equals
/// the contained player's id, at most one player carries the winner flag,
/// `winner_id` always references a roster entry, and `current_player_id` is
/// either `None` or a valid roster key.
#[derive(Debug, Clone)]
pub struct Round {
    /// Participating players keyed by id, in join order.
    pub players: IndexMap<String, Player>,
    /// Player whose checklist receives task completions, local to this
    /// process and never persisted.
    pub current_player_id: Option<String>,
    /// Whether the round is still accepting a winner.
    pub is_active: bool,
    /// Identifier of the winning player, if the round has been won.
    pub winner_id: Option<String>,
}

impl Round {
    /// Build an empty, inactive round. The first player to join activates it.
    pub fn new() -> Self {
        Self {
            players: IndexMap::new(),
            current_player_id: None,
            is_active: false,
            winner_id: None,
        }
    }

    /// Build a round pre-populated with a configured roster.
    ///
    /// A seeded round starts active so the family can begin checking tasks
    /// without an explicit join step.
    pub fn seeded(players: impl IntoIterator<Item = Player>) -> Self {
        let players: IndexMap<String, Player> = players
            .into_iter()
            .map(|player| (player.id.clone(), player))
            .collect();
        let is_active = !players.is_empty();
        Self {
            players,
            current_player_id: None,
            is_active,
            winner_id: None,
        }
    }

    /// Look up a player by id.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// The currently selected player, if any.
    pub fn current_player(&self) -> Option<&Player> {
        self.current_player_id
            .as_deref()
            .and_then(|id| self.players.get(id))
    }

    /// The winning player, if the round has been won.
    pub fn winner(&self) -> Option<&Player> {
        self.winner_id.as_deref().and_then(|id| self.players.get(id))
    }

    /// Join the round under the given name, or re-join an existing player.
    ///
    /// Names are matched case-insensitively: joining as "dad" when "Dad" is
    /// already on the roster selects the existing player and leaves their
    /// avatar and checklist untouched. A genuinely new name appends a player
    /// with a fresh id and the provided checklist. Either way the resolved
    /// player becomes the current selection. Adding the first player to an
    /// empty roster activates the round.
    pub fn add_player(&mut self, name: &str, avatar: Avatar, tasks: Vec<Task>) -> JoinOutcome {
        let lowered = name.to_lowercase();
        if let Some(existing) = self
            .players
            .values()
            .find(|player| player.name.to_lowercase() == lowered)
        {
            let player_id = existing.id.clone();
            self.current_player_id = Some(player_id.clone());
            return JoinOutcome {
                player_id,
                rejoined: true,
            };
        }

        if self.players.is_empty() {
            self.is_active = true;
        }

        let player_id = Uuid::new_v4().to_string();
        let player = Player {
            id: player_id.clone(),
            name: name.to_string(),
            avatar,
            tasks,
            is_winner: false,
        };
        self.players.insert(player_id.clone(), player);
        self.current_player_id = Some(player_id.clone());
        JoinOutcome {
            player_id,
            rejoined: false,
        }
    }

    /// Select the player whose checklist subsequent completions apply to.
    ///
    /// An unknown id clears the selection instead of failing, so a stale
    /// client can never leave the round pointing at a player that does not
    /// exist.
    pub fn select_player(&mut self, id: &str) -> Option<&Player> {
        if self.players.contains_key(id) {
            self.current_player_id = Some(id.to_string());
            self.players.get(id)
        } else {
            self.current_player_id = None;
            None
        }
    }

    /// Check a task off the currently selected player's checklist.
    ///
    /// Completing an already-completed task re-assigns the flag and reports
    /// success, so repeated taps are harmless. Winner detection runs only
    /// while the round is active and unwon; the first fully-completed,
    /// non-empty checklist in roster order wins and deactivates the round.
    pub fn complete_task(&mut self, task_id: &str) -> CompleteOutcome {
        let Some(player_id) = self.current_player_id.clone() else {
            return CompleteOutcome::NoCurrentPlayer;
        };
        let Some(player) = self.players.get_mut(&player_id) else {
            return CompleteOutcome::NoCurrentPlayer;
        };
        let Some(task) = player.tasks.iter_mut().find(|task| task.id == task_id) else {
            return CompleteOutcome::UnknownTask;
        };
        task.completed = true;

        let mut newly_won = None;
        if self.is_active && self.winner_id.is_none() {
            if let Some(winner_id) = self.check_winner().map(|winner| winner.id.clone()) {
                if let Some(winner) = self.players.get_mut(&winner_id) {
                    winner.is_winner = true;
                }
                self.winner_id = Some(winner_id.clone());
                self.is_active = false;
                newly_won = Some(winner_id);
            }
        }

        CompleteOutcome::Completed {
            player_id,
            newly_won,
        }
    }

    /// First player in roster order whose checklist is non-empty and fully
    /// completed. An empty roster or a roster where everyone still has open
    /// tasks yields `None`.
    pub fn check_winner(&self) -> Option<&Player> {
        self.players
            .values()
            .find(|player| !player.tasks.is_empty() && player.tasks.iter().all(|task| task.completed))
    }

    /// Start the next race: clear every completion flag and winner mark,
    /// drop the selection, and reactivate the round. The roster itself is
    /// kept.
    pub fn reset(&mut self) {
        for player in self.players.values_mut() {
            for task in &mut player.tasks {
                task.completed = false;
            }
            player.is_winner = false;
        }
        self.winner_id = None;
        self.current_player_id = None;
        self.is_active = true;
    }

    /// Export the round as the persisted snapshot shape.
    ///
    /// The selection is deliberately absent: which player a device is acting
    /// for is local to that device.
    pub fn to_snapshot(&self) -> RoundSnapshotEntity {
        RoundSnapshotEntity {
            players: self.players.values().cloned().map(Into::into).collect(),
            is_game_active: self.is_active,
            winner: self.winner().cloned().map(Into::into),
        }
    }
}

/// Completion percentage of a checklist, rounded to the nearest integer.
/// An empty checklist reads as zero progress.
pub fn progress(tasks: &[Task]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = tasks.iter().filter(|task| task.completed).count();
    ((completed as f64 / tasks.len() as f64) * 100.0).round() as u8
}

impl From<AvatarEntity> for Avatar {
    fn from(value: AvatarEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            glyph: value.image,
            background_color: value.background_color,
        }
    }
}

impl From<Avatar> for AvatarEntity {
    fn from(value: Avatar) -> Self {
        Self {
            id: value.id,
            name: value.name,
            image: value.glyph,
            background_color: value.background_color,
        }
    }
}

impl From<TaskEntity> for Task {
    fn from(value: TaskEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            completed: value.completed,
        }
    }
}

impl From<Task> for TaskEntity {
    fn from(value: Task) -> Self {
        Self {
            id: value.id,
            title: value.title,
            completed: value.completed,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            avatar: value.avatar.into(),
            tasks: value.tasks.into_iter().map(Into::into).collect(),
            is_winner: value.is_winner,
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(value: Player) -> Self {
        Self {
            id: value.id,
            name: value.name,
            avatar: value.avatar.into(),
            tasks: value.tasks.into_iter().map(Into::into).collect(),
            is_winner: value.is_winner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar(id: &str, name: &str) -> Avatar {
        Avatar {
            id: id.into(),
            name: name.into(),
            glyph: "🦊".into(),
            background_color: "#FDE1D3".into(),
        }
    }

    fn checklist() -> Vec<Task> {
        ["task1", "task2", "task3", "task4"]
            .iter()
            .map(|id| Task {
                id: (*id).into(),
                title: format!("Task {id}"),
                completed: false,
            })
            .collect()
    }

    fn member(id: &str, name: &str) -> Player {
        Player {
            id: id.into(),
            name: name.into(),
            avatar: avatar("1", "Fox"),
            tasks: checklist(),
            is_winner: false,
        }
    }

    fn family_round() -> Round {
        Round::seeded([
            member("dad", "DAD"),
            member("mom", "MOM"),
            member("adar", "ADAR"),
            member("danni", "DANNI"),
        ])
    }

    fn complete_all(round: &mut Round, player_id: &str) {
        round.select_player(player_id);
        for task_id in ["task1", "task2", "task3", "task4"] {
            round.complete_task(task_id);
        }
    }

    #[test]
    fn seeded_round_is_active_with_independent_checklists() {
        let mut round = family_round();
        assert!(round.is_active);
        assert_eq!(round.players.len(), 4);

        round.select_player("dad");
        round.complete_task("task1");

        let dad = round.player("dad").unwrap();
        let mom = round.player("mom").unwrap();
        assert!(dad.tasks[0].completed);
        assert!(!mom.tasks[0].completed);
    }

    #[test]
    fn first_player_activates_an_empty_round() {
        let mut round = Round::new();
        assert!(!round.is_active);

        let outcome = round.add_player("Dad", avatar("1", "Fox"), checklist());
        assert!(!outcome.rejoined);
        assert!(round.is_active);
        assert_eq!(round.current_player_id.as_deref(), Some(outcome.player_id.as_str()));
    }

    #[test]
    fn join_matches_existing_names_case_insensitively() {
        let mut round = Round::new();
        let first = round.add_player("Dad", avatar("1", "Fox"), checklist());
        round.current_player_id = None;

        let second = round.add_player("dad", avatar("2", "Panda"), checklist());
        assert!(second.rejoined);
        assert_eq!(second.player_id, first.player_id);
        assert_eq!(round.players.len(), 1);
        // Rejoining keeps the original avatar and re-selects the player.
        let player = round.player(&first.player_id).unwrap();
        assert_eq!(player.avatar.name, "Fox");
        assert_eq!(round.current_player_id, Some(first.player_id));
    }

    #[test]
    fn selecting_an_unknown_player_clears_the_selection() {
        let mut round = family_round();
        assert!(round.select_player("mom").is_some());
        assert_eq!(round.current_player_id.as_deref(), Some("mom"));

        assert!(round.select_player("grandma").is_none());
        assert!(round.current_player_id.is_none());
    }

    #[test]
    fn completing_without_a_selection_changes_nothing() {
        let mut round = family_round();
        let outcome = round.complete_task("task1");
        assert_eq!(outcome, CompleteOutcome::NoCurrentPlayer);
        assert!(round.players.values().all(|player| {
            player.tasks.iter().all(|task| !task.completed)
        }));
    }

    #[test]
    fn completing_an_unknown_task_changes_nothing() {
        let mut round = family_round();
        round.select_player("dad");
        let outcome = round.complete_task("task99");
        assert_eq!(outcome, CompleteOutcome::UnknownTask);
        let dad = round.player("dad").unwrap();
        assert!(dad.tasks.iter().all(|task| !task.completed));
    }

    #[test]
    fn completing_a_task_twice_is_harmless() {
        let mut round = family_round();
        round.select_player("dad");
        let first = round.complete_task("task1");
        let again = round.complete_task("task1");

        assert!(matches!(first, CompleteOutcome::Completed { .. }));
        assert!(matches!(again, CompleteOutcome::Completed { .. }));
        let dad = round.player("dad").unwrap();
        assert!(dad.tasks[0].completed);
        assert_eq!(dad.tasks.iter().filter(|task| task.completed).count(), 1);
    }

    #[test]
    fn finishing_every_task_wins_the_round() {
        let mut round = family_round();
        round.select_player("dad");
        round.complete_task("task1");
        round.complete_task("task2");

        round.select_player("mom");
        round.complete_task("task1");
        round.complete_task("task2");
        round.complete_task("task3");
        let outcome = round.complete_task("task4");

        match outcome {
            CompleteOutcome::Completed { newly_won, .. } => {
                assert_eq!(newly_won.as_deref(), Some("mom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!round.is_active);
        assert_eq!(round.winner_id.as_deref(), Some("mom"));
        assert!(round.player("mom").unwrap().is_winner);
        assert!(!round.player("dad").unwrap().is_winner);
    }

    #[test]
    fn a_won_round_never_crowns_a_second_winner() {
        let mut round = family_round();
        complete_all(&mut round, "mom");
        assert_eq!(round.winner_id.as_deref(), Some("mom"));

        complete_all(&mut round, "dad");
        let dad = round.player("dad").unwrap();
        assert!(dad.tasks.iter().all(|task| task.completed));
        assert!(!dad.is_winner);
        assert_eq!(round.winner_id.as_deref(), Some("mom"));
    }

    #[test]
    fn winner_check_ignores_empty_checklists() {
        let mut round = Round::new();
        assert!(round.check_winner().is_none());

        round.add_player("Ghost", avatar("1", "Fox"), Vec::new());
        assert!(round.check_winner().is_none());
        let outcome = round.complete_task("task1");
        assert_eq!(outcome, CompleteOutcome::UnknownTask);
        assert!(round.winner_id.is_none());
    }

    #[test]
    fn winner_check_prefers_roster_order() {
        let mut round = family_round();
        for player in round.players.values_mut() {
            for task in &mut player.tasks {
                task.completed = true;
            }
        }
        assert_eq!(round.check_winner().unwrap().id, "dad");
    }

    #[test]
    fn reset_clears_flags_and_reactivates() {
        let mut round = family_round();
        complete_all(&mut round, "mom");
        assert!(!round.is_active);

        round.reset();
        assert!(round.is_active);
        assert!(round.winner_id.is_none());
        assert!(round.current_player_id.is_none());
        assert!(round.check_winner().is_none());
        assert!(round.players.values().all(|player| {
            !player.is_winner && player.tasks.iter().all(|task| !task.completed)
        }));
    }

    #[test]
    fn progress_rounds_to_nearest_percent() {
        assert_eq!(progress(&[]), 0);

        let mut tasks = checklist();
        assert_eq!(progress(&tasks), 0);
        tasks[0].completed = true;
        tasks[1].completed = true;
        assert_eq!(progress(&tasks), 50);

        let mut three = checklist();
        three.truncate(3);
        three[0].completed = true;
        assert_eq!(progress(&three), 33);
        three[1].completed = true;
        assert_eq!(progress(&three), 67);
        three[2].completed = true;
        assert_eq!(progress(&three), 100);
    }

    #[test]
    fn snapshot_carries_roster_activity_and_winner() {
        let mut round = family_round();
        complete_all(&mut round, "mom");

        let snapshot = round.to_snapshot();
        assert_eq!(snapshot.players.len(), 4);
        assert!(!snapshot.is_game_active);
        let winner = snapshot.winner.as_ref().unwrap();
        assert_eq!(winner.id, "mom");
        assert!(winner.is_winner);
        // The device-local selection never reaches the snapshot.
        assert!(snapshot.player("mom").unwrap().tasks.iter().all(|task| task.completed));
    }
}
