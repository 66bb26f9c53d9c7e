use crate::dao::models::{RoundSnapshotEntity, TaskEntity};
use crate::state::round::{Player, Round, Task};

/// Record of what a snapshot merge changed, used by the sync adapter to
/// decide which events to publish. An all-empty outcome means the external
/// copy agreed with local state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Roster entries whose checklist or winner flag was replaced by the
    /// external copy.
    pub changed_players: Vec<String>,
    /// Players present externally but unknown locally, appended to the
    /// roster.
    pub added_players: Vec<String>,
    /// Winner adopted from the external copy, if one was newly observed.
    pub adopted_winner: Option<String>,
    /// True when the external copy no longer names a winner the local round
    /// still had (an external reset).
    pub winner_cleared: bool,
    /// True when the round's active flag was flipped to match the external
    /// copy.
    pub activity_changed: bool,
}

impl SyncOutcome {
    /// Whether the merge left the round untouched.
    pub fn is_noop(&self) -> bool {
        self.changed_players.is_empty()
            && self.added_players.is_empty()
            && self.adopted_winner.is_none()
            && !self.winner_cleared
            && !self.activity_changed
    }

    /// Ids to report in a roster-synced event: changed plus added players.
    pub fn touched_players(&self) -> Vec<String> {
        self.changed_players
            .iter()
            .chain(self.added_players.iter())
            .cloned()
            .collect()
    }
}

/// Fold an externally observed snapshot into the local round.
///
/// Last observed state wins, field by field: a player whose persisted task
/// list or winner flag differs from the local copy takes the external
/// values; players that agree are left untouched, preserving their
/// allocations. Externally known players missing locally are appended to
/// the roster, local-only players are kept, and the device-local selection
/// is never modified. Merging the same snapshot twice is a no-op the second
/// time.
pub fn merge_snapshot(round: &mut Round, snapshot: &RoundSnapshotEntity) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();

    for (id, player) in round.players.iter_mut() {
        let Some(remote) = snapshot.player(id) else {
            continue;
        };
        let tasks_differ = checklists_differ(&player.tasks, &remote.tasks);
        let flag_differs = player.is_winner != remote.is_winner;
        if tasks_differ {
            player.tasks = remote.tasks.iter().cloned().map(Into::into).collect();
        }
        if flag_differs {
            player.is_winner = remote.is_winner;
        }
        if tasks_differ || flag_differs {
            outcome.changed_players.push(id.clone());
        }
    }

    for remote in &snapshot.players {
        if !round.players.contains_key(&remote.id) {
            outcome.added_players.push(remote.id.clone());
            round
                .players
                .insert(remote.id.clone(), Player::from(remote.clone()));
        }
    }

    if round.is_active != snapshot.is_game_active {
        round.is_active = snapshot.is_game_active;
        outcome.activity_changed = true;
    }

    let remote_winner = snapshot.winner.as_ref().map(|winner| winner.id.clone());
    if round.winner_id != remote_winner {
        // A winner the snapshot names but does not list as a player is an
        // inconsistent reference; leave the local winner alone in that case.
        let resolvable = match remote_winner.as_deref() {
            Some(id) => round.players.contains_key(id),
            None => true,
        };
        if resolvable {
            if let Some(previous) = round.winner_id.take() {
                // The per-player pass already applied the observed flag for
                // players the snapshot knows; only a local-only ex-winner
                // needs its flag cleared here.
                if snapshot.player(&previous).is_none() {
                    if let Some(player) = round.players.get_mut(&previous) {
                        player.is_winner = false;
                    }
                }
            }
            match remote_winner {
                Some(winner_id) => {
                    if let Some(winner) = round.players.get_mut(&winner_id) {
                        winner.is_winner = true;
                    }
                    round.winner_id = Some(winner_id.clone());
                    round.is_active = false;
                    outcome.adopted_winner = Some(winner_id);
                }
                None => {
                    outcome.winner_cleared = true;
                }
            }
        }
    }

    outcome
}

/// Element-wise comparison of a local checklist against its persisted form.
fn checklists_differ(local: &[Task], remote: &[TaskEntity]) -> bool {
    local.len() != remote.len()
        || local.iter().zip(remote).any(|(task, entity)| {
            task.id != entity.id || task.title != entity.title || task.completed != entity.completed
        })
}
