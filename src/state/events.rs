/// Domain event produced by round operations and the sync adapter.
///
/// The store itself performs no side effects; services publish these through
/// the event layer, which turns them into SSE payloads and notification
/// cues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    /// A player joined the round, or re-joined under an existing name.
    PlayerJoined {
        /// Identifier of the joined player.
        player_id: String,
        /// True when the name matched an existing roster entry.
        rejoined: bool,
    },
    /// The device-local selection moved to another player (or was cleared).
    PlayerSelected {
        /// New selection, `None` when cleared.
        player_id: Option<String>,
    },
    /// A task was checked off a player's checklist.
    TaskCompleted {
        /// Player whose checklist was updated.
        player_id: String,
        /// Task that was completed.
        task_id: String,
    },
    /// The round was won.
    RoundWon {
        /// Identifier of the winning player.
        winner_id: String,
    },
    /// The round was reset for the next race.
    RoundReset,
    /// External state observed by the sync adapter was folded into the
    /// round.
    RosterSynced {
        /// Players whose checklist or winner flag changed, plus players
        /// newly adopted from the external copy.
        changed_player_ids: Vec<String>,
    },
}
