use serde::{Deserialize, Serialize};

use crate::dao::models::RoundSnapshotEntity;

/// Identifier of the single document holding the current round.
pub const ROUND_DOC_ID: &str = "round::current";

/// CouchDB envelope around the persisted round snapshot.
///
/// The snapshot fields are flattened into the document body, so the stored
/// JSON is the shared camelCase shape plus CouchDB's `_id`/`_rev` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRoundDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub round: RoundSnapshotEntity,
}

impl CouchRoundDocument {
    /// Wrap a snapshot for writing. The revision is attached later, once the
    /// currently stored one is known.
    pub fn from_entity(round: RoundSnapshotEntity) -> Self {
        Self {
            id: ROUND_DOC_ID.to_string(),
            rev: None,
            round,
        }
    }

    /// Unwrap the snapshot, dropping the CouchDB envelope.
    pub fn into_entity(self) -> RoundSnapshotEntity {
        self.round
    }
}

/// Subset of a `_changes` feed response the store cares about.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    /// Documents updated since the requested sequence.
    pub results: Vec<ChangeRow>,
    /// Sequence token to resume the feed from.
    pub last_seq: String,
}

/// One row of the `_changes` feed.
#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    /// Identifier of the changed document.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_flattens_the_snapshot_next_to_couch_fields() {
        let doc = CouchRoundDocument::from_entity(RoundSnapshotEntity {
            players: Vec::new(),
            is_game_active: true,
            winner: None,
        });
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["_id"], ROUND_DOC_ID);
        assert!(value.get("_rev").is_none());
        assert_eq!(value["isGameActive"], true);
        assert!(value.get("players").is_some());
    }

    #[test]
    fn document_round_trips_with_a_revision() {
        let mut doc = CouchRoundDocument::from_entity(RoundSnapshotEntity {
            players: Vec::new(),
            is_game_active: false,
            winner: None,
        });
        doc.rev = Some("3-abc".into());

        let encoded = serde_json::to_string(&doc).unwrap();
        let decoded: CouchRoundDocument = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.rev.as_deref(), Some("3-abc"));
        assert!(!decoded.round.is_game_active);
    }

    #[test]
    fn changes_feed_rows_decode() {
        let payload = r#"{
            "results": [
                { "seq": "2-g1AAAA", "id": "round::current", "changes": [{ "rev": "2-def" }] }
            ],
            "last_seq": "2-g1AAAA",
            "pending": 0
        }"#;

        let changes: ChangesResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(changes.last_seq, "2-g1AAAA");
        assert_eq!(changes.results[0].id, ROUND_DOC_ID);
    }
}
