use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player_state::PlayerId;

/// Intent submitted by a Display. The Host is the only party that acts on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Intent {
    Hello {
        client_id: Uuid,
    },
    Ping,
    ReqSync,
    DealPick {
        card_index: usize,
        player_id: PlayerId,
    },
    CastVote {
        voter_id: PlayerId,
        target_id: Option<PlayerId>,
    },
}

impl Intent {
    /// Whether applying this intent can change game state.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Intent::DealPick { .. } | Intent::CastVote { .. })
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Hello { client_id } => write!(f, "Hello from {client_id}"),
            Intent::Ping => write!(f, "Ping"),
            Intent::ReqSync => write!(f, "Request sync"),
            Intent::DealPick {
                card_index,
                player_id,
            } => write!(f, "Deal card #{card_index} to P{}", player_id + 1),
            Intent::CastVote {
                voter_id,
                target_id: Some(target_id),
            } => write!(f, "P{} votes P{}", voter_id + 1, target_id + 1),
            Intent::CastVote { voter_id, .. } => write!(f, "P{} abstains", voter_id + 1),
        }
    }
}

/// A queued intent with the id the store assigned on append.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub id: u64,
    pub msg: Intent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_wire_shape() {
        let msg = ActionMessage {
            id: 7,
            msg: Intent::DealPick {
                card_index: 3,
                player_id: 1,
            },
        };
        let json = serde_json::to_value(msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 7, "msg": {"type": "DEAL_PICK", "cardIndex": 3, "playerId": 1}})
        );
        let back: ActionMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
