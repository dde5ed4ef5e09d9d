//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON object whose `type` field names the variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::grid::Grid;
use crate::puzzle::difficulty::Difficulty;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Queue for an opponent at the given tier.
    Join {
        /// Requested tier.
        difficulty: Difficulty,
    },

    /// Sender's current working board.
    UpdateBoard {
        /// All 81 cells.
        board: Grid,
    },
}

impl ClientMessage {
    /// `type` values this server understands.
    pub const KNOWN_TYPES: [&'static str; 2] = ["join", "updateBoard"];

    /// Parse an inbound frame, separating unknown message types (which are
    /// ignored) from malformed ones.
    pub fn classify(text: &str) -> Result<Inbound, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();

        if !Self::KNOWN_TYPES.contains(&kind.as_str()) {
            return Ok(Inbound::Unknown(kind));
        }

        serde_json::from_value(value)
            .map(Inbound::Message)
            .map_err(|source| ProtocolError::Malformed { kind, source })
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Result of classifying an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A message this server handles.
    Message(ClientMessage),
    /// A well-formed object with an unrecognized `type`.
    Unknown(String),
}

/// Inbound parse failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON object without a string `type` field.
    #[error("missing \"type\" field")]
    MissingType,

    /// Known `type` with fields that do not fit it.
    #[error("malformed {kind} message: {source}")]
    Malformed {
        /// The `type` value.
        kind: String,
        /// Underlying decode error.
        source: serde_json::Error,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Opponent found; the board both participants solve.
    InitialBoard {
        /// Initial grid with givens.
        board: Grid,
    },

    /// The opponent's completion, 0-100.
    UpdateProgressBar {
        /// Percent of editable cells the opponent has right.
        percentage: f64,
    },

    /// You solved the board first.
    GameOver,

    /// Your opponent solved the board first.
    YouLost,

    /// Your last message was rejected.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::GRID_CELLS;

    fn board_json(len: usize) -> String {
        let mut cells = vec![Value::Null; len];
        if let Some(first) = cells.first_mut() {
            *first = Value::from(7);
        }
        serde_json::to_string(&cells).unwrap()
    }

    #[test]
    fn test_join_parses() {
        let inbound = ClientMessage::classify(r#"{"type":"join","difficulty":"hard"}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::Message(ClientMessage::Join {
                difficulty: Difficulty::Hard
            })
        );
    }

    #[test]
    fn test_update_board_parses() {
        let text = format!(r#"{{"type":"updateBoard","board":{}}}"#, board_json(GRID_CELLS));
        match ClientMessage::classify(&text).unwrap() {
            Inbound::Message(ClientMessage::UpdateBoard { board }) => {
                assert_eq!(board.get(0), Some(7));
                assert_eq!(board.filled_count(), 1);
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let inbound = ClientMessage::classify(r#"{"type":"chat","text":"hi"}"#).unwrap();
        assert_eq!(inbound, Inbound::Unknown("chat".to_string()));
    }

    #[test]
    fn test_short_board_is_malformed() {
        let text = format!(r#"{{"type":"updateBoard","board":{}}}"#, board_json(80));
        assert!(matches!(
            ClientMessage::classify(&text),
            Err(ProtocolError::Malformed { kind, .. }) if kind == "updateBoard"
        ));
    }

    #[test]
    fn test_unknown_difficulty_is_malformed() {
        assert!(matches!(
            ClientMessage::classify(r#"{"type":"join","difficulty":"insane"}"#),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn test_garbage_and_missing_type() {
        assert!(matches!(
            ClientMessage::classify("not json"),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            ClientMessage::classify(r#"{"difficulty":"easy"}"#),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn test_server_message_wire_shape() {
        assert_eq!(ServerMessage::GameOver.to_json().unwrap(), r#"{"type":"gameOver"}"#);
        assert_eq!(ServerMessage::YouLost.to_json().unwrap(), r#"{"type":"youLost"}"#);

        let progress = ServerMessage::UpdateProgressBar { percentage: 12.5 };
        assert_eq!(
            progress.to_json().unwrap(),
            r#"{"type":"updateProgressBar","percentage":12.5}"#
        );

        let initial = ServerMessage::InitialBoard { board: Grid::empty() };
        let json = initial.to_json().unwrap();
        assert!(json.starts_with(r#"{"type":"initialBoard","board":[null,"#));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), initial);
    }

    #[test]
    fn test_client_message_to_json() {
        let msg = ClientMessage::Join {
            difficulty: Difficulty::Master,
        };
        assert_eq!(msg.to_json().unwrap(), r#"{"type":"join","difficulty":"master"}"#);
    }
}
