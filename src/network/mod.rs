//! Network Layer
//!
//! WebSocket server, wire protocol, and the matchmaking and session logic
//! that keeps two connected participants in sync.

pub mod matchmaker;
pub mod participant;
pub mod protocol;
pub mod server;
pub mod session;

pub use matchmaker::{JoinOutcome, Matchmaker};
pub use participant::{DeliveryError, Participant, ParticipantId};
pub use protocol::{ClientMessage, Inbound, ProtocolError, ServerMessage};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{FinishPolicy, PuzzleSession, SessionError, SessionId, UpdateOutcome};
