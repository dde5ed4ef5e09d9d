//! Participant Handles
//!
//! A participant is one connected client. Identity is the id assigned when
//! the connection is accepted; two handles are the same participant iff
//! their ids are equal.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::network::protocol::ServerMessage;

static NEXT_PARTICIPANT_ID: AtomicU64 = AtomicU64::new(1);

/// Connection-scoped participant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(u64);

impl ParticipantId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_PARTICIPANT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Outbound message could not be queued.
#[derive(Debug, Clone, Error)]
#[error("participant {0} is no longer connected")]
pub struct DeliveryError(pub ParticipantId);

/// Handle to one connected client: its id plus the queue feeding its
/// socket writer.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ParticipantId,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Participant {
    /// Wrap an outbound queue with a freshly allocated id.
    pub fn new(sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self::with_id(ParticipantId::next(), sender)
    }

    /// Wrap an outbound queue with an explicit id.
    pub fn with_id(id: ParticipantId, sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { id, sender }
    }

    /// Participant identity.
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Queue a message. Never blocks; fails only once the connection's
    /// writer has gone away.
    pub fn send(&self, message: ServerMessage) -> Result<(), DeliveryError> {
        self.sender.send(message).map_err(|_| DeliveryError(self.id))
    }

    /// True while the connection's writer is still receiving.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}
