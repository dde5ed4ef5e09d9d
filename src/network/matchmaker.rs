//! Matchmaking and Session Registry
//!
//! Pairs participants that ask for the same difficulty and routes board
//! updates to the session that owns the sender. The matchmaker is a plain
//! state machine: callers serialize access to it (the server keeps it
//! behind a mutex), so the queue, the registry and every session are only
//! ever mutated by one handler at a time.

use std::collections::BTreeMap;

use tracing::{debug, error, info, instrument, warn};

use crate::core::grid::Grid;
use crate::network::participant::{Participant, ParticipantId};
use crate::network::protocol::ClientMessage;
use crate::network::session::{FinishPolicy, PuzzleSession, SessionId, UpdateOutcome};
use crate::puzzle::difficulty::Difficulty;
use crate::puzzle::generator::PuzzleSource;

/// Result of a `join` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Placed in the tier's waiting slot.
    Queued,
    /// Paired with the waiting participant.
    Paired(SessionId),
    /// Already waiting at this tier; nothing changed.
    AlreadyWaiting,
    /// Already playing; request ignored.
    InSession(SessionId),
    /// Connection was never registered.
    UnknownParticipant,
    /// Puzzle for the new session could not be produced.
    Failed,
}

/// Waiting slots per difficulty plus the registry of live sessions.
pub struct Matchmaker {
    /// Registered connections.
    participants: BTreeMap<ParticipantId, Participant>,
    /// At most one waiting participant per tier.
    waiting: BTreeMap<Difficulty, ParticipantId>,
    /// Live sessions.
    sessions: BTreeMap<SessionId, PuzzleSession>,
    /// Participant to session mapping.
    session_index: BTreeMap<ParticipantId, SessionId>,
    puzzles: Box<dyn PuzzleSource>,
    policy: FinishPolicy,
}

impl Matchmaker {
    /// Create a matchmaker drawing boards from `puzzles`.
    pub fn new(puzzles: Box<dyn PuzzleSource>, policy: FinishPolicy) -> Self {
        Self {
            participants: BTreeMap::new(),
            waiting: BTreeMap::new(),
            sessions: BTreeMap::new(),
            session_index: BTreeMap::new(),
            puzzles,
            policy,
        }
    }

    /// Register a freshly connected participant.
    pub fn add_participant(&mut self, participant: Participant) {
        debug!(participant = %participant.id(), "Participant registered");
        self.participants.insert(participant.id(), participant);
    }

    /// Forget a disconnected participant: free its waiting slot and mark it
    /// gone from its session. A session both members have left is reaped.
    pub fn remove_participant(&mut self, id: ParticipantId) {
        self.participants.remove(&id);

        if let Some(difficulty) = self.waiting_difficulty_of(id) {
            self.waiting.remove(&difficulty);
            debug!(participant = %id, %difficulty, "Withdrawn from queue");
        }

        if let Some(session_id) = self.session_index.get(&id).copied() {
            let abandoned = match self.sessions.get_mut(&session_id) {
                Some(session) => {
                    session.mark_departed(id);
                    session.is_abandoned()
                }
                None => {
                    self.session_index.remove(&id);
                    false
                }
            };
            if abandoned {
                info!(session = %session_id, "Session abandoned");
                self.reap(session_id);
            }
        }
    }

    /// Route one classified client message.
    pub fn dispatch(&mut self, id: ParticipantId, message: ClientMessage) {
        match message {
            ClientMessage::Join { difficulty } => {
                self.join(id, difficulty);
            }
            ClientMessage::UpdateBoard { board } => {
                self.update_board(id, &board);
            }
        }
    }

    /// Queue `id` at `difficulty`, or pair it with whoever is waiting there.
    #[instrument(skip(self, id), fields(participant = %id))]
    pub fn join(&mut self, id: ParticipantId, difficulty: Difficulty) -> JoinOutcome {
        let Some(participant) = self.participants.get(&id).cloned() else {
            warn!("Join from unregistered participant");
            return JoinOutcome::UnknownParticipant;
        };

        if let Some(session_id) = self.session_index.get(&id).copied() {
            warn!(session = %session_id, "Join ignored, participant already playing");
            return JoinOutcome::InSession(session_id);
        }

        if let Some(current) = self.waiting_difficulty_of(id) {
            if current == difficulty {
                return JoinOutcome::AlreadyWaiting;
            }
            self.waiting.remove(&current);
            debug!(from = %current, "Moving to another queue");
        }

        let opponent = self
            .waiting
            .get(&difficulty)
            .and_then(|waiting_id| self.participants.get(waiting_id))
            .cloned();

        let Some(opponent) = opponent else {
            self.waiting.insert(difficulty, id);
            info!("Queued for opponent");
            return JoinOutcome::Queued;
        };

        let session = match PuzzleSession::start(
            opponent,
            participant,
            difficulty,
            self.puzzles.as_mut(),
            self.policy,
        ) {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to create session: {}", e);
                return JoinOutcome::Failed;
            }
        };

        self.waiting.remove(&difficulty);
        let session_id = session.id;
        for member in session.member_ids() {
            self.session_index.insert(member, session_id);
        }
        info!(
            session = %session_id,
            prefilled = session.prefilled_count(),
            "Created session"
        );
        self.sessions.insert(session_id, session);

        JoinOutcome::Paired(session_id)
    }

    /// Hand a board update to the sender's session. Updates from
    /// participants without a live session are ignored.
    pub fn update_board(&mut self, id: ParticipantId, board: &Grid) -> Option<UpdateOutcome> {
        let Some(session_id) = self.session_index.get(&id).copied() else {
            debug!(participant = %id, "Ignoring update without a live session");
            return None;
        };

        let Some(session) = self.sessions.get_mut(&session_id) else {
            self.session_index.remove(&id);
            return None;
        };

        match session.update_board(id, board) {
            Ok(outcome) => {
                if outcome.terminated {
                    self.reap(session_id);
                }
                Some(outcome)
            }
            Err(e) => {
                debug!(participant = %id, session = %session_id, "Update rejected: {}", e);
                None
            }
        }
    }

    /// Remove a session and its index entries.
    fn reap(&mut self, session_id: SessionId) {
        if let Some(session) = self.sessions.remove(&session_id) {
            for member in session.member_ids() {
                self.session_index.remove(&member);
            }
        }
    }

    fn waiting_difficulty_of(&self, id: ParticipantId) -> Option<Difficulty> {
        self.waiting
            .iter()
            .find(|(_, waiting)| **waiting == id)
            .map(|(difficulty, _)| *difficulty)
    }

    /// Who is waiting at a tier.
    pub fn waiting_for(&self, difficulty: Difficulty) -> Option<ParticipantId> {
        self.waiting.get(&difficulty).copied()
    }

    /// Number of occupied waiting slots.
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Live session a participant belongs to.
    pub fn session_of(&self, id: ParticipantId) -> Option<&PuzzleSession> {
        self.session_index
            .get(&id)
            .and_then(|session_id| self.sessions.get(session_id))
    }

    /// Number of registered connections.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
