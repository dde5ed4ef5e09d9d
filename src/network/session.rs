//! Puzzle Session Management
//!
//! One live puzzle shared by exactly two participants. The session deals
//! the board, scores every board update against the solution, relays the
//! score to the opponent and decides the winner.

use std::time::{Duration, Instant};

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::grid::{Grid, GRID_CELLS};
use crate::network::participant::{Participant, ParticipantId};
use crate::network::protocol::ServerMessage;
use crate::puzzle::difficulty::Difficulty;
use crate::puzzle::generator::{Puzzle, PuzzleError, PuzzleSource};

/// Unique session identifier.
pub type SessionId = Uuid;

/// When a session with a decided winner ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishPolicy {
    /// End as soon as one member solves the board; the loss settles the
    /// other member.
    #[default]
    FirstSolve,
    /// Stay live until both members have solved the board.
    BothSolve,
}

/// Percent of editable cells a board has right.
///
/// `matches` counts cells equal to the solution, givens included. The
/// result is 0 for a freshly dealt board and exactly 100 for a solved one.
/// A board that erased givens never goes below 0. A board with no editable
/// cells counts as complete.
pub fn progress_percentage(matches: usize, prefilled: usize) -> f64 {
    if prefilled >= GRID_CELLS {
        return 100.0;
    }
    let editable = (GRID_CELLS - prefilled) as f64;
    let solved = matches.min(GRID_CELLS).saturating_sub(prefilled) as f64;
    solved / editable * 100.0
}

/// What one board update did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateOutcome {
    /// Sender's completion, as relayed to the opponent.
    pub percentage: f64,
    /// This update decided the winner.
    pub winner_decided: bool,
    /// The session is now terminated.
    pub terminated: bool,
}

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Sender is not one of the two members.
    #[error("participant {0} is not in this session")]
    NotAMember(ParticipantId),

    /// Session already ended.
    #[error("session already terminated")]
    Terminated,

    /// Both seats given to the same participant.
    #[error("participant {0} cannot play against itself")]
    SameParticipant(ParticipantId),

    /// Puzzle could not be produced.
    #[error("puzzle unavailable: {0}")]
    Puzzle(#[from] PuzzleError),
}

/// A two-player puzzle session.
pub struct PuzzleSession {
    /// Unique session identifier.
    pub id: SessionId,
    difficulty: Difficulty,
    members: [Participant; 2],
    initial: Grid,
    solution: Grid,
    prefilled: usize,
    policy: FinishPolicy,
    /// Per member: outcome settled (solved, or lost under `FirstSolve`).
    settled: [bool; 2],
    finished_count: u8,
    winner: Option<ParticipantId>,
    terminated: bool,
    departed: [bool; 2],
    created_at: Instant,
}

impl PuzzleSession {
    /// Create a session from a puzzle and deal the initial board to both
    /// members.
    pub fn new(
        id: SessionId,
        first: Participant,
        second: Participant,
        difficulty: Difficulty,
        puzzle: Puzzle,
        policy: FinishPolicy,
    ) -> Result<Self, SessionError> {
        if first == second {
            return Err(SessionError::SameParticipant(first.id()));
        }

        let prefilled = puzzle.prefilled_count();
        let (initial, solution) = puzzle.into_parts();

        let session = Self {
            id,
            difficulty,
            members: [first, second],
            initial,
            solution,
            prefilled,
            policy,
            settled: [false; 2],
            finished_count: 0,
            winner: None,
            terminated: false,
            departed: [false; 2],
            created_at: Instant::now(),
        };

        let deal = ServerMessage::InitialBoard {
            board: session.initial.clone(),
        };
        session.deliver(0, deal.clone());
        session.deliver(1, deal);

        Ok(session)
    }

    /// Draw a puzzle from `source` and create the session.
    pub fn start(
        first: Participant,
        second: Participant,
        difficulty: Difficulty,
        source: &mut dyn PuzzleSource,
        policy: FinishPolicy,
    ) -> Result<Self, SessionError> {
        if first == second {
            return Err(SessionError::SameParticipant(first.id()));
        }
        let puzzle = source.generate(difficulty)?;
        Self::new(Uuid::new_v4(), first, second, difficulty, puzzle, policy)
    }

    /// Score a member's working board.
    ///
    /// The score always goes to the opponent. The first member to reach
    /// 100% gets `gameOver` and the opponent `youLost`; that decision is
    /// made once per session. Each member counts toward the finished count
    /// at most once.
    pub fn update_board(
        &mut self,
        sender: ParticipantId,
        board: &Grid,
    ) -> Result<UpdateOutcome, SessionError> {
        if self.terminated {
            return Err(SessionError::Terminated);
        }
        let slot = self.slot_of(sender).ok_or(SessionError::NotAMember(sender))?;
        let other = 1 - slot;

        let matches = board.matching_cells(&self.solution);
        let percentage = progress_percentage(matches, self.prefilled);
        self.deliver(other, ServerMessage::UpdateProgressBar { percentage });

        let mut winner_decided = false;
        if matches == GRID_CELLS && !self.settled[slot] {
            self.settle(slot);

            if self.winner.is_none() {
                self.winner = Some(sender);
                winner_decided = true;
                self.deliver(slot, ServerMessage::GameOver);
                self.deliver(other, ServerMessage::YouLost);
                info!(
                    session = %self.id,
                    winner = %sender,
                    difficulty = %self.difficulty,
                    "Winner decided"
                );

                if self.policy == FinishPolicy::FirstSolve && !self.settled[other] {
                    self.settle(other);
                }
            }
        }

        if self.finished_count >= 2 && !self.terminated {
            self.terminated = true;
            info!(
                session = %self.id,
                elapsed = ?self.elapsed(),
                "Session terminated"
            );
        }

        Ok(UpdateOutcome {
            percentage,
            winner_decided,
            terminated: self.terminated,
        })
    }

    fn settle(&mut self, slot: usize) {
        self.settled[slot] = true;
        self.finished_count = (self.finished_count + 1).min(2);
    }

    /// Queue a message to the member in `slot`. Delivery failure does not
    /// affect session bookkeeping.
    fn deliver(&self, slot: usize, message: ServerMessage) {
        if let Err(e) = self.members[slot].send(message) {
            debug!(session = %self.id, "Dropped outbound message: {}", e);
        }
    }

    fn slot_of(&self, participant: ParticipantId) -> Option<usize> {
        self.members.iter().position(|m| m.id() == participant)
    }

    /// Record that a member's connection closed. Returns true if the
    /// participant is a member.
    pub fn mark_departed(&mut self, participant: ParticipantId) -> bool {
        match self.slot_of(participant) {
            Some(slot) => {
                self.departed[slot] = true;
                true
            }
            None => false,
        }
    }

    /// Both members have disconnected.
    pub fn is_abandoned(&self) -> bool {
        self.departed.iter().all(|d| *d)
    }

    /// Is `participant` one of the two members.
    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.slot_of(participant).is_some()
    }

    /// The other member.
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        self.slot_of(participant).map(|slot| self.members[1 - slot].id())
    }

    /// Both member ids.
    pub fn member_ids(&self) -> [ParticipantId; 2] {
        [self.members[0].id(), self.members[1].id()]
    }

    /// Tier this session was dealt at.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Board dealt at creation.
    pub fn initial_board(&self) -> &Grid {
        &self.initial
    }

    /// Givens on the initial board.
    pub fn prefilled_count(&self) -> usize {
        self.prefilled
    }

    /// Members whose outcome is settled, 0-2.
    pub fn finished_count(&self) -> u8 {
        self.finished_count
    }

    /// First member to solve the board.
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    /// Session has ended and should leave the registry.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Time since the board was dealt.
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }
}
