//! # Sudoku Duel Server
//!
//! Real-time head-to-head Sudoku: two players who ask for the same
//! difficulty are dealt the same puzzle, each sees the other's progress as
//! they fill in cells, and the first to solve the board wins.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SUDOKU DUEL SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Board primitives                        │
//! │  ├── grid.rs       - 81-cell grid and its JSON form          │
//! │  └── rng.rs        - Seeded Xorshift128+ PRNG                │
//! │                                                              │
//! │  puzzle/           - Puzzle supply                           │
//! │  ├── difficulty.rs - Difficulty tiers                        │
//! │  ├── solver.rs     - Backtracking solver                     │
//! │  └── generator.rs  - Unique-solution puzzle generator        │
//! │                                                              │
//! │  network/          - Networking and session lifecycle        │
//! │  ├── server.rs     - WebSocket server                        │
//! │  ├── protocol.rs   - Message types                           │
//! │  ├── participant.rs- Connection handles                      │
//! │  ├── matchmaker.rs - Waiting queue and session registry      │
//! │  └── session.rs    - Progress scoring and win detection      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Message Flow
//!
//! A participant's inbound message is classified as `join` or
//! `updateBoard`. Joins go to the matchmaker, which either parks the
//! participant in the tier's single waiting slot or pairs it with the
//! participant already there. Board updates go to the session that owns
//! the sender, which scores the board and tells the opponent.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod network;
pub mod puzzle;

// Re-export commonly used types
pub use crate::core::grid::{Cell, Grid, GRID_CELLS};
pub use network::{ClientMessage, GameServer, Matchmaker, ServerConfig, ServerMessage};
pub use puzzle::{Difficulty, Puzzle, PuzzleSource, SudokuGenerator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
