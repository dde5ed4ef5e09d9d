//! Core board primitives.
//!
//! The grid type shared by the wire protocol, the solver and the session,
//! plus the seeded RNG the puzzle generator draws from.

pub mod grid;
pub mod rng;

// Re-export core types
pub use grid::{Cell, Grid, GridError, GRID_CELLS, GRID_SIDE};
pub use rng::DeterministicRng;
