//! Puzzle supply.
//!
//! Difficulty tiers, the solver, and the generator sessions draw their
//! boards from.

pub mod difficulty;
pub mod generator;
pub mod solver;

#[cfg(test)]
pub(crate) mod fixtures;

pub use difficulty::Difficulty;
pub use generator::{Puzzle, PuzzleError, PuzzleSource, SudokuGenerator};
pub use solver::{count_solutions, solve, SolveError};
