//! Puzzle Generation
//!
//! Sessions obtain their boards through [`PuzzleSource`], so the
//! generation strategy can be swapped (tests inject fixed boards). The
//! default [`SudokuGenerator`] deals unique-solution puzzles from a
//! seeded RNG.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::debug;

use crate::core::grid::{Grid, GRID_CELLS};
use crate::core::rng::{derive_puzzle_seed, DeterministicRng};
use crate::puzzle::difficulty::Difficulty;
use crate::puzzle::solver::{count_solutions, is_valid_solution, random_solved_grid, solve, SolveError};

/// Puzzle construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleError {
    /// Every cell is a given; progress cannot be measured.
    #[error("degenerate puzzle: all {0} cells are prefilled")]
    Degenerate(usize),

    /// Solution grid is not a complete valid board.
    #[error("solution is not a complete valid board")]
    InvalidSolution,

    /// A given disagrees with the solution.
    #[error("given at cell {0} disagrees with the solution")]
    GivenMismatch(usize),

    /// The initial board could not be solved uniquely.
    #[error("cannot derive solution: {0}")]
    Solve(#[from] SolveError),
}

/// An initial board paired with its unique solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    initial: Grid,
    solution: Grid,
}

impl Puzzle {
    /// Pair an initial board with a known solution, checking consistency.
    pub fn new(initial: Grid, solution: Grid) -> Result<Self, PuzzleError> {
        if !is_valid_solution(&solution) {
            return Err(PuzzleError::InvalidSolution);
        }
        for (index, (given, solved)) in initial.cells().iter().zip(solution.cells()).enumerate() {
            if given.is_some() && given != solved {
                return Err(PuzzleError::GivenMismatch(index));
            }
        }
        let prefilled = initial.filled_count();
        if prefilled == GRID_CELLS {
            return Err(PuzzleError::Degenerate(prefilled));
        }
        Ok(Self { initial, solution })
    }

    /// Derive the solution of an initial board with the solver.
    pub fn from_initial(initial: Grid) -> Result<Self, PuzzleError> {
        let solution = solve(&initial)?;
        Self::new(initial, solution)
    }

    /// Board dealt to both participants.
    pub fn initial(&self) -> &Grid {
        &self.initial
    }

    /// Fully solved board.
    pub fn solution(&self) -> &Grid {
        &self.solution
    }

    /// Number of givens on the initial board. Always below 81.
    pub fn prefilled_count(&self) -> usize {
        self.initial.filled_count()
    }

    /// Split into (initial, solution).
    pub fn into_parts(self) -> (Grid, Grid) {
        (self.initial, self.solution)
    }
}

/// Supplies puzzles for new sessions.
pub trait PuzzleSource: Send {
    /// Produce a puzzle for the requested tier.
    fn generate(&mut self, difficulty: Difficulty) -> Result<Puzzle, PuzzleError>;
}

/// Seeded unique-solution generator.
///
/// Fills a random complete board, then removes cells in random order,
/// keeping a removal only if the puzzle still has exactly one solution,
/// until the tier's target given count is reached.
#[derive(Debug, Clone)]
pub struct SudokuGenerator {
    base_seed: u64,
    sequence: u64,
}

impl SudokuGenerator {
    /// Generator whose output is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            base_seed: seed,
            sequence: 0,
        }
    }

    /// Generator seeded from the system clock.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self::new(nanos as u64 ^ (nanos >> 64) as u64)
    }

    /// Base seed (log it to reproduce a run).
    pub fn seed(&self) -> u64 {
        self.base_seed
    }

    fn dig(solution: &Grid, target_givens: usize, rng: &mut DeterministicRng) -> Grid {
        let mut positions: Vec<usize> = (0..GRID_CELLS).collect();
        rng.shuffle(&mut positions);

        let mut puzzle = solution.clone();
        let mut givens = GRID_CELLS;
        for index in positions {
            if givens <= target_givens {
                break;
            }
            let Some(value) = puzzle.get(index) else {
                continue;
            };
            let _ = puzzle.set(index, None);
            if count_solutions(&puzzle, 2) == 1 {
                givens -= 1;
            } else {
                let _ = puzzle.set(index, Some(value));
            }
        }
        puzzle
    }
}

impl PuzzleSource for SudokuGenerator {
    fn generate(&mut self, difficulty: Difficulty) -> Result<Puzzle, PuzzleError> {
        let seed = derive_puzzle_seed(self.base_seed, self.sequence, difficulty);
        self.sequence += 1;

        let mut rng = DeterministicRng::new(seed);
        let solution = random_solved_grid(&mut rng)?;
        let initial = Self::dig(&solution, difficulty.target_givens(), &mut rng);

        debug!(
            %difficulty,
            seed,
            givens = initial.filled_count(),
            "Generated puzzle"
        );

        Puzzle::new(initial, solution)
    }
}
