//! Fixed boards and a canned puzzle source for tests.

use std::collections::VecDeque;

use crate::core::grid::Grid;
use crate::puzzle::difficulty::Difficulty;
use crate::puzzle::generator::{Puzzle, PuzzleError, PuzzleSource};

/// Unique-solution puzzle with 30 givens.
pub const PUZZLE_30: &str =
    "530070000600195000098000060800060003400803001700020006060000280000419005000080079";

/// Its solution.
pub const SOLUTION: &str =
    "534678912672195348198342567859761423426853791713924856961537284287419635345286179";

pub fn solution() -> Grid {
    Grid::parse(SOLUTION).unwrap()
}

/// `PUZZLE_30` with its first ten empty cells filled from the solution,
/// giving exactly 40 givens.
pub fn easy_puzzle() -> Puzzle {
    let solution = solution();
    let mut initial = Grid::parse(PUZZLE_30).unwrap();
    let empties: Vec<usize> = (0..81).filter(|&i| initial.get(i).is_none()).take(10).collect();
    for index in empties {
        initial.set(index, solution.get(index)).unwrap();
    }
    Puzzle::new(initial, solution).unwrap()
}

/// Indices that are empty on the initial board.
pub fn editable_cells(puzzle: &Puzzle) -> Vec<usize> {
    (0..81).filter(|&i| puzzle.initial().get(i).is_none()).collect()
}

/// The solution with the first `wrong` editable cells cleared.
pub fn board_missing(puzzle: &Puzzle, wrong: usize) -> Grid {
    let mut board = puzzle.solution().clone();
    for index in editable_cells(puzzle).into_iter().take(wrong) {
        board.set(index, None).unwrap();
    }
    board
}

/// Hands out the same puzzle every time and records requested tiers.
#[derive(Default)]
pub struct FixedSource {
    pub requests: Vec<Difficulty>,
    pub failures: VecDeque<PuzzleError>,
}

impl PuzzleSource for FixedSource {
    fn generate(&mut self, difficulty: Difficulty) -> Result<Puzzle, PuzzleError> {
        self.requests.push(difficulty);
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(easy_puzzle()),
        }
    }
}
