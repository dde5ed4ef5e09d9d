//! Backtracking Solver
//!
//! Bitmask constraint tracking per row, column and box with a
//! minimum-remaining-values cell choice. Used both to derive a puzzle's
//! solution and to check that a candidate puzzle stays uniquely solvable
//! while the generator removes givens.

use thiserror::Error;

use crate::core::grid::{Grid, GridError, GRID_CELLS, GRID_SIDE};
use crate::core::rng::DeterministicRng;

/// Bits 1..=9 set.
const ALL_DIGITS: u16 = 0b11_1111_1110;

/// Solver errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// Two givens already conflict.
    #[error("givens conflict at cell {0}")]
    InvalidGivens(usize),

    /// No assignment satisfies the givens.
    #[error("puzzle has no solution")]
    NoSolution,

    /// More than one assignment satisfies the givens.
    #[error("puzzle has more than one solution")]
    MultipleSolutions,

    /// Produced grid failed validation.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Working state for the search.
#[derive(Clone)]
struct Board {
    cells: [u8; GRID_CELLS],
    rows: [u16; GRID_SIDE],
    cols: [u16; GRID_SIDE],
    boxes: [u16; GRID_SIDE],
}

#[inline]
const fn row_of(index: usize) -> usize {
    index / GRID_SIDE
}

#[inline]
const fn col_of(index: usize) -> usize {
    index % GRID_SIDE
}

#[inline]
const fn box_of(index: usize) -> usize {
    (row_of(index) / 3) * 3 + col_of(index) / 3
}

impl Board {
    fn empty() -> Self {
        Self {
            cells: [0; GRID_CELLS],
            rows: [0; GRID_SIDE],
            cols: [0; GRID_SIDE],
            boxes: [0; GRID_SIDE],
        }
    }

    fn from_grid(grid: &Grid) -> Result<Self, SolveError> {
        let mut board = Self::empty();
        for (index, cell) in grid.cells().iter().enumerate() {
            if let Some(digit) = *cell {
                if board.candidates(index) & (1 << digit) == 0 {
                    return Err(SolveError::InvalidGivens(index));
                }
                board.place(index, digit);
            }
        }
        Ok(board)
    }

    fn to_grid(&self) -> Result<Grid, SolveError> {
        let cells = self.cells.map(|v| if v == 0 { None } else { Some(v) });
        Ok(Grid::from_cells(cells)?)
    }

    #[inline]
    fn candidates(&self, index: usize) -> u16 {
        let used = self.rows[row_of(index)] | self.cols[col_of(index)] | self.boxes[box_of(index)];
        !used & ALL_DIGITS
    }

    #[inline]
    fn place(&mut self, index: usize, digit: u8) {
        let bit = 1u16 << digit;
        self.cells[index] = digit;
        self.rows[row_of(index)] |= bit;
        self.cols[col_of(index)] |= bit;
        self.boxes[box_of(index)] |= bit;
    }

    #[inline]
    fn clear(&mut self, index: usize, digit: u8) {
        let bit = !(1u16 << digit);
        self.cells[index] = 0;
        self.rows[row_of(index)] &= bit;
        self.cols[col_of(index)] &= bit;
        self.boxes[box_of(index)] &= bit;
    }

    /// Empty cell with the fewest candidates, or `None` when the board is full.
    fn most_constrained(&self) -> Option<(usize, u16)> {
        let mut best: Option<(usize, u16)> = None;
        for index in 0..GRID_CELLS {
            if self.cells[index] != 0 {
                continue;
            }
            let mask = self.candidates(index);
            let count = mask.count_ones();
            if count == 0 {
                return Some((index, 0));
            }
            match best {
                Some((_, m)) if m.count_ones() <= count => {}
                _ => best = Some((index, mask)),
            }
        }
        best
    }

    fn count(&mut self, limit: usize, found: &mut usize, first: &mut Option<[u8; GRID_CELLS]>) {
        if *found >= limit {
            return;
        }
        let Some((index, mask)) = self.most_constrained() else {
            *found += 1;
            if first.is_none() {
                *first = Some(self.cells);
            }
            return;
        };
        for digit in 1..=9u8 {
            if mask & (1 << digit) == 0 {
                continue;
            }
            self.place(index, digit);
            self.count(limit, found, first);
            self.clear(index, digit);
            if *found >= limit {
                return;
            }
        }
    }

    fn fill_random(&mut self, rng: &mut DeterministicRng) -> bool {
        let Some((index, mask)) = self.most_constrained() else {
            return true;
        };
        let mut digits = [1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        rng.shuffle(&mut digits);
        for digit in digits {
            if mask & (1 << digit) == 0 {
                continue;
            }
            self.place(index, digit);
            if self.fill_random(rng) {
                return true;
            }
            self.clear(index, digit);
        }
        false
    }
}

/// Count solutions of `grid`, stopping once `limit` have been found.
///
/// Returns 0 for a grid whose givens conflict.
pub fn count_solutions(grid: &Grid, limit: usize) -> usize {
    let Ok(mut board) = Board::from_grid(grid) else {
        return 0;
    };
    let mut found = 0;
    let mut first = None;
    board.count(limit, &mut found, &mut first);
    found
}

/// Solve a puzzle that must have exactly one solution.
pub fn solve(grid: &Grid) -> Result<Grid, SolveError> {
    let mut board = Board::from_grid(grid)?;
    let mut found = 0;
    let mut first = None;
    board.count(2, &mut found, &mut first);

    match (found, first) {
        (1, Some(cells)) => {
            board.cells = cells;
            board.to_grid()
        }
        (0, _) => Err(SolveError::NoSolution),
        _ => Err(SolveError::MultipleSolutions),
    }
}

/// Produce a random, completely filled, valid board.
pub fn random_solved_grid(rng: &mut DeterministicRng) -> Result<Grid, SolveError> {
    let mut board = Board::empty();
    if !board.fill_random(rng) {
        return Err(SolveError::NoSolution);
    }
    board.to_grid()
}

/// True when `grid` is full and every row, column and box holds 1-9 once.
pub fn is_valid_solution(grid: &Grid) -> bool {
    grid.is_full() && Board::from_grid(grid).is_ok()
}
