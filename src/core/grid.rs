//! Sudoku Grid
//!
//! A 9x9 board stored row-major as 81 cells. On the wire a grid is a JSON
//! array of exactly 81 entries, each `null` (empty) or an integer 1-9.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cells per row, column and box side group.
pub const GRID_SIDE: usize = 9;

/// Total cells on the board.
pub const GRID_CELLS: usize = GRID_SIDE * GRID_SIDE;

/// A single cell: `None` when empty, otherwise a digit 1-9.
pub type Cell = Option<u8>;

/// Grid validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Board does not have exactly 81 cells.
    #[error("grid must have {GRID_CELLS} cells, got {0}")]
    WrongLength(usize),

    /// Cell holds something other than 1-9.
    #[error("cell {index} holds {value}, expected 1-9")]
    InvalidValue {
        /// Row-major cell index.
        index: usize,
        /// Offending value.
        value: u8,
    },

    /// Index past the end of the board.
    #[error("cell index {0} out of range")]
    IndexOutOfRange(usize),

    /// Unrecognized character in a text board.
    #[error("unexpected character {0:?} in grid text")]
    BadChar(char),
}

/// A 9x9 Sudoku board.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<u8>>", into = "Vec<Option<u8>>")]
pub struct Grid([Cell; GRID_CELLS]);

impl Grid {
    /// A board with every cell empty.
    pub const fn empty() -> Self {
        Self([None; GRID_CELLS])
    }

    /// Build a grid from raw cells, validating every value.
    pub fn from_cells(cells: [Cell; GRID_CELLS]) -> Result<Self, GridError> {
        for (index, cell) in cells.iter().enumerate() {
            if let Some(value) = *cell {
                if !(1..=9).contains(&value) {
                    return Err(GridError::InvalidValue { index, value });
                }
            }
        }
        Ok(Self(cells))
    }

    /// Parse an 81-character board: digits 1-9 are givens, `.` or `0` are
    /// empty. Whitespace is skipped.
    pub fn parse(text: &str) -> Result<Self, GridError> {
        let mut cells = Vec::with_capacity(GRID_CELLS);
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            let cell = match ch {
                '.' | '0' => None,
                '1'..='9' => ch.to_digit(10).map(|d| d as u8),
                other => return Err(GridError::BadChar(other)),
            };
            cells.push(cell);
        }
        Self::try_from(cells)
    }

    /// Cell at a row-major index. Out-of-range indices read as empty.
    #[inline]
    pub fn get(&self, index: usize) -> Cell {
        self.0.get(index).copied().flatten()
    }

    /// Cell at (row, col).
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> Cell {
        if row >= GRID_SIDE || col >= GRID_SIDE {
            return None;
        }
        self.get(row * GRID_SIDE + col)
    }

    /// Set a cell. `None` clears it.
    pub fn set(&mut self, index: usize, value: Cell) -> Result<(), GridError> {
        if let Some(v) = value {
            if !(1..=9).contains(&v) {
                return Err(GridError::InvalidValue { index, value: v });
            }
        }
        let slot = self
            .0
            .get_mut(index)
            .ok_or(GridError::IndexOutOfRange(index))?;
        *slot = value;
        Ok(())
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell; GRID_CELLS] {
        &self.0
    }

    /// Number of non-empty cells.
    pub fn filled_count(&self) -> usize {
        self.0.iter().filter(|c| c.is_some()).count()
    }

    /// True when no cell is empty.
    pub fn is_full(&self) -> bool {
        self.filled_count() == GRID_CELLS
    }

    /// Number of positions where both grids hold the same value
    /// (two empty cells also count as equal).
    pub fn matching_cells(&self, other: &Grid) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a == b)
            .count()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Vec<Option<u8>>> for Grid {
    type Error = GridError;

    fn try_from(cells: Vec<Option<u8>>) -> Result<Self, Self::Error> {
        let len = cells.len();
        let cells: [Cell; GRID_CELLS] = cells
            .try_into()
            .map_err(|_| GridError::WrongLength(len))?;
        Self::from_cells(cells)
    }
}

impl From<Grid> for Vec<Option<u8>> {
    fn from(grid: Grid) -> Self {
        grid.0.to_vec()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.0.chunks(GRID_SIDE) {
            for cell in row {
                match cell {
                    Some(v) => write!(f, "{v}")?,
                    None => write!(f, ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid({} filled)", self.filled_count())
    }
}
