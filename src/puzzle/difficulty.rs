//! Difficulty tiers.
//!
//! A tier selects how many givens the generator leaves on the board and is
//! also the key of the matchmaking queue.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Puzzle difficulty, serialized in lowercase (`"easy"`, `"medium"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Many givens.
    Easy,
    /// Default tier.
    Medium,
    /// Fewer givens.
    Hard,
    /// Sparse board.
    Expert,
    /// Sparsest board the generator will attempt.
    Master,
}

impl Difficulty {
    /// Every tier, easiest first.
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
        Difficulty::Master,
    ];

    /// Number of givens the generator aims to leave on the board.
    ///
    /// Best effort: removal stops early when every remaining given is
    /// needed to keep the solution unique.
    pub const fn target_givens(self) -> usize {
        match self {
            Difficulty::Easy => 40,
            Difficulty::Medium => 34,
            Difficulty::Hard => 30,
            Difficulty::Expert => 27,
            Difficulty::Master => 24,
        }
    }

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
            Difficulty::Master => "master",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown difficulty name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty: {0}")]
pub struct ParseDifficultyError(pub String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseDifficultyError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        for difficulty in Difficulty::ALL {
            let json = serde_json::to_string(&difficulty).unwrap();
            assert_eq!(json, format!("\"{}\"", difficulty.as_str()));
            assert_eq!(difficulty.as_str().parse::<Difficulty>().unwrap(), difficulty);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(serde_json::from_str::<Difficulty>("\"nightmare\"").is_err());
        assert!("nightmare".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_givens_decrease_with_difficulty() {
        let givens: Vec<usize> = Difficulty::ALL.iter().map(|d| d.target_givens()).collect();
        assert!(givens.windows(2).all(|w| w[0] > w[1]));
        assert!(givens.iter().all(|&g| g >= 17 && g < 81));
    }
}
