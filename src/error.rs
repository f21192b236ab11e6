//! Engine errors: rejected board configurations and moves that change nothing.

use thiserror::Error;

/// Board parameters or layouts that cannot produce a game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfiguration {
    #[error("board needs at least one row")]
    ZeroRows,
    #[error("board needs at least one column")]
    ZeroCols,
    #[error("board needs at least one colour")]
    ZeroColors,
    #[error("layout has no cells")]
    EmptyLayout,
    #[error("layout row {row} has {found} cells, expected {expected}")]
    RaggedLayout {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("colour {color} at ({row}, {col}) is outside 0..{colors}")]
    ColorOutOfRange {
        row: usize,
        col: usize,
        color: u8,
        colors: u8,
    },
}

/// A selection that left the board untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoOp {
    #[error("cell is empty")]
    EmptyCell,
    #[error("tile has no same-coloured neighbour")]
    LoneTile,
    #[error("game is over")]
    GameOver,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_layout_display() {
        let err = InvalidConfiguration::RaggedLayout {
            row: 2,
            expected: 4,
            found: 3,
        };
        assert_eq!(err.to_string(), "layout row 2 has 3 cells, expected 4");
    }

    #[test]
    fn test_color_out_of_range_display() {
        let err = InvalidConfiguration::ColorOutOfRange {
            row: 0,
            col: 1,
            color: 7,
            colors: 6,
        };
        assert_eq!(err.to_string(), "colour 7 at (0, 1) is outside 0..6");
    }

    #[test]
    fn test_noop_display() {
        assert_eq!(NoOp::LoneTile.to_string(), "tile has no same-coloured neighbour");
    }
}
