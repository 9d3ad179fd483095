use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate on the grid. `(0, 0)` is the bottom-left cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    /// Creates a new Position.
    pub fn new(x: u32, y: u32) -> Self {
        Position { x, y }
    }

    /// Offsets the position by `(dx, dy)`, returning `None` if the result
    /// falls outside a `width` x `height` grid. Boundaries never wrap.
    pub fn offset(&self, dx: i32, dy: i32, width: u32, height: u32) -> Option<Position> {
        let x = self.x as i64 + dx as i64;
        let y = self.y as i64 + dy as i64;
        if x >= 0 && x < width as i64 && y >= 0 && y < height as i64 {
            Some(Position::new(x as u32, y as u32))
        } else {
            None
        }
    }

    /// Chebyshev distance: the number of Moore steps between two cells.
    pub fn chebyshev_distance(&self, other: Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// True if the two cells touch (orthogonally or diagonally) and are not the same cell.
    pub fn is_adjacent(&self, other: Position) -> bool {
        self.chebyshev_distance(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
