use serde::{Deserialize, Serialize};

use crate::grid::{GridPos, GridSize};

/// Unit vector pointing toward the locally best neighbour. The zero vector
/// marks the target cell and cells with no way out.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Direction {
    pub x: f32,
    pub y: f32,
}

impl Direction {
    pub const ZERO: Direction = Direction { x: 0.0, y: 0.0 };

    /// Normalized direction along `(dx, dy)`; zero stays zero.
    pub fn toward(dx: i32, dy: i32) -> Self {
        let len = ((dx * dx + dy * dy) as f32).sqrt();
        if len == 0.0 {
            return Self::ZERO;
        }
        Self {
            x: dx as f32 / len,
            y: dy as f32 / len,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// A completed per-cell direction field, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowField {
    size: GridSize,
    directions: Vec<Direction>,
}

impl FlowField {
    /// Wrap a row-major direction buffer. Short buffers are padded with zero
    /// vectors, long ones truncated.
    pub fn from_directions(size: GridSize, mut directions: Vec<Direction>) -> Self {
        directions.resize(size.cell_count(), Direction::ZERO);
        Self { size, directions }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Direction at a field-local cell, or `None` outside the field.
    pub fn get(&self, local: GridPos) -> Option<Direction> {
        if !self.size.contains(local) {
            return None;
        }
        Some(self.directions[self.size.index(local.x as usize, local.y as usize)])
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn row(&self, y: usize) -> &[Direction] {
        let start = y * self.size.width;
        &self.directions[start..start + self.size.width]
    }
}

/// What `collect` hands back: the field plus the world-space origin it is
/// anchored at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedField {
    pub field: FlowField,
    pub origin: GridPos,
}

impl CollectedField {
    /// Direction at a world-space cell.
    pub fn direction_at(&self, world: GridPos) -> Option<Direction> {
        let x = i32::try_from(world.x as i64 - self.origin.x as i64).ok()?;
        let y = i32::try_from(world.y as i64 - self.origin.y as i64).ok()?;
        self.field.get(GridPos::new(x, y))
    }
}
