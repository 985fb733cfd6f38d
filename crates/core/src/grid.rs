use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Integer cell coordinate. World-space or field-local depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for GridPos {
    type Output = GridPos;

    fn add(self, rhs: GridPos) -> GridPos {
        GridPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GridPos {
    type Output = GridPos;

    fn sub(self, rhs: GridPos) -> GridPos {
        GridPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Field dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl GridSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether a field-local position falls inside `0..width x 0..height`.
    pub fn contains(&self, local: GridPos) -> bool {
        local.x >= 0
            && local.y >= 0
            && (local.x as usize) < self.width
            && (local.y as usize) < self.height
    }

    /// Row-major index of a field-local cell. Caller guarantees `contains`.
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

/// A field rectangle anchored at a world-space origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRect {
    pub origin: GridPos,
    pub size: GridSize,
}

impl GridRect {
    pub const fn new(origin: GridPos, size: GridSize) -> Self {
        Self { origin, size }
    }

    /// Whether a world-space position lies inside the rectangle.
    pub fn contains(&self, world: GridPos) -> bool {
        let dx = world.x as i64 - self.origin.x as i64;
        let dy = world.y as i64 - self.origin.y as i64;
        dx >= 0
            && dy >= 0
            && (dx as u64) < self.size.width as u64
            && (dy as u64) < self.size.height as u64
    }

    /// World position of the last cell. `None` when the rectangle is empty,
    /// an extent exceeds `i32::MAX`, or a world cell falls outside `i32`.
    pub fn far_corner(&self) -> Option<GridPos> {
        fn last(origin: i32, extent: usize) -> Option<i32> {
            let extent = i32::try_from(extent).ok().filter(|&e| e > 0)?;
            origin.checked_add(extent - 1)
        }
        Some(GridPos::new(
            last(self.origin.x, self.size.width)?,
            last(self.origin.y, self.size.height)?,
        ))
    }

    /// Convert a world-space position into field-local coordinates.
    pub fn to_local(&self, world: GridPos) -> GridPos {
        world - self.origin
    }
}
