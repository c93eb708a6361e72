use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::GridPosition;

/// Errors raised when a coordinate falls outside the grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position ({x}, {y}) is out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Extents of the learning grid. Valid cells are `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: usize,
    pub height: usize,
}

impl GridBounds {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, position: GridPosition) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Returns `position` unchanged if it lies on the grid.
    pub fn check(&self, position: GridPosition) -> Result<GridPosition, GridError> {
        if self.contains(position) {
            Ok(position)
        } else {
            Err(GridError::OutOfBounds {
                x: position.x,
                y: position.y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Moves `position` by one cell in the given direction, staying on the grid.
    ///
    /// Used by front ends for cursor movement; the engine itself never clamps.
    pub fn offset(&self, position: GridPosition, dx: isize, dy: isize) -> GridPosition {
        let x = position
            .x
            .saturating_add_signed(dx)
            .min(self.width.saturating_sub(1));
        let y = position
            .y
            .saturating_add_signed(dy)
            .min(self.height.saturating_sub(1));
        GridPosition { x, y }
    }

}

/// A dense 2D layer over the grid, stored row-major.
///
/// The session keeps one of these to answer "what is on this cell" without
/// scanning the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    bounds: GridBounds,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(bounds: GridBounds) -> Self
    where
        T: Default + Clone,
    {
        let size = bounds
            .width
            .checked_mul(bounds.height)
            .expect("Grid size overflow");
        Grid {
            bounds,
            cells: vec![T::default(); size],
        }
    }

    #[inline]
    fn index_of(&self, position: GridPosition) -> Option<usize> {
        self.bounds
            .contains(position)
            .then(|| position.y * self.bounds.width + position.x)
    }

    pub fn get(&self, position: GridPosition) -> Option<&T> {
        self.index_of(position).and_then(|i| self.cells.get(i))
    }

}

impl<T> Index<GridPosition> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: GridPosition) -> &Self::Output {
        match self.index_of(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.bounds.width, self.bounds.height
            ),
        }
    }
}

impl<T> IndexMut<GridPosition> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: GridPosition) -> &mut Self::Output {
        let bounds = self.bounds;
        match self.index_of(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, bounds.width, bounds.height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_rejects_cells_past_the_edge() {
        let bounds = GridBounds::new(10, 10);
        assert!(bounds.check(GridPosition::new(9, 9)).is_ok());
        assert_eq!(
            bounds.check(GridPosition::new(10, 3)),
            Err(GridError::OutOfBounds {
                x: 10,
                y: 3,
                width: 10,
                height: 10
            })
        );
    }

    #[test]
    fn offset_stays_on_grid() {
        let bounds = GridBounds::new(4, 3);
        let corner = GridPosition::new(0, 0);
        assert_eq!(bounds.offset(corner, -1, -1), corner);
        let far = GridPosition::new(3, 2);
        assert_eq!(bounds.offset(far, 1, 1), far);
        assert_eq!(bounds.offset(corner, 1, 0), GridPosition::new(1, 0));
    }

    #[test]
    fn layer_is_row_major() {
        let mut grid: Grid<Option<u8>> = Grid::new(GridBounds::new(3, 2));
        grid[GridPosition::new(2, 1)] = Some(7);
        assert_eq!(grid[GridPosition::new(2, 1)], Some(7));
        assert_eq!(grid.cells[5], Some(7));
        assert_eq!(grid.get(GridPosition::new(2, 1)), Some(&Some(7)));
        assert_eq!(grid.get(GridPosition::new(3, 0)), None);
        assert_eq!(grid.get(GridPosition::new(0, 2)), None);
    }
}
