//! Board geometry: cell grid dimensions and coordinate conversions.
//!
//! Three coordinate spaces: cells `(row, col)`, metres (the motion engine's
//! continuous space, cell origin at `col*w, row*h`), and pixels (observers).
//! `m_to_cell` rounds to nearest, so a travelling piece flips cells at the
//! midpoint of its path between two cells.

use crate::types::{Cell, BOARD_COLS, BOARD_ROWS, CELL_SIZE_M, CELL_SIZE_PX};

/// Continuous position in metres, `(x, y)` with x along columns.
pub type PosM = (f64, f64);

/// Pixel position, `(x, y)`.
pub type PosPix = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    pub rows: i8,
    pub cols: i8,
    pub cell_w_m: f64,
    pub cell_h_m: f64,
    pub cell_w_px: i32,
    pub cell_h_px: i32,
}

impl BoardGeometry {
    pub fn new(rows: i8, cols: i8) -> Self {
        assert!(rows > 0 && cols > 0, "board must have positive dimensions");
        Self {
            rows,
            cols,
            cell_w_m: CELL_SIZE_M,
            cell_h_m: CELL_SIZE_M,
            cell_w_px: CELL_SIZE_PX,
            cell_h_px: CELL_SIZE_PX,
        }
    }

    /// Standard 8x8 board.
    pub fn standard() -> Self {
        Self::new(BOARD_ROWS, BOARD_COLS)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (0..self.rows).contains(&cell.row) && (0..self.cols).contains(&cell.col)
    }

    /// Reference point of a cell in metres (its top-left corner).
    pub fn cell_to_m(&self, cell: Cell) -> PosM {
        (
            f64::from(cell.col) * self.cell_w_m,
            f64::from(cell.row) * self.cell_h_m,
        )
    }

    /// Nearest cell for a continuous position.
    pub fn m_to_cell(&self, pos: PosM) -> Cell {
        let (x, y) = pos;
        Cell {
            row: (y / self.cell_h_m).round() as i8,
            col: (x / self.cell_w_m).round() as i8,
        }
    }

    pub fn m_to_pix(&self, pos: PosM) -> PosPix {
        let (x, y) = pos;
        (
            (x / self.cell_w_m * f64::from(self.cell_w_px)).round() as i32,
            (y / self.cell_h_m * f64::from(self.cell_h_px)).round() as i32,
        )
    }
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_m_roundtrip_is_exact() {
        let g = BoardGeometry::standard();
        for row in 0..8 {
            for col in 0..8 {
                let cell = Cell::new(row, col);
                assert_eq!(g.m_to_cell(g.cell_to_m(cell)), cell);
            }
        }
    }

    #[test]
    fn test_m_to_cell_flips_at_midpoint() {
        let g = BoardGeometry::standard();
        // Just under halfway from (0,0) toward (0,1): still the source cell.
        assert_eq!(g.m_to_cell((0.49, 0.0)), Cell::new(0, 0));
        // Past halfway: nearest cell is the next one.
        assert_eq!(g.m_to_cell((0.51, 0.0)), Cell::new(0, 1));
    }

    #[test]
    fn test_m_to_pix_scales_by_cell_size() {
        let g = BoardGeometry::standard();
        assert_eq!(g.m_to_pix((0.0, 0.0)), (0, 0));
        assert_eq!(g.m_to_pix((1.0, 2.0)), (32, 64));
        assert_eq!(g.m_to_pix((0.5, 0.0)), (16, 0));
    }

    #[test]
    fn test_contains_bounds() {
        let g = BoardGeometry::standard();
        assert!(g.contains(Cell::new(0, 0)));
        assert!(g.contains(Cell::new(7, 7)));
        assert!(!g.contains(Cell::new(-1, 0)));
        assert!(!g.contains(Cell::new(0, 8)));
    }
}
