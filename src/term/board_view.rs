//! BoardView: maps a [`GameSnapshot`] into a terminal framebuffer.
//!
//! Pure (no I/O); unit-testable. Each board cell is 2 terminal columns by
//! 1 row. In-flight pieces are drawn at their derived cell; resting pieces
//! get a cooldown tint that fades as the rest drains.

use crate::core::snapshot::{GameSnapshot, PieceSnapshot};
use crate::input::PlayerCursor;
use crate::term::fb::{FrameBuffer, GlyphStyle, Rgb};
use crate::types::{Cell, Side};

const CELL_W: u16 = 2;
const CELL_H: u16 = 1;

const LIGHT_SQUARE: Rgb = Rgb::new(90, 80, 60);
const DARK_SQUARE: Rgb = Rgb::new(50, 40, 30);
const REST_TINT: Rgb = Rgb::new(110, 30, 30);
const WHITE_PIECE: Rgb = Rgb::new(240, 240, 240);
const BLACK_PIECE: Rgb = Rgb::new(40, 40, 40);
const CURSOR_P1: Rgb = Rgb::new(60, 140, 220);
const CURSOR_P2: Rgb = Rgb::new(60, 180, 80);

pub struct BoardView {
    origin_x: u16,
    origin_y: u16,
}

impl Default for BoardView {
    fn default() -> Self {
        Self {
            origin_x: 2,
            origin_y: 1,
        }
    }
}

impl BoardView {
    fn cell_origin(&self, cell: Cell) -> (u16, u16) {
        (
            self.origin_x + cell.col as u16 * CELL_W,
            self.origin_y + cell.row as u16 * CELL_H,
        )
    }

    /// Render the snapshot plus both cursors into `fb`.
    pub fn render(&self, fb: &mut FrameBuffer, snap: &GameSnapshot, cursors: &[&PlayerCursor]) {
        fb.clear();
        self.draw_squares(fb, snap);
        for piece in &snap.pieces {
            self.draw_piece(fb, piece);
        }
        for cursor in cursors {
            self.draw_cursor(fb, cursor);
        }
        self.draw_status(fb, snap);
    }

    fn draw_squares(&self, fb: &mut FrameBuffer, snap: &GameSnapshot) {
        for row in 0..snap.rows {
            for col in 0..snap.cols {
                let bg = if (row + col) % 2 == 0 {
                    LIGHT_SQUARE
                } else {
                    DARK_SQUARE
                };
                let (x, y) = self.cell_origin(Cell::new(row, col));
                fb.fill(x, y, CELL_W, CELL_H, ' ', GlyphStyle::default().on(bg));
            }
        }
    }

    fn draw_piece(&self, fb: &mut FrameBuffer, piece: &PieceSnapshot) {
        let (x, y) = self.cell_origin(piece.cell);
        if piece.cooldown_ms > 0 {
            fb.tint(x, y, CELL_W, CELL_H, REST_TINT);
        }
        let fg = if piece.side == Side::White.as_char() {
            WHITE_PIECE
        } else {
            BLACK_PIECE
        };
        let mut style = GlyphStyle::default().fg(fg);
        if let Some(g) = fb.get(x, y) {
            style.bg = g.style.bg;
        }
        if piece.side == Side::White.as_char() {
            style = style.bold();
        }
        // Travelling pieces render lowercase so motion is visible even
        // between cell boundaries.
        let ch = if piece.travelling {
            piece.kind.to_ascii_lowercase()
        } else {
            piece.kind
        };
        fb.put(x, y, ch, style);
    }

    fn draw_cursor(&self, fb: &mut FrameBuffer, cursor: &PlayerCursor) {
        let bg = match cursor.side() {
            Side::White => CURSOR_P1,
            Side::Black => CURSOR_P2,
        };
        let (x, y) = self.cell_origin(cursor.cursor());
        fb.tint(x, y, CELL_W, CELL_H, bg);
        if let Some((_, src)) = cursor.selected() {
            let (sx, sy) = self.cell_origin(*src);
            let style = GlyphStyle::default().fg(bg).bold();
            fb.put(sx + CELL_W - 1, sy, '*', style);
        }
    }

    fn draw_status(&self, fb: &mut FrameBuffer, snap: &GameSnapshot) {
        let y = self.origin_y + snap.rows as u16 * CELL_H + 1;
        let line = if snap.draw {
            "draw: both kings fell".to_string()
        } else if let Some(side) = snap.winner_side() {
            match side {
                Side::White => "white wins".to_string(),
                Side::Black => "black wins".to_string(),
            }
        } else {
            format!("t={}ms  pieces={}  q to quit", snap.now_ms, snap.pieces.len())
        };
        fb.put_str(self.origin_x, y, &line, GlyphStyle::default().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::BoardGeometry;
    use crate::core::game::Game;
    use crate::core::library::PieceLibrary;
    use crate::input::Keymap;
    use crate::types::PieceType;

    fn snap() -> GameSnapshot {
        let mut lib = PieceLibrary::new(BoardGeometry::standard()).unwrap();
        let pieces = vec![
            lib.create_piece(PieceType::King, Side::White, Cell::new(7, 4)),
            lib.create_piece(PieceType::King, Side::Black, Cell::new(0, 4)),
        ];
        let mut game = Game::new(BoardGeometry::standard(), pieces).unwrap();
        game.start(0);
        GameSnapshot::capture(&game, 0)
    }

    #[test]
    fn test_pieces_render_at_their_cells() {
        let view = BoardView::default();
        let mut fb = FrameBuffer::new(40, 15);
        let cursor = PlayerCursor::new(Side::White, Keymap::arrows(), 8, 8, Cell::new(3, 3));
        view.render(&mut fb, &snap(), &[&cursor]);

        // White king at (7,4): origin 2 + 4*2 = 10, 1 + 7 = 8.
        assert_eq!(fb.get(10, 8).unwrap().ch, 'K');
        // Black king at (0,4).
        assert_eq!(fb.get(10, 1).unwrap().ch, 'K');
        // Cursor cell is tinted.
        assert_eq!(fb.get(8, 4).unwrap().style.bg, super::CURSOR_P1);
    }
}
