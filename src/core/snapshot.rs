//! Read-only snapshots for renderers and network observers.
//!
//! A snapshot is taken between ticks and serialized as one JSON line, so
//! observers never hold a reference into live game state.

use serde::{Deserialize, Serialize};

use crate::core::game::{Game, Outcome};
use crate::types::{Cell, Side};

/// One piece as observers see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSnapshot {
    pub id: String,
    /// Single-letter type code, `K`/`Q`/`R`/`B`/`N`/`P`.
    pub kind: char,
    pub side: char,
    pub cell: Cell,
    /// Pixel position for smooth rendering of in-flight pieces.
    pub pos_px: (i32, i32),
    pub cooldown_ms: i64,
    pub travelling: bool,
}

/// Whole-board view at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub now_ms: i64,
    pub rows: i8,
    pub cols: i8,
    pub pieces: Vec<PieceSnapshot>,
    /// `Some` once the game is decided; `None` while in play.
    pub winner: Option<char>,
    pub draw: bool,
}

impl GameSnapshot {
    pub fn capture(game: &Game, now: i64) -> Self {
        let geometry = game.geometry();
        let pieces = game
            .pieces()
            .iter()
            .map(|p| PieceSnapshot {
                id: p.id().to_string(),
                kind: p.piece_type().as_char(),
                side: p.side().as_char(),
                cell: p.current_cell(),
                pos_px: p.pos_pix(),
                cooldown_ms: p.cooldown_remaining_ms(now),
                travelling: p.is_travelling(),
            })
            .collect();
        let (winner, draw) = match game.outcome() {
            Some(Outcome::Winner(side)) => (Some(side.as_char()), false),
            Some(Outcome::Draw) => (None, true),
            None => (None, false),
        };
        Self {
            now_ms: now,
            rows: geometry.rows,
            cols: geometry.cols,
            pieces,
            winner,
            draw,
        }
    }

    pub fn piece(&self, id: &str) -> Option<&PieceSnapshot> {
        self.pieces.iter().find(|p| p.id == id)
    }

    pub fn pieces_at(&self, cell: Cell) -> impl Iterator<Item = &PieceSnapshot> {
        self.pieces.iter().filter(move |p| p.cell == cell)
    }

    pub fn winner_side(&self) -> Option<Side> {
        self.winner.and_then(Side::from_char)
    }
}
