//! Core types shared across the application.
//!
//! Pure data types and timing constants with no behavior beyond
//! construction and parsing.

use serde::{Deserialize, Serialize};

/// Board dimensions (cells).
pub const BOARD_ROWS: i8 = 8;
pub const BOARD_COLS: i8 = 8;

/// Cell geometry: 1 cell == 1 metre == 32 pixels.
pub const CELL_SIZE_M: f64 = 1.0;
pub const CELL_SIZE_PX: i32 = 32;

/// Game timing constants (milliseconds unless noted).
pub const TICK_MS: u32 = 16;
pub const LONG_REST_MS: i64 = 6000;
pub const SHORT_REST_MS: i64 = 3000;
pub const JUMP_HOLD_MS: i64 = 1000;

/// Default travel speed (metres per second; 1 cell == 1 m).
pub const TRAVEL_SPEED_M_S: f64 = 1.0;

/// A board cell as `(row, col)`, zero-indexed, row-major.
///
/// Serialized on the wire as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i8, i8)", into = "(i8, i8)")]
pub struct Cell {
    pub row: i8,
    pub col: i8,
}

impl Cell {
    pub const fn new(row: i8, col: i8) -> Self {
        Self { row, col }
    }

    /// Apply a relative offset. The result may be off-board; callers filter
    /// through [`crate::core::BoardGeometry::contains`].
    pub fn offset(self, dr: i8, dc: i8) -> Self {
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Relative offset from `self` to `other`.
    pub fn delta_to(self, other: Cell) -> (i8, i8) {
        (other.row - self.row, other.col - self.col)
    }
}

impl From<(i8, i8)> for Cell {
    fn from((row, col): (i8, i8)) -> Self {
        Self { row, col }
    }
}

impl From<Cell> for (i8, i8) {
    fn from(c: Cell) -> Self {
        (c.row, c.col)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Piece colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Row direction a pawn of this side advances in
    /// (white starts at the bottom of the grid).
    pub fn forward(self) -> i8 {
        match self {
            Side::White => -1,
            Side::Black => 1,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Side::White => 'W',
            Side::Black => 'B',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'W' => Some(Side::White),
            'B' => Some(Side::Black),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

/// Closed set of piece types; all type-specific legality matches on this
/// tag exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    pub fn as_char(self) -> char {
        match self {
            PieceType::Pawn => 'P',
            PieceType::Knight => 'N',
            PieceType::Bishop => 'B',
            PieceType::Rook => 'R',
            PieceType::Queen => 'Q',
            PieceType::King => 'K',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'P' => Some(PieceType::Pawn),
            'N' => Some(PieceType::Knight),
            'B' => Some(PieceType::Bishop),
            'R' => Some(PieceType::Rook),
            'Q' => Some(PieceType::Queen),
            'K' => Some(PieceType::King),
            _ => None,
        }
    }

    /// Whether legal moves additionally require an unobstructed path from
    /// source to destination. The pawn is included so the double step
    /// cannot leap over a blocker; knights and kings are exempt.
    pub fn needs_clear_path(self) -> bool {
        matches!(
            self,
            PieceType::Rook | PieceType::Bishop | PieceType::Queen | PieceType::Pawn
        )
    }
}

/// Closed, exhaustive set of event kinds.
///
/// `Arrived` is internally generated by the motion engine; the rest are
/// externally issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Idle,
    Move,
    Jump,
    Arrived,
}

impl EventKind {
    /// Parse from string (case-insensitive, for the wire protocol).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Some(EventKind::Idle),
            "move" => Some(EventKind::Move),
            "jump" => Some(EventKind::Jump),
            "arrived" => Some(EventKind::Arrived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Idle => "idle",
            EventKind::Move => "move",
            EventKind::Jump => "jump",
            EventKind::Arrived => "arrived",
        }
    }
}
