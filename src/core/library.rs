//! Piece library: per-type move tables, state-graph templates, and the
//! piece factory.
//!
//! Tables are expressed in the same line-oriented rule format external rule
//! files use, so built-in and loaded rules go through one parser. Each
//! piece type gets one template graph; `create_piece` instantiates it with
//! a fresh motion per piece.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;

use crate::core::board::BoardGeometry;
use crate::core::moves::{Moves, MovesError};
use crate::core::piece::Piece;
use crate::core::state::{GraphBuilder, GraphTemplate, StateName};
use crate::core::motion::MotionProfile;
use crate::types::{Cell, EventKind, JUMP_HOLD_MS, PieceType, Side, TRAVEL_SPEED_M_S};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("rule table for {piece:?}: {source}")]
    Rules {
        piece: PieceType,
        source: MovesError,
    },
    #[error("layout row {row}, column {col}: unknown piece code {code:?}")]
    UnknownPieceCode { row: usize, col: usize, code: String },
}

const KNIGHT_RULES: &str = "\
# knight: leaps, no path requirement
-2,-1\n-2,1\n-1,-2\n-1,2\n1,-2\n1,2\n2,-1\n2,1\n";

const KING_RULES: &str = "\
-1,-1\n-1,0\n-1,1\n0,-1\n0,1\n1,-1\n1,0\n1,1\n";

/// White pawns advance toward row 0.
const PAWN_WHITE_RULES: &str = "\
-1,0:non_capture
-2,0:1st
-1,-1:capture
-1,1:capture
";

const PAWN_BLACK_RULES: &str = "\
1,0:non_capture
2,0:1st
1,-1:capture
1,1:capture
";

/// Full offset enumeration along `dirs` up to `reach` cells; path
/// clearance is checked separately by the arbiter.
fn ray_rules(dirs: &[(i8, i8)], reach: i8) -> String {
    let mut out = String::new();
    for &(dr, dc) in dirs {
        for n in 1..=reach {
            let _ = writeln!(out, "{},{}", dr * n, dc * n);
        }
    }
    out
}

fn rules_for(piece_type: PieceType, side: Side, reach: i8) -> Result<Moves, LibraryError> {
    let text = match (piece_type, side) {
        (PieceType::Pawn, Side::White) => PAWN_WHITE_RULES.to_string(),
        (PieceType::Pawn, Side::Black) => PAWN_BLACK_RULES.to_string(),
        (PieceType::Knight, _) => KNIGHT_RULES.to_string(),
        (PieceType::King, _) => KING_RULES.to_string(),
        (PieceType::Rook, _) => ray_rules(&[(-1, 0), (1, 0), (0, -1), (0, 1)], reach),
        (PieceType::Bishop, _) => ray_rules(&[(-1, -1), (-1, 1), (1, -1), (1, 1)], reach),
        (PieceType::Queen, _) => ray_rules(
            &[
                (-1, 0),
                (1, 0),
                (0, -1),
                (0, 1),
                (-1, -1),
                (-1, 1),
                (1, -1),
                (1, 1),
            ],
            reach,
        ),
    };
    Moves::parse(&text).map_err(|source| LibraryError::Rules {
        piece: piece_type,
        source,
    })
}

/// Wire the standard graph shape:
///
/// ```text
/// idle --Move--> moving --Arrived--> long_rest --Arrived--> idle
/// idle --Jump--> jumping --Arrived--> short_rest --Arrived--> idle
/// ```
///
/// Pawns start in a `first_idle` whose Move leads through a one-time
/// `first_moving`; both arrival paths drop to the plain chain, so the
/// double step is available exactly once.
fn build_template(piece_type: PieceType, moves: Arc<Moves>) -> GraphTemplate {
    let mut b = GraphBuilder::new();
    let travel = MotionProfile::travel(TRAVEL_SPEED_M_S);
    // Rest durations are armed on arrival, keyed by the finished action.
    let rest = MotionProfile::rest(0);

    let idle = b.add_node(StateName::Idle, moves.clone(), MotionProfile::idle());
    let moving = b.add_node(StateName::Moving, moves.clone(), travel);
    let jumping = b.add_node(StateName::Jumping, moves.clone(), MotionProfile::jump(JUMP_HOLD_MS));
    let long_rest = b.add_node(StateName::LongRest, moves.clone(), rest);
    let short_rest = b.add_node(StateName::ShortRest, moves.clone(), rest);

    b.set_transition(idle, EventKind::Idle, idle);
    b.set_transition(idle, EventKind::Move, moving);
    b.set_transition(idle, EventKind::Jump, jumping);
    b.set_transition(moving, EventKind::Arrived, long_rest);
    b.set_transition(jumping, EventKind::Arrived, short_rest);
    b.set_transition(long_rest, EventKind::Arrived, idle);
    b.set_transition(short_rest, EventKind::Arrived, idle);

    let entry = if piece_type == PieceType::Pawn {
        let first_idle = b.add_node(StateName::FirstIdle, moves.clone(), MotionProfile::idle());
        let first_moving = b.add_node(StateName::FirstMoving, moves, travel);
        b.set_transition(first_idle, EventKind::Idle, first_idle);
        b.set_transition(first_idle, EventKind::Move, first_moving);
        b.set_transition(first_idle, EventKind::Jump, jumping);
        b.set_transition(first_moving, EventKind::Arrived, long_rest);
        first_idle
    } else {
        idle
    };

    b.build(entry)
}

/// Fully wired templates for every piece type, plus the factory that
/// clones them into live pieces.
#[derive(Debug)]
pub struct PieceLibrary {
    geometry: BoardGeometry,
    templates: HashMap<(PieceType, Side), GraphTemplate>,
    id_counters: HashMap<(PieceType, Side), u32>,
}

impl PieceLibrary {
    pub fn new(geometry: BoardGeometry) -> Result<Self, LibraryError> {
        let reach = (geometry.rows.max(geometry.cols) - 1).max(1);
        let mut templates = HashMap::new();
        for piece_type in PieceType::ALL {
            for side in [Side::White, Side::Black] {
                let moves = Arc::new(rules_for(piece_type, side, reach)?);
                templates.insert((piece_type, side), build_template(piece_type, moves));
            }
        }
        Ok(Self {
            geometry,
            templates,
            id_counters: HashMap::new(),
        })
    }

    pub fn geometry(&self) -> BoardGeometry {
        self.geometry
    }

    /// Clone the template graph with a fresh motion at `cell` and a unique
    /// id like `PW_1`.
    pub fn create_piece(&mut self, piece_type: PieceType, side: Side, cell: Cell) -> Piece {
        let template = &self.templates[&(piece_type, side)];
        let counter = self.id_counters.entry((piece_type, side)).or_insert(0);
        *counter += 1;
        let id = format!("{}{}_{}", piece_type.as_char(), side.as_char(), counter);
        Piece::new(id, piece_type, side, template.instantiate(self.geometry, cell))
    }

    /// Instantiate a whole layout.
    pub fn create_pieces(&mut self, layout: &[(PieceType, Side, Cell)]) -> Vec<Piece> {
        layout
            .iter()
            .map(|&(t, s, c)| self.create_piece(t, s, c))
            .collect()
    }
}

/// Standard chess starting position (white on rows 6..7).
pub fn standard_layout() -> Vec<(PieceType, Side, Cell)> {
    use PieceType::*;
    let back_rank = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];
    let mut layout = Vec::with_capacity(32);
    for (col, &t) in back_rank.iter().enumerate() {
        layout.push((t, Side::Black, Cell::new(0, col as i8)));
        layout.push((Pawn, Side::Black, Cell::new(1, col as i8)));
        layout.push((Pawn, Side::White, Cell::new(6, col as i8)));
        layout.push((t, Side::White, Cell::new(7, col as i8)));
    }
    layout
}

/// Parse a CSV board layout: one line per row, cells like `PW` or `KB`,
/// empty cells blank.
pub fn layout_from_csv(text: &str) -> Result<Vec<(PieceType, Side, Cell)>, LibraryError> {
    let mut layout = Vec::new();
    for (row, line) in text.lines().enumerate() {
        for (col, code) in line.split(',').enumerate() {
            let code = code.trim();
            if code.is_empty() {
                continue;
            }
            let parsed = (code.len() == 2)
                .then(|| {
                    let mut chars = code.chars();
                    let t = PieceType::from_char(chars.next()?)?;
                    let s = Side::from_char(chars.next()?)?;
                    Some((t, s))
                })
                .flatten();
            let Some((piece_type, side)) = parsed else {
                return Err(LibraryError::UnknownPieceCode {
                    row,
                    col,
                    code: code.to_string(),
                });
            };
            layout.push((piece_type, side, Cell::new(row as i8, col as i8)));
        }
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moves::MoveFlags;

    #[test]
    fn test_standard_layout_has_32_pieces_and_two_kings() {
        let layout = standard_layout();
        assert_eq!(layout.len(), 32);
        let kings: Vec<_> = layout
            .iter()
            .filter(|(t, _, _)| *t == PieceType::King)
            .collect();
        assert_eq!(kings.len(), 2);
    }

    #[test]
    fn test_created_pieces_get_unique_ids_and_fresh_motion() {
        let mut lib = PieceLibrary::new(BoardGeometry::standard()).unwrap();
        let a = lib.create_piece(PieceType::Rook, Side::White, Cell::new(7, 0));
        let b = lib.create_piece(PieceType::Rook, Side::White, Cell::new(7, 7));
        assert_eq!(a.id(), "RW_1");
        assert_eq!(b.id(), "RW_2");
        assert_eq!(a.current_cell(), Cell::new(7, 0));
        assert_eq!(b.current_cell(), Cell::new(7, 7));
    }

    #[test]
    fn test_pawn_starts_in_first_action_state() {
        let mut lib = PieceLibrary::new(BoardGeometry::standard()).unwrap();
        let pawn = lib.create_piece(PieceType::Pawn, Side::White, Cell::new(6, 0));
        assert!(pawn.state().name.is_first_action());
        let rook = lib.create_piece(PieceType::Rook, Side::White, Cell::new(7, 0));
        assert!(!rook.state().name.is_first_action());
    }

    #[test]
    fn test_rook_table_spans_ranks_and_files() {
        let mut lib = PieceLibrary::new(BoardGeometry::standard()).unwrap();
        let rook = lib.create_piece(PieceType::Rook, Side::White, Cell::new(7, 0));
        let g = BoardGeometry::standard();
        let moves = rook.state().moves.get_moves(Cell::new(7, 0), MoveFlags::any(), &g);
        // 7 up the file + 7 along the rank from a corner.
        assert_eq!(moves.len(), 14);
        assert!(moves.contains(&Cell::new(0, 0)));
        assert!(moves.contains(&Cell::new(7, 7)));
    }

    #[test]
    fn test_layout_from_csv() {
        let layout = layout_from_csv("KB,,\n,PW,\n,,KW\n").unwrap();
        assert_eq!(
            layout,
            vec![
                (PieceType::King, Side::Black, Cell::new(0, 0)),
                (PieceType::Pawn, Side::White, Cell::new(1, 1)),
                (PieceType::King, Side::White, Cell::new(2, 2)),
            ]
        );
        assert!(layout_from_csv("XX").is_err());
    }
}
