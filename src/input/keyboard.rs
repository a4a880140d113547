//! Shared-keyboard input: two cursors on one keyboard.
//!
//! The terminal delivers one key stream, so each player owns a disjoint key
//! cluster. A cursor is pure with respect to game state; it reads the
//! latest snapshot for ownership checks and emits [`Command`]s for the
//! arbiter to validate. Nothing here mutates pieces.

use crossterm::event::KeyCode;

use crate::core::command::Command;
use crate::core::snapshot::GameSnapshot;
use crate::types::{Cell, Side};

/// What a key press means to a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAction {
    Up,
    Down,
    Left,
    Right,
    /// Select the piece under the cursor, or send it to the cursor cell.
    Confirm,
    /// In-place jump for the piece under the cursor.
    Jump,
}

/// One player's key cluster.
#[derive(Debug, Clone, Copy)]
pub struct Keymap {
    up: KeyCode,
    down: KeyCode,
    left: KeyCode,
    right: KeyCode,
    confirm: KeyCode,
    jump: KeyCode,
}

impl Keymap {
    /// Arrow keys, Enter to confirm, `+` to jump.
    pub fn arrows() -> Self {
        Self {
            up: KeyCode::Up,
            down: KeyCode::Down,
            left: KeyCode::Left,
            right: KeyCode::Right,
            confirm: KeyCode::Enter,
            jump: KeyCode::Char('+'),
        }
    }

    /// WASD cluster, `f` to confirm, `g` to jump.
    pub fn wasd() -> Self {
        Self {
            up: KeyCode::Char('w'),
            down: KeyCode::Char('s'),
            left: KeyCode::Char('a'),
            right: KeyCode::Char('d'),
            confirm: KeyCode::Char('f'),
            jump: KeyCode::Char('g'),
        }
    }

    pub fn action(&self, code: KeyCode) -> Option<CursorAction> {
        // Letter keys match case-insensitively; shift state is noise.
        let code = match code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        if code == self.up {
            Some(CursorAction::Up)
        } else if code == self.down {
            Some(CursorAction::Down)
        } else if code == self.left {
            Some(CursorAction::Left)
        } else if code == self.right {
            Some(CursorAction::Right)
        } else if code == self.confirm {
            Some(CursorAction::Confirm)
        } else if code == self.jump {
            Some(CursorAction::Jump)
        } else {
            None
        }
    }
}

/// Board cursor plus selection state for one player.
#[derive(Debug, Clone)]
pub struct PlayerCursor {
    side: Side,
    keymap: Keymap,
    rows: i8,
    cols: i8,
    cursor: Cell,
    /// Selected piece id and the cell it was selected at.
    selected: Option<(String, Cell)>,
}

impl PlayerCursor {
    pub fn new(side: Side, keymap: Keymap, rows: i8, cols: i8, start: Cell) -> Self {
        Self {
            side,
            keymap,
            rows,
            cols,
            cursor: start,
            selected: None,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn cursor(&self) -> Cell {
        self.cursor
    }

    pub fn selected(&self) -> Option<&(String, Cell)> {
        self.selected.as_ref()
    }

    /// Own, grounded piece under the cursor. Travelling and airborne
    /// pieces cannot be grabbed.
    fn own_piece_at_cursor<'a>(&self, snapshot: &'a GameSnapshot) -> Option<&'a str> {
        snapshot
            .pieces_at(self.cursor)
            .find(|p| p.side == self.side.as_char() && !p.travelling)
            .map(|p| p.id.as_str())
    }

    /// Translate one key press into at most one command. Movement keys
    /// shift the cursor (clamped to the board); confirm selects then
    /// dispatches; jump targets the piece under the cursor directly.
    pub fn handle_key(
        &mut self,
        code: KeyCode,
        snapshot: &GameSnapshot,
        now: i64,
    ) -> Option<Command> {
        match self.keymap.action(code)? {
            CursorAction::Up => self.shift(-1, 0),
            CursorAction::Down => self.shift(1, 0),
            CursorAction::Left => self.shift(0, -1),
            CursorAction::Right => self.shift(0, 1),
            CursorAction::Confirm => return self.confirm(snapshot, now),
            CursorAction::Jump => {
                self.selected = None;
                let id = self.own_piece_at_cursor(snapshot)?.to_string();
                return Some(Command::jump(now, id, self.cursor));
            }
        }
        None
    }

    fn shift(&mut self, dr: i8, dc: i8) {
        let next = self.cursor.offset(dr, dc);
        if (0..self.rows).contains(&next.row) && (0..self.cols).contains(&next.col) {
            self.cursor = next;
        }
    }

    fn confirm(&mut self, snapshot: &GameSnapshot, now: i64) -> Option<Command> {
        match self.selected.take() {
            // Confirming the selected cell again just deselects.
            Some((_, src)) if src == self.cursor => None,
            Some((id, src)) => Some(Command::travel(now, id, src, self.cursor)),
            None => {
                let id = self.own_piece_at_cursor(snapshot)?.to_string();
                self.selected = Some((id, self.cursor));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::BoardGeometry;
    use crate::core::game::Game;
    use crate::core::library::PieceLibrary;
    use crate::types::{EventKind, PieceType};

    fn snapshot() -> GameSnapshot {
        let mut lib = PieceLibrary::new(BoardGeometry::standard()).unwrap();
        let pieces = vec![
            lib.create_piece(PieceType::King, Side::White, Cell::new(7, 4)),
            lib.create_piece(PieceType::King, Side::Black, Cell::new(0, 4)),
            lib.create_piece(PieceType::Rook, Side::White, Cell::new(4, 4)),
        ];
        let mut game = Game::new(BoardGeometry::standard(), pieces).unwrap();
        game.start(0);
        GameSnapshot::capture(&game, 0)
    }

    fn cursor_at(cell: Cell) -> PlayerCursor {
        PlayerCursor::new(Side::White, Keymap::arrows(), 8, 8, cell)
    }

    #[test]
    fn test_cursor_clamps_to_board() {
        let snap = snapshot();
        let mut c = cursor_at(Cell::new(0, 0));
        assert!(c.handle_key(KeyCode::Up, &snap, 0).is_none());
        assert!(c.handle_key(KeyCode::Left, &snap, 0).is_none());
        assert_eq!(c.cursor(), Cell::new(0, 0));
        c.handle_key(KeyCode::Down, &snap, 0);
        c.handle_key(KeyCode::Right, &snap, 0);
        assert_eq!(c.cursor(), Cell::new(1, 1));
    }

    #[test]
    fn test_select_then_confirm_emits_move() {
        let snap = snapshot();
        let mut c = cursor_at(Cell::new(4, 4));
        assert!(c.handle_key(KeyCode::Enter, &snap, 10).is_none());
        assert_eq!(c.selected().unwrap().0, "RW_1");

        c.handle_key(KeyCode::Up, &snap, 20);
        c.handle_key(KeyCode::Up, &snap, 20);
        let cmd = c.handle_key(KeyCode::Enter, &snap, 30).unwrap();
        assert_eq!(cmd.kind, EventKind::Move);
        assert_eq!(cmd.actor_id, "RW_1");
        assert_eq!(cmd.params, vec![Cell::new(4, 4), Cell::new(2, 4)]);
        assert!(c.selected().is_none());
    }

    #[test]
    fn test_confirm_on_enemy_piece_selects_nothing() {
        let snap = snapshot();
        let mut c = cursor_at(Cell::new(0, 4)); // black king's cell
        assert!(c.handle_key(KeyCode::Enter, &snap, 0).is_none());
        assert!(c.selected().is_none());
    }

    #[test]
    fn test_reconfirming_same_cell_deselects() {
        let snap = snapshot();
        let mut c = cursor_at(Cell::new(4, 4));
        c.handle_key(KeyCode::Enter, &snap, 0);
        assert!(c.selected().is_some());
        assert!(c.handle_key(KeyCode::Enter, &snap, 1).is_none());
        assert!(c.selected().is_none());
    }

    #[test]
    fn test_jump_key_targets_piece_under_cursor() {
        let snap = snapshot();
        let mut c = cursor_at(Cell::new(4, 4));
        let cmd = c.handle_key(KeyCode::Char('+'), &snap, 40).unwrap();
        assert_eq!(cmd.kind, EventKind::Jump);
        assert_eq!(cmd.actor_id, "RW_1");
        assert_eq!(cmd.params, vec![Cell::new(4, 4)]);
    }

    #[test]
    fn test_wasd_cluster_is_case_insensitive() {
        let snap = snapshot();
        let mut c = PlayerCursor::new(Side::Black, Keymap::wasd(), 8, 8, Cell::new(3, 3));
        c.handle_key(KeyCode::Char('S'), &snap, 0);
        assert_eq!(c.cursor(), Cell::new(4, 3));
        assert!(Keymap::wasd().action(KeyCode::Enter).is_none());
    }
}
