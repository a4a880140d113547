//! The arbiter: owns every piece, the intake queue, the position index,
//! the legality pipeline, collision resolution, and win detection.
//!
//! Concurrency model: external producers (keyboard, network adapter) only
//! ever push [`Command`]s into a multi-producer channel; the single-threaded
//! tick loop drains it and is the sole mutator of piece state. Time is
//! injected (`now` in game milliseconds), so the whole engine is
//! deterministic under test.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Instant;

use thiserror::Error;

use crate::core::board::BoardGeometry;
use crate::core::command::Command;
use crate::core::moves::MoveFlags;
use crate::core::piece::Piece;
use crate::types::{Cell, EventKind, PieceType, Side};

/// Cloneable handle producers use to enqueue commands.
pub type CommandSink = Sender<Command>;

/// Wall-clock source for the runner binary; tests call [`Game::tick`]
/// with explicit times instead.
#[derive(Debug)]
pub struct GameClock {
    start: Instant,
}

impl GameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("two pieces share starting cell {0}")]
    DuplicateCell(Cell),
    #[error("no king for {0}")]
    MissingKing(Side),
}

/// Final result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Side),
    /// Both kings fell in the same tick.
    Draw,
}

/// Why a command was not committed. Cooldown and unknown-actor drops leave
/// the mover untouched; the others force a defensive idle reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    UnknownActor,
    InternalKind,
    OnCooldown,
    MissingParams,
    NoTransition,
    IllegalDestination,
    PathBlocked,
    FriendlyOccupied,
}

impl Rejection {
    fn forces_idle_reset(self) -> bool {
        matches!(
            self,
            Rejection::NoTransition
                | Rejection::IllegalDestination
                | Rejection::PathBlocked
                | Rejection::FriendlyOccupied
        )
    }
}

/// Start-of-drain occupancy snapshot. Commands drained in one tick are all
/// judged against this snapshot and never observe each other's effects.
struct OccupancySnapshot {
    /// Cell -> index of an occupant (last writer in piece order).
    by_cell: HashMap<Cell, usize>,
    /// Cells occupied by a movement blocker (pieces at rest).
    blockers: HashSet<Cell>,
}

pub struct Game {
    geometry: BoardGeometry,
    pieces: Vec<Piece>,
    by_id: HashMap<String, usize>,
    intake_tx: Sender<Command>,
    intake_rx: Receiver<Command>,
    /// Derived, rebuilt every tick; never authoritative.
    position_index: HashMap<Cell, Vec<usize>>,
    outcome: Option<Outcome>,
}

impl Game {
    /// Validates the startup invariant: no shared cells, one king per side.
    pub fn new(geometry: BoardGeometry, pieces: Vec<Piece>) -> Result<Self, GameError> {
        let mut seen = HashSet::new();
        let mut has_king = (false, false);
        for p in &pieces {
            let cell = p.current_cell();
            if !seen.insert(cell) {
                return Err(GameError::DuplicateCell(cell));
            }
            if p.is_king() {
                match p.side() {
                    Side::White => has_king.0 = true,
                    Side::Black => has_king.1 = true,
                }
            }
        }
        if !has_king.0 {
            return Err(GameError::MissingKing(Side::White));
        }
        if !has_king.1 {
            return Err(GameError::MissingKing(Side::Black));
        }

        let by_id = pieces
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id().to_string(), i))
            .collect();
        let (intake_tx, intake_rx) = channel();
        Ok(Self {
            geometry,
            pieces,
            by_id,
            intake_tx,
            intake_rx,
            position_index: HashMap::new(),
            outcome: None,
        })
    }

    pub fn geometry(&self) -> BoardGeometry {
        self.geometry
    }

    /// Handle for producers. The queue is the only shared mutable surface.
    pub fn command_sink(&self) -> CommandSink {
        self.intake_tx.clone()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, id: &str) -> Option<&Piece> {
        self.by_id.get(id).map(|&i| &self.pieces[i])
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Pieces occupying `cell` per the last completed tick's index.
    pub fn pieces_at(&self, cell: Cell) -> impl Iterator<Item = &Piece> + '_ {
        self.position_index
            .get(&cell)
            .into_iter()
            .flatten()
            .map(move |&i| &self.pieces[i])
    }

    /// Reset every piece to an idle hold at game start.
    pub fn start(&mut self, start_ms: i64) {
        for p in &mut self.pieces {
            p.reset(start_ms);
        }
        self.rebuild_position_index();
    }

    /// One arbiter tick: advance, drain, reindex, resolve, win-check.
    pub fn tick(&mut self, now: i64) -> Option<Outcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }

        // 1. Advance all motion; completions feed the FSMs internally.
        for p in &mut self.pieces {
            p.update(now);
        }

        // 2. Drain the queue in FIFO order against a fixed snapshot.
        let snapshot = self.occupancy_snapshot();
        while let Ok(cmd) = self.intake_rx.try_recv() {
            self.process_command(&cmd, &snapshot, now);
        }

        // 3. Rebuild the derived position index.
        self.rebuild_position_index();

        // 4. Resolve same-cell collisions.
        self.resolve_collisions();

        // 5. Win detection.
        self.outcome = self.check_win();
        self.outcome
    }

    fn occupancy_snapshot(&self) -> OccupancySnapshot {
        let mut by_cell = HashMap::new();
        let mut blockers = HashSet::new();
        for (i, p) in self.pieces.iter().enumerate() {
            let cell = p.current_cell();
            by_cell.insert(cell, i);
            if p.flags().is_movement_blocker {
                blockers.insert(cell);
            }
        }
        OccupancySnapshot { by_cell, blockers }
    }

    fn process_command(&mut self, cmd: &Command, snapshot: &OccupancySnapshot, now: i64) {
        match self.validate_command(cmd, snapshot, now) {
            Ok(committed) => {
                let mover = self.by_id[committed.actor_id.as_str()];
                self.pieces[mover].on_command(&committed, now);
                tracing::debug!(actor = %committed.actor_id, kind = committed.kind.as_str(), "command committed");
            }
            Err(rejection) => {
                tracing::info!(
                    actor = %cmd.actor_id,
                    kind = cmd.kind.as_str(),
                    ?rejection,
                    "command rejected"
                );
                if rejection.forces_idle_reset() {
                    if let Some(&idx) = self.by_id.get(cmd.actor_id.as_str()) {
                        self.pieces[idx].force_idle(now);
                    }
                }
            }
        }
    }

    /// The legality pipeline. On success returns the normalized command to
    /// commit: the mover's authoritative current cell as source, the
    /// requested destination last, stamped with the tick time. Producer
    /// timestamps are advisory; committing with a stale one would
    /// back-date the trajectory.
    fn validate_command(
        &self,
        cmd: &Command,
        snapshot: &OccupancySnapshot,
        now: i64,
    ) -> Result<Command, Rejection> {
        let &mover_idx = self
            .by_id
            .get(cmd.actor_id.as_str())
            .ok_or(Rejection::UnknownActor)?;
        let mover = &self.pieces[mover_idx];

        // Arrived is produced by the motion engine only.
        if cmd.kind == EventKind::Arrived {
            return Err(Rejection::InternalKind);
        }

        if !mover.can_transition(now) {
            return Err(Rejection::OnCooldown);
        }

        let src = mover.current_cell();

        if cmd.kind == EventKind::Idle {
            return Ok(Command::idle(now, cmd.actor_id.clone(), src));
        }

        let dst = cmd.dest().ok_or(Rejection::MissingParams)?;
        if !self.geometry.contains(dst) {
            return Err(Rejection::IllegalDestination);
        }

        // Occupant at the destination, ignoring the mover itself so an
        // in-place jump is not "friendly occupancy".
        let occupant = snapshot
            .by_cell
            .get(&dst)
            .copied()
            .filter(|&i| i != mover_idx)
            .map(|i| &self.pieces[i]);
        if occupant.is_some_and(|o| o.side() == mover.side()) {
            return Err(Rejection::FriendlyOccupied);
        }

        if cmd.kind == EventKind::Jump {
            // A jump is an in-place dodge; it bypasses the move table and
            // path clearance but may not relocate the piece.
            if dst != src {
                return Err(Rejection::IllegalDestination);
            }
            if mover.graph().candidate(EventKind::Jump).is_none() {
                return Err(Rejection::NoTransition);
            }
            return Ok(Command::jump(now, cmd.actor_id.clone(), src));
        }

        // Move: table lookup on the candidate destination state.
        let candidate = mover
            .graph()
            .candidate(EventKind::Move)
            .ok_or(Rejection::NoTransition)?;
        let flags = if occupant.is_some() {
            MoveFlags::capture_only()
        } else {
            MoveFlags::non_capture_only()
        }
        .with_first(mover.state().name.is_first_action());
        if !candidate.moves.permits(src, dst, flags, &self.geometry) {
            return Err(Rejection::IllegalDestination);
        }

        // Pawn refinement: forward must stay on the file toward an empty
        // cell, captures must be diagonal onto an enemy. The table tags
        // already encode this; matched explicitly so a loose rule file
        // cannot widen pawn behavior.
        if mover.piece_type() == PieceType::Pawn {
            let (dr, dc) = src.delta_to(dst);
            let fwd = mover.side().forward();
            let forward = dc == 0 && (dr == fwd || dr == 2 * fwd);
            let diagonal = dr == fwd && dc.abs() == 1;
            let ok = if forward {
                occupant.is_none()
            } else if diagonal {
                occupant.is_some_and(|o| o.side() != mover.side())
            } else {
                false
            };
            if !ok {
                return Err(Rejection::IllegalDestination);
            }
        }

        if mover.piece_type().needs_clear_path() && !self.path_is_clear(src, dst, snapshot) {
            return Err(Rejection::PathBlocked);
        }

        Ok(Command::travel(now, cmd.actor_id.clone(), src, dst))
    }

    /// Walk unit steps from `src` to `dst`, exclusive of both ends, and
    /// fail on any movement blocker.
    fn path_is_clear(&self, src: Cell, dst: Cell, snapshot: &OccupancySnapshot) -> bool {
        let (dr, dc) = src.delta_to(dst);
        let steps = dr.abs().max(dc.abs());
        if steps <= 1 {
            return true;
        }
        let step_r = dr.signum();
        let step_c = dc.signum();
        let mut cell = src.offset(step_r, step_c);
        while cell != dst {
            if snapshot.blockers.contains(&cell) {
                return false;
            }
            cell = cell.offset(step_r, step_c);
        }
        true
    }

    fn rebuild_position_index(&mut self) {
        self.position_index.clear();
        for (i, p) in self.pieces.iter().enumerate() {
            self.position_index.entry(p.current_cell()).or_default().push(i);
        }
    }

    /// For every coincident group the piece whose action started latest
    /// survives (ties broken by greatest id, deterministically); all other
    /// capture-eligible members are removed.
    fn resolve_collisions(&mut self) {
        let mut removed: HashSet<usize> = HashSet::new();
        for group in self.position_index.values() {
            if group.len() < 2 {
                continue;
            }
            let key = |i: usize| (self.pieces[i].action_start_ms(), self.pieces[i].id());
            let winner = *group
                .iter()
                .max_by(|&&a, &&b| key(a).cmp(&key(b)))
                .unwrap();
            for &i in group {
                if i != winner && self.pieces[i].flags().can_be_captured {
                    removed.insert(i);
                }
            }
        }
        if removed.is_empty() {
            return;
        }

        for &i in &removed {
            tracing::info!(piece = %self.pieces[i].id(), cell = %self.pieces[i].current_cell(), "captured");
        }
        let mut idx = 0;
        self.pieces.retain(|_| {
            let keep = !removed.contains(&idx);
            idx += 1;
            keep
        });
        self.by_id = self
            .pieces
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id().to_string(), i))
            .collect();
        self.rebuild_position_index();
    }

    fn check_win(&self) -> Option<Outcome> {
        let mut kings = (0u32, 0u32);
        for p in self.pieces.iter().filter(|p| p.is_king()) {
            match p.side() {
                Side::White => kings.0 += 1,
                Side::Black => kings.1 += 1,
            }
        }
        match kings {
            (0, 0) => Some(Outcome::Draw),
            (0, _) => Some(Outcome::Winner(Side::Black)),
            (_, 0) => Some(Outcome::Winner(Side::White)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::PieceLibrary;

    fn library() -> PieceLibrary {
        PieceLibrary::new(BoardGeometry::standard()).unwrap()
    }

    fn game_with(pieces: Vec<Piece>) -> Game {
        let mut game = Game::new(BoardGeometry::standard(), pieces).unwrap();
        game.start(0);
        game
    }

    fn kings(lib: &mut PieceLibrary) -> Vec<Piece> {
        vec![
            lib.create_piece(PieceType::King, Side::White, Cell::new(7, 4)),
            lib.create_piece(PieceType::King, Side::Black, Cell::new(0, 4)),
        ]
    }

    #[test]
    fn test_duplicate_cell_is_fatal_at_construction() {
        let mut lib = library();
        let pieces = vec![
            lib.create_piece(PieceType::King, Side::White, Cell::new(0, 0)),
            lib.create_piece(PieceType::King, Side::Black, Cell::new(0, 0)),
        ];
        assert!(matches!(
            Game::new(BoardGeometry::standard(), pieces),
            Err(GameError::DuplicateCell(_))
        ));
    }

    #[test]
    fn test_missing_king_is_fatal_at_construction() {
        let mut lib = library();
        let pieces = vec![
            lib.create_piece(PieceType::King, Side::White, Cell::new(7, 4)),
            lib.create_piece(PieceType::Queen, Side::Black, Cell::new(0, 3)),
        ];
        assert!(matches!(
            Game::new(BoardGeometry::standard(), pieces),
            Err(GameError::MissingKing(Side::Black))
        ));
    }

    #[test]
    fn test_unknown_actor_is_dropped() {
        let mut lib = library();
        let mut game = game_with(kings(&mut lib));
        game.command_sink()
            .send(Command::travel(10, "ghost", Cell::new(4, 4), Cell::new(4, 5)))
            .unwrap();
        assert!(game.tick(10).is_none());
        assert_eq!(game.pieces().len(), 2);
    }

    #[test]
    fn test_legal_move_starts_travel() {
        let mut lib = library();
        let mut pieces = kings(&mut lib);
        pieces.push(lib.create_piece(PieceType::Rook, Side::White, Cell::new(7, 0)));
        let mut game = game_with(pieces);

        game.command_sink()
            .send(Command::travel(16, "RW_1", Cell::new(7, 0), Cell::new(4, 0)))
            .unwrap();
        game.tick(16);
        let rook = game.piece("RW_1").unwrap();
        assert!(rook.is_travelling());

        // 3 cells at 1 m/s; 1.6 m in, the derived cell rounds to row 5.
        game.tick(16 + 1600);
        assert_eq!(game.piece("RW_1").unwrap().current_cell(), Cell::new(5, 0));
    }

    #[test]
    fn test_friendly_destination_is_rejected() {
        let mut lib = library();
        let mut pieces = kings(&mut lib);
        pieces.push(lib.create_piece(PieceType::Rook, Side::White, Cell::new(7, 0)));
        pieces.push(lib.create_piece(PieceType::Knight, Side::White, Cell::new(4, 0)));
        let mut game = game_with(pieces);

        game.command_sink()
            .send(Command::travel(16, "RW_1", Cell::new(7, 0), Cell::new(4, 0)))
            .unwrap();
        game.tick(16);
        assert!(!game.piece("RW_1").unwrap().is_travelling());
        assert_eq!(game.piece("RW_1").unwrap().current_cell(), Cell::new(7, 0));
    }

    #[test]
    fn test_commands_in_one_tick_see_start_of_tick_occupancy() {
        // Second command targets the cell the first mover is leaving; the
        // snapshot policy means it still sees the cell as occupied.
        let mut lib = library();
        let mut pieces = kings(&mut lib);
        pieces.push(lib.create_piece(PieceType::Rook, Side::White, Cell::new(4, 0)));
        pieces.push(lib.create_piece(PieceType::Rook, Side::White, Cell::new(4, 7)));
        let mut game = game_with(pieces);

        let sink = game.command_sink();
        sink.send(Command::travel(16, "RW_1", Cell::new(4, 0), Cell::new(2, 0)))
            .unwrap();
        // RW_2 tries to slide through RW_1's (still-snapshotted) cell.
        sink.send(Command::travel(16, "RW_2", Cell::new(4, 7), Cell::new(4, 0)))
            .unwrap();
        game.tick(16);

        assert!(game.piece("RW_1").unwrap().is_travelling());
        assert!(
            !game.piece("RW_2").unwrap().is_travelling(),
            "friendly occupancy is judged against the start-of-tick snapshot"
        );
    }

    #[test]
    fn test_jump_must_target_own_cell() {
        let mut lib = library();
        let mut game = game_with(kings(&mut lib));
        let sink = game.command_sink();

        sink.send(Command::new(
            16,
            "KW_1",
            EventKind::Jump,
            vec![Cell::new(6, 4)],
        ))
        .unwrap();
        game.tick(16);
        assert_eq!(game.piece("KW_1").unwrap().current_cell(), Cell::new(7, 4));
        assert!(game.piece("KW_1").unwrap().can_transition(17));

        sink.send(Command::jump(32, "KW_1", Cell::new(7, 4))).unwrap();
        game.tick(32);
        assert!(!game.piece("KW_1").unwrap().flags().can_be_captured);
    }

    #[test]
    fn test_cooldown_command_leaves_state_untouched() {
        let mut lib = library();
        let mut pieces = kings(&mut lib);
        pieces.push(lib.create_piece(PieceType::Rook, Side::White, Cell::new(5, 5)));
        let mut game = game_with(pieces);
        let sink = game.command_sink();

        sink.send(Command::travel(16, "RW_1", Cell::new(5, 5), Cell::new(5, 6)))
            .unwrap();
        game.tick(16);
        // Arrival at ~1016ms, then a 6s rest.
        game.tick(1100);
        let before = game.piece("RW_1").unwrap().motion_start_ms();
        assert!(!game.piece("RW_1").unwrap().can_transition(1200));

        sink.send(Command::travel(1300, "RW_1", Cell::new(5, 6), Cell::new(5, 7)))
            .unwrap();
        game.tick(1300);
        let rook = game.piece("RW_1").unwrap();
        assert_eq!(rook.current_cell(), Cell::new(5, 6));
        assert_eq!(rook.motion_start_ms(), before, "rest timer unchanged");
        assert!(!rook.is_travelling());
    }
}
