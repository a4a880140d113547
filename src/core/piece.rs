//! A piece: identity tags plus its live state machine.

use crate::core::board::{PosM, PosPix};
use crate::core::command::Command;
use crate::core::motion::CapabilityFlags;
use crate::core::state::{StateGraph, StateNode};
use crate::types::{Cell, PieceType, Side};

/// Identity + current-state holder. Exactly one state is active at any
/// time; transitions happen atomically inside a tick.
#[derive(Debug, Clone)]
pub struct Piece {
    id: String,
    piece_type: PieceType,
    side: Side,
    graph: StateGraph,
}

impl Piece {
    pub fn new(id: String, piece_type: PieceType, side: Side, graph: StateGraph) -> Self {
        Self {
            id,
            piece_type,
            side,
            graph,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn piece_type(&self) -> PieceType {
        self.piece_type
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn state(&self) -> &StateNode {
        self.graph.current()
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    /// Force an idle hold at the piece's current cell.
    pub fn reset(&mut self, start_ms: i64) {
        let cell = self.current_cell();
        self.graph
            .on_event(&Command::idle(start_ms, self.id.clone(), cell), start_ms);
    }

    /// Advance motion; completion events are routed through the state
    /// machine internally.
    pub fn update(&mut self, now: i64) {
        self.graph.update(now);
    }

    /// Apply an externally validated command.
    pub fn on_command(&mut self, cmd: &Command, now: i64) {
        self.graph.on_event(cmd, now);
    }

    /// Defensive idle reset after a rejected command.
    pub fn force_idle(&mut self, now: i64) {
        self.graph.force_idle(now);
    }

    pub fn can_transition(&self, now: i64) -> bool {
        self.graph.can_transition(now)
    }

    pub fn cooldown_remaining_ms(&self, now: i64) -> i64 {
        self.graph.cooldown_remaining_ms(now)
    }

    /// Board cell derived from the motion's continuous position.
    /// Pure read; safe to call concurrently with rendering.
    pub fn current_cell(&self) -> Cell {
        self.graph.motion().current_cell()
    }

    pub fn pos_m(&self) -> PosM {
        self.graph.motion().pos_m()
    }

    pub fn pos_pix(&self) -> PosPix {
        self.graph.motion().pos_pix()
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.graph.motion().flags()
    }

    pub fn motion_start_ms(&self) -> i64 {
        self.graph.motion().start_ms()
    }

    /// When the current action began; collision precedence key.
    pub fn action_start_ms(&self) -> i64 {
        self.graph.motion().action_start_ms()
    }

    pub fn is_travelling(&self) -> bool {
        self.graph.motion().is_travelling()
    }

    pub fn is_king(&self) -> bool {
        self.piece_type == PieceType::King
    }
}
