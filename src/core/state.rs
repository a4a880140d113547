//! Per-piece finite-state machine.
//!
//! State graphs are built once per piece type as a [`GraphTemplate`] and
//! instantiated per piece: instantiation copies the node arena and creates
//! one fresh [`Motion`] shared by every node of that instance. Transitions
//! are `EventKind -> NodeId` over a closed event enum, so a typo'd event
//! cannot silently fall through to the missing-transition path.

use std::sync::Arc;

use crate::core::board::BoardGeometry;
use crate::core::command::Command;
use crate::core::motion::{Motion, MotionProfile};
use crate::core::moves::Moves;
use crate::types::{Cell, EventKind, LONG_REST_MS, SHORT_REST_MS};

/// Stable handle into a graph's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Closed set of node roles. The role decides the rest length owed after
/// an action completes and whether first-move offsets are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateName {
    Idle,
    /// Pawn before its first action; unlocks `1st`-tagged offsets.
    FirstIdle,
    Moving,
    /// Pawn's one-time double-step travel; arrives into the same rest as a
    /// plain move but never returns to `FirstIdle`.
    FirstMoving,
    Jumping,
    LongRest,
    ShortRest,
}

impl StateName {
    /// Rest owed after this state's action completes.
    fn rest_after_ms(self) -> i64 {
        match self {
            StateName::Moving | StateName::FirstMoving => LONG_REST_MS,
            StateName::Jumping => SHORT_REST_MS,
            StateName::Idle | StateName::FirstIdle | StateName::LongRest | StateName::ShortRest => 0,
        }
    }

    /// Whether `1st`-tagged offsets are legal from this state.
    pub fn is_first_action(self) -> bool {
        matches!(self, StateName::FirstIdle)
    }
}

/// Transition table over the closed event set.
#[derive(Debug, Clone, Copy, Default)]
struct TransitionMap {
    slots: [Option<NodeId>; 4],
}

impl TransitionMap {
    fn slot(kind: EventKind) -> usize {
        match kind {
            EventKind::Idle => 0,
            EventKind::Move => 1,
            EventKind::Jump => 2,
            EventKind::Arrived => 3,
        }
    }

    fn get(&self, kind: EventKind) -> Option<NodeId> {
        self.slots[Self::slot(kind)]
    }

    fn set(&mut self, kind: EventKind, target: NodeId) {
        self.slots[Self::slot(kind)] = Some(target);
    }
}

/// One FSM node: a moves table, a motion profile, transitions, and a
/// cooldown deadline (mutable per instance).
#[derive(Debug, Clone)]
pub struct StateNode {
    pub name: StateName,
    pub moves: Arc<Moves>,
    pub profile: MotionProfile,
    transitions: TransitionMap,
    cooldown_end_ms: i64,
}

/// Immutable per-piece-type blueprint.
#[derive(Debug, Clone)]
pub struct GraphTemplate {
    nodes: Vec<StateNode>,
    entry: NodeId,
}

/// Builder used by the piece library to wire a template.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<StateNode>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: StateName, moves: Arc<Moves>, profile: MotionProfile) -> NodeId {
        self.nodes.push(StateNode {
            name,
            moves,
            profile,
            transitions: TransitionMap::default(),
            cooldown_end_ms: 0,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn set_transition(&mut self, from: NodeId, event: EventKind, to: NodeId) {
        self.nodes[from.0].transitions.set(event, to);
    }

    pub fn build(self, entry: NodeId) -> GraphTemplate {
        assert!(entry.0 < self.nodes.len(), "entry node out of range");
        GraphTemplate {
            nodes: self.nodes,
            entry,
        }
    }
}

impl GraphTemplate {
    /// Clone the arena for one piece instance with a fresh motion holding
    /// at `cell`. Transitions are arena indices, so the clones reference
    /// only sibling clones by construction.
    pub fn instantiate(&self, geometry: BoardGeometry, cell: Cell) -> StateGraph {
        StateGraph {
            nodes: self.nodes.clone(),
            motion: Motion::new(geometry, cell),
            current: self.entry,
        }
    }
}

/// A live per-piece state machine: cloned nodes plus the piece's single
/// motion instance and its active node.
#[derive(Debug, Clone)]
pub struct StateGraph {
    nodes: Vec<StateNode>,
    motion: Motion,
    current: NodeId,
}

impl StateGraph {
    pub fn current(&self) -> &StateNode {
        &self.nodes[self.current.0]
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn can_transition(&self, now: i64) -> bool {
        now >= self.current().cooldown_end_ms
    }

    pub fn cooldown_remaining_ms(&self, now: i64) -> i64 {
        (self.current().cooldown_end_ms - now).max(0)
    }

    /// Candidate node an external `event` would transition into, if wired.
    /// The legality pipeline evaluates the candidate's moves table.
    pub fn candidate(&self, event: EventKind) -> Option<&StateNode> {
        self.current()
            .transitions
            .get(event)
            .map(|id| &self.nodes[id.0])
    }

    /// Advance motion; a completion event is fed straight back through the
    /// transition machinery.
    pub fn update(&mut self, now: i64) {
        if let Some(done) = self.motion.update(now) {
            self.on_event(&done, now);
        }
    }

    /// Apply an event to the active node.
    ///
    /// A command that lands while the cooldown deadline has not passed
    /// leaves both the node and the motion untouched; the arbiter rejects
    /// such commands upstream and this branch only guards direct callers.
    pub fn on_event(&mut self, cmd: &Command, now: i64) {
        if !self.can_transition(now) {
            tracing::debug!(
                kind = cmd.kind.as_str(),
                state = ?self.current().name,
                "event during cooldown ignored"
            );
            return;
        }

        let Some(next) = self.current().transitions.get(cmd.kind) else {
            // Indicates a malformed rule graph; non-fatal.
            tracing::warn!(
                kind = cmd.kind.as_str(),
                state = ?self.current().name,
                "no transition for event; staying put"
            );
            return;
        };

        if cmd.kind == EventKind::Arrived {
            // Rest length is keyed by the action that just finished. The
            // rest timer starts at the exact arrival instant carried by the
            // event, so a late tick does not stretch the cooldown.
            let rest_ms = self.current().name.rest_after_ms();
            let cell = cmd.dest().unwrap_or(self.motion.current_cell());
            if rest_ms > 0 {
                let flags = self.nodes[next.0].profile.flags;
                self.motion.reset_rest(cell, cmd.timestamp, rest_ms, flags);
                self.nodes[next.0].cooldown_end_ms = cmd.timestamp + rest_ms;
            } else {
                self.nodes[next.0].cooldown_end_ms = 0;
                self.motion.rearm_internal(self.nodes[next.0].profile, cmd);
            }
        } else {
            // Externally issued event: arming the destination's motion is
            // what starts the travel or jump.
            self.motion.reset(self.nodes[next.0].profile, cmd);
        }
        self.current = next;
    }

    /// Defensive reset after a rejected command: re-arm the current motion
    /// as an idle hold at the derived cell, clearing stale in-flight
    /// parameters. A committed motion (travel or an uncompleted timed hold)
    /// is never preempted; its pending completion still drives the node
    /// forward.
    pub fn force_idle(&mut self, now: i64) {
        if self.motion.completion_pending() {
            return;
        }
        if self.current().cooldown_end_ms > now {
            return;
        }
        let cell = self.motion.current_cell();
        self.motion
            .rearm_internal(MotionProfile::idle(), &Command::idle(now, "", cell));
    }
}
