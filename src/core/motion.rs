//! Kinematic motion engine: position as a pure function of time.
//!
//! Exactly one [`Motion`] instance exists per live piece and is re-armed
//! whenever the piece's state machine transitions. Three modes:
//!
//! - **Static-Hold**: fixed at a cell, never completes (idle).
//! - **Timed-Hold**: fixed at a cell, emits one completion after a
//!   configured duration (jumps and post-action rests).
//! - **Linear-Travel**: straight line from source to destination at a
//!   configured speed, emits one completion on arrival.
//!
//! Completion events are an idempotent one-shot: `update` may be called any
//! number of times at or past the deadline and the event is emitted exactly
//! once. Position itself carries no hidden counters; calling `update` twice
//! with the same `now` yields the same position.

use crate::core::board::{BoardGeometry, PosM, PosPix};
use crate::core::command::Command;
use crate::types::Cell;

/// Capability flags consumed by the arbiter's collision and path logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityFlags {
    /// May be removed by collision resolution right now.
    pub can_be_captured: bool,
    /// May win a collision right now (false while resting or idle).
    pub can_capture: bool,
    /// Occupies its cell for sliding-piece path clearance.
    pub is_movement_blocker: bool,
}

/// Mode selector plus per-state parameters; lives on state templates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionKind {
    Hold,
    TimedHold { duration_ms: i64 },
    Travel { speed_m_s: f64 },
}

/// A motion configuration bound to one FSM state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    pub kind: MotionKind,
    pub flags: CapabilityFlags,
}

impl MotionProfile {
    /// Plain idle: fixed, blocks paths, cannot initiate a capture.
    pub fn idle() -> Self {
        Self {
            kind: MotionKind::Hold,
            flags: CapabilityFlags {
                can_be_captured: true,
                can_capture: false,
                is_movement_blocker: true,
            },
        }
    }

    /// Straight-line travel; a traveller can capture and be captured but
    /// does not block sliding paths.
    pub fn travel(speed_m_s: f64) -> Self {
        Self {
            kind: MotionKind::Travel { speed_m_s },
            flags: CapabilityFlags {
                can_be_captured: true,
                can_capture: true,
                is_movement_blocker: false,
            },
        }
    }

    /// Airborne in-place jump: briefly untouchable.
    pub fn jump(duration_ms: i64) -> Self {
        Self {
            kind: MotionKind::TimedHold { duration_ms },
            flags: CapabilityFlags {
                can_be_captured: false,
                can_capture: true,
                is_movement_blocker: false,
            },
        }
    }

    /// Post-action rest: a sitting duck that cannot capture.
    pub fn rest(duration_ms: i64) -> Self {
        Self {
            kind: MotionKind::TimedHold { duration_ms },
            flags: CapabilityFlags {
                can_be_captured: true,
                can_capture: false,
                is_movement_blocker: true,
            },
        }
    }
}

/// Mutable per-piece motion record.
#[derive(Debug, Clone)]
pub struct Motion {
    geometry: BoardGeometry,
    kind: MotionKind,
    flags: CapabilityFlags,
    start_cell: Cell,
    dest_cell: Cell,
    start_ms: i64,
    /// When the piece's current action (move or jump) began. Unlike
    /// `start_ms` this survives the internal transition into rest, so
    /// collision precedence reflects who acted last, not whose rest timer
    /// restarted last.
    action_start_ms: i64,
    /// Travel: derived from distance and speed. Timed-Hold: configured.
    duration_ms: i64,
    /// Unit direction in metres (zero for holds and degenerate travel).
    dir: PosM,
    speed_m_s: f64,
    pos_m: PosM,
    /// One-shot completion latch.
    completed: bool,
}

impl Motion {
    /// Fresh motion holding at `cell` from time zero.
    pub fn new(geometry: BoardGeometry, cell: Cell) -> Self {
        let profile = MotionProfile::idle();
        Self {
            geometry,
            kind: profile.kind,
            flags: profile.flags,
            start_cell: cell,
            dest_cell: cell,
            start_ms: 0,
            action_start_ms: 0,
            duration_ms: 0,
            dir: (0.0, 0.0),
            speed_m_s: 0.0,
            pos_m: geometry.cell_to_m(cell),
            completed: false,
        }
    }

    /// Re-arm for `profile` using the command's timestamp and cells.
    ///
    /// Holds take their cell from the command's first param (falling back
    /// to the current cell for param-less idles); travel reads source and
    /// destination from the first and last params.
    pub fn reset(&mut self, profile: MotionProfile, cmd: &Command) {
        self.kind = profile.kind;
        self.flags = profile.flags;
        self.start_ms = cmd.timestamp;
        self.action_start_ms = cmd.timestamp;
        self.completed = false;

        match profile.kind {
            MotionKind::Hold => {
                let cell = cmd.params.first().copied().unwrap_or(self.current_cell());
                self.place(cell);
                self.duration_ms = 0;
            }
            MotionKind::TimedHold { duration_ms } => {
                let cell = cmd.params.first().copied().unwrap_or(self.current_cell());
                self.place(cell);
                self.duration_ms = duration_ms;
            }
            MotionKind::Travel { speed_m_s } => {
                let src = cmd.params.first().copied().unwrap_or(self.current_cell());
                let dst = cmd.params.last().copied().unwrap_or(src);
                self.start_cell = src;
                self.dest_cell = dst;
                self.pos_m = self.geometry.cell_to_m(src);
                self.speed_m_s = speed_m_s;

                let (sx, sy) = self.geometry.cell_to_m(src);
                let (dx, dy) = self.geometry.cell_to_m(dst);
                let (vx, vy) = (dx - sx, dy - sy);
                let dist = vx.hypot(vy);
                if dist > 0.0 && speed_m_s > 0.0 {
                    self.dir = (vx / dist, vy / dist);
                    self.duration_ms = (dist / speed_m_s * 1000.0).round() as i64;
                } else {
                    self.dir = (0.0, 0.0);
                    self.duration_ms = 0;
                }
            }
        }
    }

    /// Re-arm for an internal transition, keeping the action start time.
    pub fn rearm_internal(&mut self, profile: MotionProfile, cmd: &Command) {
        let action_start = self.action_start_ms;
        self.reset(profile, cmd);
        self.action_start_ms = action_start;
    }

    /// Arm as a rest timer at `cell`, starting at `now` for `duration_ms`.
    /// Used when a completion event transitions into a rest state whose
    /// length depends on the just-finished action. The action start time
    /// is preserved.
    pub fn reset_rest(&mut self, cell: Cell, now: i64, duration_ms: i64, flags: CapabilityFlags) {
        self.kind = MotionKind::TimedHold { duration_ms };
        self.flags = flags;
        self.place(cell);
        self.start_ms = now;
        self.duration_ms = duration_ms;
        self.completed = false;
    }

    fn place(&mut self, cell: Cell) {
        self.start_cell = cell;
        self.dest_cell = cell;
        self.pos_m = self.geometry.cell_to_m(cell);
        self.dir = (0.0, 0.0);
    }

    /// Advance to `now`; returns the completion event exactly once.
    pub fn update(&mut self, now: i64) -> Option<Command> {
        match self.kind {
            MotionKind::Hold => None,
            MotionKind::TimedHold { .. } => {
                if self.completed || now - self.start_ms < self.duration_ms {
                    return None;
                }
                self.completed = true;
                // Stamped with the exact deadline, not the tick time, so
                // downstream ordering does not depend on tick phasing.
                Some(Command::arrived(self.start_ms + self.duration_ms, self.dest_cell))
            }
            MotionKind::Travel { speed_m_s } => {
                let elapsed_ms = (now - self.start_ms).max(0);
                if elapsed_ms >= self.duration_ms {
                    // Never overshoot: land on the destination point exactly.
                    self.pos_m = self.geometry.cell_to_m(self.dest_cell);
                    if self.completed {
                        return None;
                    }
                    self.completed = true;
                    return Some(Command::arrived(self.start_ms + self.duration_ms, self.dest_cell));
                }
                let travelled = speed_m_s * (elapsed_ms as f64 / 1000.0);
                let (sx, sy) = self.geometry.cell_to_m(self.start_cell);
                self.pos_m = (sx + self.dir.0 * travelled, sy + self.dir.1 * travelled);
                None
            }
        }
    }

    pub fn pos_m(&self) -> PosM {
        self.pos_m
    }

    pub fn pos_pix(&self) -> PosPix {
        self.geometry.m_to_pix(self.pos_m)
    }

    /// Board cell derived from the continuous position. Authoritative for
    /// occupancy; never mutates.
    pub fn current_cell(&self) -> Cell {
        self.geometry.m_to_cell(self.pos_m)
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn action_start_ms(&self) -> i64 {
        self.action_start_ms
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    pub fn is_travelling(&self) -> bool {
        matches!(self.kind, MotionKind::Travel { .. }) && !self.completed
    }

    /// True while the motion still owes a completion event: travel in
    /// flight, or a timed hold (jump or rest) counting down. Re-arming such
    /// a motion would orphan its state machine.
    pub fn completion_pending(&self) -> bool {
        !self.completed && !matches!(self.kind, MotionKind::Hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TRAVEL_SPEED_M_S;

    fn travelling(src: Cell, dst: Cell, start: i64) -> Motion {
        let mut m = Motion::new(BoardGeometry::standard(), src);
        m.reset(
            MotionProfile::travel(TRAVEL_SPEED_M_S),
            &Command::travel(start, "p", src, dst),
        );
        m
    }

    #[test]
    fn test_travel_endpoints_are_exact() {
        let g = BoardGeometry::standard();
        let src = Cell::new(7, 0);
        let dst = Cell::new(4, 0);
        let mut m = travelling(src, dst, 100);

        m.update(100);
        assert_eq!(m.pos_m(), g.cell_to_m(src), "position at t=start is the source point");

        // 3 cells at 1 m/s = 3000 ms.
        m.update(100 + 3000);
        assert_eq!(m.pos_m(), g.cell_to_m(dst), "position at t=start+duration is the dest point");
    }

    #[test]
    fn test_travel_completion_is_one_shot() {
        let mut m = travelling(Cell::new(0, 0), Cell::new(0, 2), 0);
        assert!(m.update(1999).is_none());
        let done = m.update(2000).expect("completion at the deadline");
        assert_eq!(done.kind, crate::types::EventKind::Arrived);
        assert_eq!(done.params, vec![Cell::new(0, 2)]);
        assert!(m.update(2000).is_none(), "no re-emit at the same instant");
        assert!(m.update(9000).is_none(), "no re-emit later");
        assert_eq!(m.current_cell(), Cell::new(0, 2));
    }

    #[test]
    fn test_update_is_repeatable_at_the_same_now() {
        let mut m = travelling(Cell::new(0, 0), Cell::new(0, 4), 0);
        m.update(1500);
        let first = m.pos_m();
        m.update(1500);
        assert_eq!(m.pos_m(), first);
    }

    #[test]
    fn test_diagonal_travel_duration_uses_euclidean_distance() {
        let m = travelling(Cell::new(0, 0), Cell::new(3, 3), 0);
        // 3*sqrt(2) metres at 1 m/s.
        assert_eq!(m.duration_ms(), (3.0_f64 * std::f64::consts::SQRT_2 * 1000.0).round() as i64);
    }

    #[test]
    fn test_timed_hold_emits_once_after_duration() {
        let mut m = Motion::new(BoardGeometry::standard(), Cell::new(2, 2));
        m.reset(MotionProfile::jump(1000), &Command::jump(500, "p", Cell::new(2, 2)));
        assert!(m.update(1499).is_none());
        assert!(m.update(1500).is_some());
        assert!(m.update(1501).is_none());
    }

    #[test]
    fn test_static_hold_never_completes() {
        let mut m = Motion::new(BoardGeometry::standard(), Cell::new(5, 5));
        m.reset(MotionProfile::idle(), &Command::idle(0, "p", Cell::new(5, 5)));
        assert!(m.update(i64::MAX / 2).is_none());
        assert_eq!(m.current_cell(), Cell::new(5, 5));
    }

    #[test]
    fn test_capability_flags_per_profile() {
        let idle = MotionProfile::idle().flags;
        assert!(idle.can_be_captured && !idle.can_capture && idle.is_movement_blocker);

        let travel = MotionProfile::travel(1.0).flags;
        assert!(travel.can_be_captured && travel.can_capture && !travel.is_movement_blocker);

        let jump = MotionProfile::jump(1000).flags;
        assert!(!jump.can_be_captured && jump.can_capture && !jump.is_movement_blocker);

        let rest = MotionProfile::rest(6000).flags;
        assert!(rest.can_be_captured && !rest.can_capture && rest.is_movement_blocker);
    }

    #[test]
    fn test_degenerate_travel_to_own_cell_completes_immediately() {
        let mut m = travelling(Cell::new(4, 4), Cell::new(4, 4), 0);
        assert!(m.update(0).is_some());
        assert_eq!(m.current_cell(), Cell::new(4, 4));
    }
}
