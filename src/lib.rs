//! Kung fu chess: real-time chess with no turns.
//!
//! Both players issue commands whenever they like; pieces travel across the
//! board in continuous time and rest after acting. The engine is a
//! single-threaded tick loop fed by thread-safe command queues, with
//! terminal rendering and an optional TCP adapter layered on top.

pub mod adapter;
pub mod core;
pub mod input;
pub mod term;
pub mod types;
