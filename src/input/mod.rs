//! Input module - per-player keyboard cursors.
//!
//! Each player drives a board cursor from their own key cluster; confirming
//! a selection then a destination emits a command into the intake queue.

pub mod keyboard;

pub use keyboard::{CursorAction, Keymap, PlayerCursor};
