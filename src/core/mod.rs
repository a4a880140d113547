//! Core module - pure game logic with no terminal or network dependencies.
//!
//! Everything here is driven by injected time (game milliseconds), so the
//! whole engine runs deterministically under test.

pub mod board;
pub mod command;
pub mod game;
pub mod library;
pub mod motion;
pub mod moves;
pub mod piece;
pub mod snapshot;
pub mod state;

// Re-export commonly used types
pub use board::BoardGeometry;
pub use command::Command;
pub use game::{CommandSink, Game, GameClock, GameError, Outcome};
pub use library::{standard_layout, PieceLibrary};
pub use piece::Piece;
pub use snapshot::GameSnapshot;
