//! Terminal rendering module.
//!
//! Rendering is split in two: a pure view that maps a board snapshot into a
//! character framebuffer (unit-testable, no I/O) and a renderer that
//! flushes the framebuffer to a raw-mode terminal via crossterm.

pub mod board_view;
pub mod fb;
pub mod renderer;

pub use board_view::BoardView;
pub use fb::{FrameBuffer, Glyph, GlyphStyle, Rgb};
pub use renderer::TerminalRenderer;
