//! Adapter module - remote player/observer protocol.
//!
//! External clients connect over TCP and speak line-delimited JSON:
//! command objects inbound, board snapshots outbound. Uses tokio for
//! async networking; the game loop itself stays synchronous.

pub mod server;

pub use server::{run_server, ServerConfig, SnapshotPublisher};
