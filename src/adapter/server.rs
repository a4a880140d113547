//! TCP server for remote players and observers.
//!
//! Each line a client sends is one JSON [`Command`]; it is forwarded into
//! the arbiter's intake queue unmodified (the legality pipeline treats
//! network commands exactly like keyboard ones). Every client receives the
//! latest board snapshot as a JSON line whenever one is published.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::core::command::Command;
use crate::core::game::CommandSink;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

impl ServerConfig {
    /// Create from `KFC_ADAPTER_HOST` / `KFC_ADAPTER_PORT`.
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("KFC_ADAPTER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("KFC_ADAPTER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7878);

        Self { host, port }
    }

    /// Check if the adapter is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("KFC_ADAPTER_DISABLED")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid adapter address {}:{}", self.host, self.port))
    }
}

/// Sender half the game loop uses to publish serialized snapshots.
pub type SnapshotPublisher = watch::Sender<String>;

/// Accept loop. One task per client; the server owns no game state.
pub async fn run_server(
    config: ServerConfig,
    sink: CommandSink,
    snapshots: watch::Receiver<String>,
) -> Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind adapter on {addr}"))?;
    tracing::info!(%addr, "adapter listening");

    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        tracing::info!(%peer, "client connected");
        let sink = sink.clone();
        let snapshots = snapshots.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, &sink, snapshots).await {
                tracing::warn!(%peer, %err, "client error");
            }
            tracing::info!(%peer, "client disconnected");
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    sink: &CommandSink,
    mut snapshots: watch::Receiver<String>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // Greet with the current snapshot so observers render immediately.
    let current = snapshots.borrow_and_update().clone();
    if !current.is_empty() {
        write_half.write_all(current.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match decode_command(&line) {
                    Ok(cmd) => {
                        // A closed sink means the game loop is gone.
                        if sink.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, "bad command line");
                        let reply = serde_json::json!({ "error": err.to_string() });
                        write_half.write_all(reply.to_string().as_bytes()).await?;
                        write_half.write_all(b"\n").await?;
                    }
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break; // game loop dropped the publisher
                }
                let snapshot = snapshots.borrow_and_update().clone();
                write_half.write_all(snapshot.as_bytes()).await?;
                write_half.write_all(b"\n").await?;
            }
        }
    }
    Ok(())
}

fn decode_command(line: &str) -> Result<Command> {
    let trimmed = line.trim();
    serde_json::from_str(trimmed).with_context(|| format!("not a command: {trimmed:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, EventKind};

    #[test]
    fn test_decode_command_line() {
        let line = r#"{"timestamp":500,"actor_id":"PW_3","kind":"move","params":[[6,2],[4,2]]}"#;
        let cmd = decode_command(line).unwrap();
        assert_eq!(cmd.actor_id, "PW_3");
        assert_eq!(cmd.kind, EventKind::Move);
        assert_eq!(cmd.dest(), Some(Cell::new(4, 2)));

        assert!(decode_command("not json").is_err());
        assert!(decode_command(r#"{"timestamp":0}"#).is_err());
    }

    #[test]
    fn test_server_config_from_env() {
        // Defaults are used when the variables are unset.
        let config = ServerConfig::from_env();
        assert!(!config.host.is_empty());
        assert!(config.socket_addr().is_ok());
    }
}
