//! Terminal kung fu chess runner (default binary).
//!
//! Two players share one keyboard: white on the arrow keys (Enter selects,
//! `+` jumps), black on WASD (`f` selects, `g` jumps). The optional TCP
//! adapter accepts remote commands and streams board snapshots.

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::watch;

use kungfu_chess::adapter::{run_server, ServerConfig};
use kungfu_chess::core::{
    standard_layout, BoardGeometry, Game, GameClock, GameSnapshot, PieceLibrary,
};
use kungfu_chess::input::{Keymap, PlayerCursor};
use kungfu_chess::term::{BoardView, FrameBuffer, TerminalRenderer};
use kungfu_chess::types::{Cell, Side, TICK_MS};

fn main() -> Result<()> {
    init_tracing()?;

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

/// Log to the file named by `KFC_LOG` (filtered by `RUST_LOG`); logging to
/// the terminal would fight the renderer for the screen.
fn init_tracing() -> Result<()> {
    let Ok(path) = std::env::var("KFC_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn should_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn run(term: &mut TerminalRenderer) -> Result<()> {
    let geometry = BoardGeometry::standard();
    let mut library = PieceLibrary::new(geometry)?;
    let pieces = library.create_pieces(&standard_layout());
    let mut game = Game::new(geometry, pieces)?;

    let clock = GameClock::new();
    game.start(clock.now_ms());

    // Snapshot publishing and the remote adapter. The adapter runs on its
    // own tokio runtime thread; the game loop stays synchronous.
    let (snapshot_tx, snapshot_rx) = watch::channel(String::new());
    if !ServerConfig::is_disabled() {
        let config = ServerConfig::from_env();
        let sink = game.command_sink();
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(err) => {
                    tracing::error!(%err, "adapter runtime failed to start");
                    return;
                }
            };
            if let Err(err) = runtime.block_on(run_server(config, sink, snapshot_rx)) {
                tracing::error!(%err, "adapter stopped");
            }
        });
    }

    let sink = game.command_sink();
    let view = BoardView::default();
    let mut p1 = PlayerCursor::new(
        Side::White,
        Keymap::arrows(),
        geometry.rows,
        geometry.cols,
        Cell::new(geometry.rows - 1, geometry.cols / 2),
    );
    let mut p2 = PlayerCursor::new(
        Side::Black,
        Keymap::wasd(),
        geometry.rows,
        geometry.cols,
        Cell::new(0, geometry.cols / 2),
    );

    let mut fb = FrameBuffer::new(geometry.cols as u16 * 2 + 30, geometry.rows as u16 + 4);
    let mut snapshot = GameSnapshot::capture(&game, clock.now_ms());

    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    loop {
        // Render.
        view.render(&mut fb, &snapshot, &[&p1, &p2]);
        term.draw(&fb)?;

        // Input with timeout until next tick.
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if should_quit(key) {
                        return Ok(());
                    }
                    let now = clock.now_ms();
                    let commands = [
                        p1.handle_key(key.code, &snapshot, now),
                        p2.handle_key(key.code, &snapshot, now),
                    ];
                    for cmd in commands.into_iter().flatten() {
                        let _ = sink.send(cmd);
                    }
                }
            }
        }

        // Tick.
        if last_tick.elapsed() >= tick_duration {
            last_tick = Instant::now();
            let now = clock.now_ms();
            let outcome = game.tick(now);
            snapshot = GameSnapshot::capture(&game, now);
            let _ = snapshot_tx.send(serde_json::to_string(&snapshot)?);

            if let Some(outcome) = outcome {
                tracing::info!(?outcome, "game over");
                view.render(&mut fb, &snapshot, &[&p1, &p2]);
                term.draw(&fb)?;
                // Leave the final board up until any key.
                loop {
                    if let Event::Key(key) = event::read()? {
                        if key.kind == KeyEventKind::Press {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
