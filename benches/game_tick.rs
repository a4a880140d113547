use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kungfu_chess::core::{standard_layout, BoardGeometry, Command, Game, PieceLibrary};
use kungfu_chess::types::Cell;

fn full_game() -> Game {
    let mut lib = PieceLibrary::new(BoardGeometry::standard()).unwrap();
    let pieces = lib.create_pieces(&standard_layout());
    let mut game = Game::new(BoardGeometry::standard(), pieces).unwrap();
    game.start(0);
    game
}

fn bench_idle_tick(c: &mut Criterion) {
    let mut game = full_game();
    let mut now = 0i64;

    c.bench_function("tick_32_idle_pieces", |b| {
        b.iter(|| {
            now += 16;
            game.tick(black_box(now));
        })
    });
}

fn bench_tick_with_travellers(c: &mut Criterion) {
    let mut game = full_game();
    let sink = game.command_sink();
    // Launch every white pawn forward so ticks advance real trajectories.
    for col in 0..8 {
        let src = Cell::new(6, col);
        let _ = sink.send(Command::travel(16, format!("PW_{}", col + 1), src, Cell::new(4, col)));
    }
    let mut now = 16i64;

    c.bench_function("tick_8_travellers", |b| {
        b.iter(|| {
            now += 16;
            game.tick(black_box(now));
        })
    });
}

fn bench_command_validation(c: &mut Criterion) {
    c.bench_function("reject_blocked_slide", |b| {
        let mut game = full_game();
        let sink = game.command_sink();
        let mut now = 0i64;
        b.iter(|| {
            now += 16;
            // Back-rank rook is boxed in; the command walks the whole
            // legality pipeline and fails path clearance.
            let _ = sink.send(Command::travel(now, "RW_1", Cell::new(7, 0), Cell::new(4, 0)));
            game.tick(black_box(now));
        })
    });
}

criterion_group!(
    benches,
    bench_idle_tick,
    bench_tick_with_travellers,
    bench_command_validation
);
criterion_main!(benches);
