//! Benchmark for evaluate() and adjust()
//!
//! Both walk 8 symmetries × patterns; adjust() is the TD update's inner loop.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use threes_td::board::Board;
use threes_td::evaluator::Evaluator;
use threes_td::pattern::{load_patterns, row_and_column_patterns};

fn midgame_board() -> Board {
    Board::from_cells([3, 1, 0, 2, 4, 5, 3, 0, 6, 2, 1, 0, 7, 4, 0, 1])
}

/// Benchmark: Evaluator::new() - zeroed tables for the row/column set
fn bench_evaluator_new(c: &mut Criterion) {
    c.bench_function("evaluator_new", |b| {
        b.iter(|| {
            let evaluator = Evaluator::new(row_and_column_patterns());
            black_box(evaluator)
        })
    });
}

/// Benchmark: evaluate() with the row/column set and with patterns.csv
fn bench_evaluate(c: &mut Criterion) {
    let board = midgame_board();
    let mut group = c.benchmark_group("evaluate");

    let rows = Evaluator::new(row_and_column_patterns());
    group.bench_function("rows", |b| {
        b.iter(|| black_box(rows.evaluate(black_box(&board))))
    });

    let csv = Evaluator::new(load_patterns("patterns.csv").unwrap());
    group.bench_function("patterns_csv", |b| {
        b.iter(|| black_box(csv.evaluate(black_box(&board))))
    });

    group.finish();
}

/// Benchmark: adjust() with a tiny step
fn bench_adjust(c: &mut Criterion) {
    let mut evaluator = Evaluator::new(row_and_column_patterns());
    let board = midgame_board();

    c.bench_function("adjust", |b| {
        b.iter(|| evaluator.adjust(black_box(&board), black_box(1e-6)))
    });
}

criterion_group!(benches, bench_evaluator_new, bench_evaluate, bench_adjust);
criterion_main!(benches);
