use criterion::{black_box, criterion_group, criterion_main, Criterion};
use threes_td::board::{transform, Board, Symmetry};
use threes_td::pattern::{feature_index, row_and_column_patterns, symmetric_feature_index};

fn sample_board() -> Board {
    Board::from_cells([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0])
}

fn bench_rotate_clockwise(c: &mut Criterion) {
    let board = sample_board();

    c.bench_function("rotate_clockwise", |b| {
        b.iter(|| {
            let mut board = black_box(board);
            board.rotate_clockwise();
            black_box(board)
        })
    });
}

fn bench_all_symmetries(c: &mut Criterion) {
    let board = sample_board();

    c.bench_function("transform_all_8", |b| {
        b.iter(|| {
            for symmetry in Symmetry::ALL {
                black_box(transform(black_box(&board), symmetry));
            }
        })
    });
}

/// Precomputed symmetric cells vs. materialising each transformed board
fn bench_symmetric_indices(c: &mut Criterion) {
    let board = sample_board();
    let patterns = row_and_column_patterns();
    let mut group = c.benchmark_group("symmetric_indices");

    group.bench_function("precomputed", |b| {
        b.iter(|| {
            let mut sum = 0usize;
            for pattern in &patterns {
                for symmetry in 0..Symmetry::ALL.len() {
                    sum += symmetric_feature_index(black_box(&board), pattern, symmetry);
                }
            }
            black_box(sum)
        })
    });

    group.bench_function("transformed", |b| {
        b.iter(|| {
            let mut sum = 0usize;
            for symmetry in Symmetry::ALL {
                let image = transform(black_box(&board), symmetry);
                for pattern in &patterns {
                    sum += feature_index(&image, pattern);
                }
            }
            black_box(sum)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_rotate_clockwise,
    bench_all_symmetries,
    bench_symmetric_indices
);
criterion_main!(benches);
