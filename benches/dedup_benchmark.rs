use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};

use qgrid::discretizer::{Discretizer, Resolution};
use qgrid::memory::Batch;
use qgrid::normalizer::Normalizer;
use qgrid::space::ActionDimension;
use qgrid::trainer::{predict_unique, Trainer};
use qgrid::value_function::{DenseQ, QFunction};

/// Batch whose next states cycle through a handful of values, like a
/// trajectory revisiting the same grid cells.
fn revisiting_batch(size: usize) -> Batch {
    let observations = Array2::from_shape_fn((size, 2), |(i, j)| ((i + j) % 5) as f32);
    let actions = Array2::from_shape_fn((size, 2), |(i, j)| ((i * (j + 1)) % 3) as f32);
    let next_observations = Array2::from_shape_fn((size, 2), |(i, j)| ((i + j + 1) % 5) as f32);
    Batch::new(
        observations,
        actions,
        Array1::from_elem(size, 0.5),
        next_observations,
        vec![false; size],
    )
    .expect("consistent batch")
}

pub fn bench_target_construction(c: &mut Criterion) {
    let dimensions = [ActionDimension::scalar(0.0, 2.0), ActionDimension::scalar(0.0, 2.0)];
    let discretizer = Discretizer::new(&dimensions, Resolution::Points(11)).expect("grid");
    let normalizer =
        Normalizer::new(Array1::zeros(4), Array1::from_vec(vec![4.0, 4.0, 2.0, 2.0])).expect("bounds");
    let trainer = Trainer::new(0, 0.9, 1, false);

    let mut group = c.benchmark_group("bellman targets");
    for batch_size in [32, 128, 512] {
        let batch = revisiting_batch(batch_size);
        group.bench_function(BenchmarkId::new("build_targets", batch_size), |b| {
            let mut q = DenseQ::seeded(4, &[25, 25], 0.001, 1, 0).expect("network");
            b.iter(|| {
                trainer
                    .build_targets(black_box(&batch), &discretizer, &normalizer, &mut q)
                    .expect("targets")
            })
        });
    }
    group.finish();
}

pub fn bench_dedup_against_direct(c: &mut Criterion) {
    let rows = Array2::from_shape_fn((4096, 4), |(i, j)| ((i * 7 + j) % 13) as f32 / 13.0);
    let mut group = c.benchmark_group("prediction");

    group.bench_function("direct", |b| {
        let mut q = DenseQ::seeded(4, &[25, 25], 0.001, 1, 0).expect("network");
        b.iter(|| q.predict(black_box(rows.view())).expect("predict"))
    });
    group.bench_function("deduplicated", |b| {
        let mut q = DenseQ::seeded(4, &[25, 25], 0.001, 1, 0).expect("network");
        b.iter(|| predict_unique(&mut q, black_box(rows.view())).expect("predict"))
    });
    group.finish();
}

criterion_group!(benches, bench_target_construction, bench_dedup_against_direct);
criterion_main!(benches);
