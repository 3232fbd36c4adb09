use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use RustedAMR::meshcontrol::interval_mesh::{FixedErrorField, IntervalMesh};
use RustedAMR::meshcontrol::marker::{MeshMarker, ThresholdMarker};
use rand::Rng;

fn random_errors(n: usize) -> Vec<f64> {
    let mut rng = rand::rng();
    (0..n).map(|_| rng.random::<f64>()).collect()
}

fn bench_marking_max_norm(c: &mut Criterion) {
    let errors = random_errors(100_000);
    let mesh = IntervalMesh::uniform(errors.len());
    c.bench_function("threshold marking, p = inf, 100k elements", |b| {
        b.iter(|| {
            let mut marker =
                ThresholdMarker::new(Box::new(FixedErrorField::new(black_box(errors.clone()))));
            marker.marked_elements(&mesh).len()
        })
    });
}

fn bench_marking_l2_norm_capped(c: &mut Criterion) {
    let errors = random_errors(100_000);
    let mesh = IntervalMesh::uniform(errors.len());
    c.bench_function("threshold marking, p = 2, capped at 1k", |b| {
        b.iter(|| {
            let mut marker =
                ThresholdMarker::new(Box::new(FixedErrorField::new(black_box(errors.clone()))));
            marker.set_total_error_norm_p(2.0);
            marker.set_max_elements(1_000);
            marker.marked_elements(&mesh).len()
        })
    });
}

criterion_group!(benches, bench_marking_max_norm, bench_marking_l2_norm_capped);
criterion_main!(benches);
