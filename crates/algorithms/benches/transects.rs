//! Benchmarks for point thinning and transect drawing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rivertrend_algorithms::sampling::{ConflictGraph, DistanceMetric, TransectPoint};
use rivertrend_algorithms::transect::{draw_transects, generate_transects, TransectParams};

/// Candidates along a meandering channel, one per 30 m pixel
fn channel_coords(n: usize) -> Vec<[f64; 2]> {
    (0..n)
        .map(|i| {
            let x = i as f64 * 30.0;
            let y = ((i as f64) * 0.05).sin() * 600.0;
            [x, (y / 30.0).round() * 30.0]
        })
        .collect()
}

fn channel_points(n: usize, spacing: usize) -> Vec<TransectPoint> {
    channel_coords(n)
        .into_iter()
        .step_by(spacing)
        .enumerate()
        .map(|(i, [x, y])| {
            let flow = [0u16, 45, 90, 135][i % 4];
            TransectPoint {
                half_length: Some(4.0),
                ..TransectPoint::new(x, y, 50_000.0, flow)
            }
        })
        .collect()
}

fn bench_thinning(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling/thinning");
    for n in [1_000, 10_000, 50_000] {
        let coords = channel_coords(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let graph = ConflictGraph::build(black_box(&coords), 200.0, DistanceMetric::Planar);
                graph.greedy_survivors()
            })
        });
    }
    group.finish();
}

fn bench_drawing(c: &mut Criterion) {
    let mut group = c.benchmark_group("transect/draw");
    for n in [2_000, 10_000] {
        let points = channel_points(n, 10);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| draw_transects(black_box(&points), 30.0, 512.0).unwrap())
        });
    }
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let params = TransectParams {
        resolution: 30.0,
        ..TransectParams::default()
    };
    let points = channel_points(10_000, 10);
    c.bench_function("transect/generate_10k", |b| {
        b.iter(|| generate_transects(black_box(&points), None, &params).unwrap())
    });
}

criterion_group!(benches, bench_thinning, bench_drawing, bench_generate);
criterion_main!(benches);
