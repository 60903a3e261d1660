// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Benchmarks for the predictive geometry codec.
//!
//! Measures:
//! - Full-frame encode (transform + tree + residual coding)
//! - Full-frame decode
//! - Forward transform in isolation
//!
//! Run with: cargo bench --bench codec_bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use edgefirst_lidarcodec::{
    Calibration, CodecConfig, CoordinateTransformer, Decoder, Encoder, LaserEntry, LaserIndexMode,
    Point3, PointFrame,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// 32-laser table with evenly spread elevations.
fn bench_cal() -> Calibration {
    let lasers = (0..32)
        .map(|i| LaserEntry {
            tangent: (i - 16) * 8_000,
            z_offset: 0,
        })
        .collect();
    Calibration::new(lasers, 1, 14).unwrap()
}

/// Synthetic spinning-sensor sweep: azimuth advances monotonically, range
/// varies smoothly, which is the workload the azimuth-delta predictor is
/// built for.
fn generate_sweep(total: usize) -> PointFrame {
    let mut rng = StdRng::seed_from_u64(42);
    let cal = bench_cal();
    let transformer = CoordinateTransformer::new(&cal, LaserIndexMode::Calibrated, 2);

    let points = (0..total)
        .map(|i| {
            let azimuth = ((i as i64 * 16_384) / total as i64) as i32;
            let sph = Point3([
                2_000 + rng.gen_range(-200..200),
                azimuth,
                (i % 32) as i32,
            ]);
            transformer.to_cartesian(sph).unwrap()
        })
        .collect();
    PointFrame::from_points(points, None).unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let cal = bench_cal();
    let encoder = Encoder::new(CodecConfig::default(), &cal).unwrap();

    let mut group = c.benchmark_group("encode");
    for &size in &[10_000usize, 50_000] {
        let frame = generate_sweep(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| encoder.encode(frame).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let cal = bench_cal();
    let encoder = Encoder::new(CodecConfig::default(), &cal).unwrap();
    let decoder = Decoder::new(&cal);

    let mut group = c.benchmark_group("decode");
    for &size in &[10_000usize, 50_000] {
        let bytes = encoder.encode(&generate_sweep(size)).unwrap();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| decoder.decode(bytes).unwrap());
        });
    }
    group.finish();
}

fn bench_forward_transform(c: &mut Criterion) {
    let cal = bench_cal();
    let transformer = CoordinateTransformer::new(&cal, LaserIndexMode::Calibrated, 2);
    let frame = generate_sweep(10_000);

    let mut group = c.benchmark_group("to_spherical");
    group.throughput(Throughput::Elements(frame.len() as u64));
    group.bench_function("10000", |b| {
        b.iter(|| {
            for &point in frame.points() {
                transformer.to_spherical(point, None).unwrap();
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_forward_transform);
criterion_main!(benches);
