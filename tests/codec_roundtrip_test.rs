// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end codec tests over synthetic sensor frames.
//!
//! Frames are generated from seeded RNGs so failures reproduce exactly.

use edgefirst_lidarcodec::{
    entropy::{RecordingWriter, SliceReader},
    Calibration, ChainSelector, CodecConfig, CodingMode, CoordinateTransformer, Decoder, Encoder,
    FrameHeader, LaserEntry, LaserIndexMode, Point3, PointFrame,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// 16-laser table spanning roughly -22° to +22° elevation, Q18 tangents.
fn spinning_cal(radius_log2: u8, azimuth_log2: u8) -> Calibration {
    let lasers = (0..16)
        .map(|i| LaserEntry {
            tangent: (i - 8) * 13_000,
            z_offset: (i % 4) - 2,
        })
        .collect();
    Calibration::new(lasers, radius_log2, azimuth_log2).unwrap()
}

/// Random frame with duplicate runs sprinkled in.
fn synthetic_frame(rng: &mut StdRng, n_points: usize) -> PointFrame {
    let mut points = Vec::with_capacity(n_points);
    while points.len() < n_points {
        let point = Point3([
            rng.gen_range(-30_000..30_000),
            rng.gen_range(-30_000..30_000),
            rng.gen_range(-8_000..8_000),
        ]);
        points.push(point);
        // ~1 in 8 points is a duplicate run of 2-3.
        if rng.gen_ratio(1, 8) {
            for _ in 0..rng.gen_range(1..3) {
                if points.len() < n_points {
                    points.push(point);
                }
            }
        }
    }
    PointFrame::from_points(points, None).unwrap()
}

#[test]
fn test_spherical_round_trip_is_exact() {
    let mut rng = StdRng::seed_from_u64(7);
    let cal = spinning_cal(1, 12);
    let encoder = Encoder::new(CodecConfig::default(), &cal).unwrap();
    let decoder = Decoder::new(&cal);

    let frame = synthetic_frame(&mut rng, 2_000);
    let bytes = encoder.encode(&frame).unwrap();
    let decoded = decoder.decode(&bytes).unwrap();
    assert_eq!(decoded, frame.points());
}

#[test]
fn test_cartesian_round_trip_is_exact() {
    let mut rng = StdRng::seed_from_u64(11);
    let cal = spinning_cal(0, 12);
    let config = CodecConfig {
        mode: CodingMode::Cartesian,
        origin: Point3([500, -500, 100]),
        ..Default::default()
    };
    let encoder = Encoder::new(config, &cal).unwrap();
    let decoder = Decoder::new(&cal);

    let frame = synthetic_frame(&mut rng, 2_000);
    let bytes = encoder.encode(&frame).unwrap();
    let decoded = decoder.decode(&bytes).unwrap();
    assert_eq!(decoded, frame.points());
}

#[test]
fn test_round_trip_with_origin_offset() {
    let mut rng = StdRng::seed_from_u64(13);
    let cal = spinning_cal(1, 14);
    let config = CodecConfig {
        origin: Point3([-12_345, 6_789, -42]),
        ..Default::default()
    };
    let encoder = Encoder::new(config, &cal).unwrap();
    let decoder = Decoder::new(&cal);

    let frame = synthetic_frame(&mut rng, 500);
    let bytes = encoder.encode(&frame).unwrap();
    let decoded = decoder.decode(&bytes).unwrap();
    assert_eq!(decoded, frame.points());
}

#[test]
fn test_duplicate_neighbors_decode_identically() {
    // Sequence indices 5 and 6 quantize to the same cell.
    let cal = spinning_cal(0, 12);
    let encoder = Encoder::new(CodecConfig::default(), &cal).unwrap();
    let decoder = Decoder::new(&cal);

    let mut points: Vec<Point3> = (0..5)
        .map(|i| Point3([1_000 + 37 * i, 400 - 11 * i, 25 * i]))
        .collect();
    let shared = Point3([777, -333, 55]);
    points.push(shared);
    points.push(shared);

    let frame = PointFrame::from_points(points.clone(), None).unwrap();
    let bytes = encoder.encode(&frame).unwrap();
    let decoded = decoder.decode(&bytes).unwrap();
    assert_eq!(decoded, points);
    assert_eq!(decoded[5], decoded[6]);
}

#[test]
fn test_external_laser_hints_round_trip() {
    let cal = spinning_cal(0, 12);
    let transformer = CoordinateTransformer::new(&cal, LaserIndexMode::Calibrated, 2);

    // Points on laser surfaces, ring ids supplied by the "sensor".
    let mut points = Vec::new();
    let mut hints = Vec::new();
    for (laser, azimuth) in [(0u32, 100), (5, 900), (10, 1800), (15, 3000)] {
        let sph = Point3([1_500, azimuth, laser as i32]);
        points.push(transformer.to_cartesian(sph).unwrap());
        hints.push(laser);
    }

    let config = CodecConfig {
        laser_mode: LaserIndexMode::External,
        ..Default::default()
    };
    let encoder = Encoder::new(config, &cal).unwrap();
    let frame = PointFrame::from_points(points.clone(), Some(hints)).unwrap();
    let bytes = encoder.encode(&frame).unwrap();
    let decoded = Decoder::new(&cal).decode(&bytes).unwrap();
    assert_eq!(decoded, points);
}

#[test]
fn test_lossy_mode_stays_within_quantization_error() {
    // With the Cartesian correction disabled, reconstruction carries only
    // the forward quantization error. Points generated on laser surfaces
    // land within a few units after the refinement search.
    let mut rng = StdRng::seed_from_u64(17);
    let cal = spinning_cal(0, 12);
    let transformer = CoordinateTransformer::new(&cal, LaserIndexMode::Calibrated, 2);

    let points: Vec<Point3> = (0..300)
        .map(|_| {
            let sph = Point3([
                rng.gen_range(50..2_000),
                rng.gen_range(0..4_096),
                rng.gen_range(0..16),
            ]);
            transformer.to_cartesian(sph).unwrap()
        })
        .collect();

    let config = CodecConfig {
        cartesian_correction: false,
        ..Default::default()
    };
    let encoder = Encoder::new(config, &cal).unwrap();
    let frame = PointFrame::from_points(points.clone(), None).unwrap();
    let bytes = encoder.encode(&frame).unwrap();
    let decoded = Decoder::new(&cal).decode(&bytes).unwrap();

    assert_eq!(decoded.len(), points.len());
    for (original, reconstructed) in points.iter().zip(&decoded) {
        assert!(
            original.l1_distance(*reconstructed) <= 4,
            "{:?} reconstructed as {:?}",
            original,
            reconstructed
        );
    }
}

#[test]
fn test_swapped_residuals_diverge() {
    // Traversal order is part of the wire contract: swapping the residual
    // triples of two sibling nodes must produce detectably wrong output.
    let cal = spinning_cal(0, 12);
    let config = CodecConfig {
        cartesian_correction: false,
        ..Default::default()
    };
    let encoder = Encoder::new(config, &cal).unwrap();
    let decoder = Decoder::new(&cal);

    let points = vec![
        Point3([1_000, 0, 0]),
        Point3([1_010, 210, 300]),
        Point3([1_900, -420, -600]),
    ];
    let frame = PointFrame::from_points(points, None).unwrap();

    let mut sink = RecordingWriter::new();
    encoder
        .encode_residuals(&frame, &ChainSelector, &mut sink)
        .unwrap();
    assert_eq!(sink.components.len(), 9);

    let header = FrameHeader {
        mode: CodingMode::Spherical,
        laser_mode: LaserIndexMode::Calibrated,
        cartesian_correction: false,
        radius_log2: cal.radius_log2(),
        azimuth_log2: cal.azimuth_log2(),
        origin: Point3::ZERO,
        calibration_digest: cal.digest(),
        groups: frame.groups().to_vec(),
    };

    let mut reference = SliceReader::new(&sink.components);
    let in_order = decoder
        .decode_residuals(&header, &ChainSelector, &mut reference)
        .unwrap();

    let mut swapped = sink.components.clone();
    swapped.swap(3, 6);
    swapped.swap(4, 7);
    swapped.swap(5, 8);
    assert_ne!(swapped, sink.components, "nodes chosen must differ on the wire");

    let mut source = SliceReader::new(&swapped);
    let out_of_order = decoder.decode_residuals(&header, &ChainSelector, &mut source);
    match out_of_order {
        // A swap can push a laser index out of table range, which is itself
        // a detected failure.
        Err(_) => {}
        Ok(decoded) => assert_ne!(decoded, in_order),
    }
}
