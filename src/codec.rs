// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common codec types and error handling.
//!
//! This module provides the shared data model for the predictive geometry
//! codec: integer point triples, the coding-domain selector, duplicate-group
//! boundaries, the validated input frame, and the crate-wide error type.

use itertools::Itertools;
use std::fmt;

/// Integer 3-component point.
///
/// The same triple is used in both coordinate domains; which domain a value
/// lives in is determined by the active [`CodingMode`]:
///
/// | slot | Cartesian | Spherical          |
/// |------|-----------|--------------------|
/// | 0    | x         | radius             |
/// | 1    | y         | azimuth (quantized)|
/// | 2    | z         | laser index        |
///
/// Component slot meaning is part of the wire contract and must never be
/// reinterpreted between the encode and decode sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point3(pub [i32; 3]);

impl Point3 {
    /// All-zero point.
    pub const ZERO: Point3 = Point3([0; 3]);

    /// Poison value used to pre-fill arena slots so that an unassigned slot
    /// is detectable before residual coding begins.
    pub const POISON: Point3 = Point3([i32::MIN; 3]);

    /// Component-wise wrapping addition.
    #[inline]
    pub fn wrapping_add(self, other: Point3) -> Point3 {
        Point3([
            self.0[0].wrapping_add(other.0[0]),
            self.0[1].wrapping_add(other.0[1]),
            self.0[2].wrapping_add(other.0[2]),
        ])
    }

    /// Component-wise wrapping subtraction.
    #[inline]
    pub fn wrapping_sub(self, other: Point3) -> Point3 {
        Point3([
            self.0[0].wrapping_sub(other.0[0]),
            self.0[1].wrapping_sub(other.0[1]),
            self.0[2].wrapping_sub(other.0[2]),
        ])
    }

    /// L1 (manhattan) distance to another point, in i64 to avoid overflow.
    #[inline]
    pub fn l1_distance(self, other: Point3) -> i64 {
        (self.0[0] as i64 - other.0[0] as i64).abs()
            + (self.0[1] as i64 - other.0[1] as i64).abs()
            + (self.0[2] as i64 - other.0[2] as i64).abs()
    }
}

/// Coordinate domain used for residual coding, fixed for a whole stream.
///
/// The selector is persisted in the frame header and consulted through the
/// [`crate::transform::DomainGateway`]; prediction code never calls the
/// forward/inverse transforms directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CodingMode {
    /// Code raw Cartesian (x, y, z) components.
    Cartesian,
    /// Code sensor-native (radius, azimuth, laser index) components.
    #[default]
    Spherical,
}

impl CodingMode {
    pub(crate) fn to_wire(self) -> u8 {
        match self {
            CodingMode::Cartesian => 0,
            CodingMode::Spherical => 1,
        }
    }

    pub(crate) fn from_wire(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(CodingMode::Cartesian),
            1 => Ok(CodingMode::Spherical),
            _ => Err(Error::InvalidHeader(format!("coding mode byte {}", byte))),
        }
    }
}

impl fmt::Display for CodingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodingMode::Cartesian => write!(f, "cartesian"),
            CodingMode::Spherical => write!(f, "spherical"),
        }
    }
}

/// How the laser (elevation ring) index is resolved during the forward
/// transform, selected once per stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LaserIndexMode {
    /// Scan the calibration table for the laser minimizing |z_expected - z|,
    /// ties broken by the lowest index.
    #[default]
    Calibrated,
    /// Use the sensor-reported ring id supplied with each point.
    External,
}

impl LaserIndexMode {
    pub(crate) fn to_wire(self) -> u8 {
        match self {
            LaserIndexMode::Calibrated => 0,
            LaserIndexMode::External => 1,
        }
    }

    pub(crate) fn from_wire(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(LaserIndexMode::Calibrated),
            1 => Ok(LaserIndexMode::External),
            _ => Err(Error::InvalidHeader(format!("laser mode byte {}", byte))),
        }
    }
}

/// Half-open range `[start, end)` of sequence indices that collapse to the
/// same quantized Cartesian position.
///
/// Every member of the group shares the canonical coded-domain value computed
/// from `points[start]`; each member still carries its own residual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DupGroup {
    pub start: usize,
    pub end: usize,
}

impl DupGroup {
    /// Number of points in the group (always at least 1 after validation).
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Default local refinement search radius (an empirical tuning constant,
/// not a derived bound).
pub const DEFAULT_SEARCH_RADIUS: i32 = 2;

/// Per-stream encoder configuration.
///
/// The coding mode, origin and correction flag are persisted in the frame
/// header; the decoder reconstructs its configuration from the stream rather
/// than relying on caller discipline.
#[derive(Clone, Copy, Debug)]
pub struct CodecConfig {
    /// Coordinate domain used for residual coding.
    pub mode: CodingMode,
    /// Laser-index resolution strategy for the forward transform.
    pub laser_mode: LaserIndexMode,
    /// Origin offset subtracted before coding and added back on output.
    pub origin: Point3,
    /// Local refinement search radius for the forward transform, in
    /// quantized (radius, azimuth) steps.
    pub search_radius: i32,
    /// Code a secondary Cartesian correction residual per node so that
    /// Spherical-mode reconstruction is exactly lossless. When disabled the
    /// correction stage contributes exactly zero.
    pub cartesian_correction: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mode: CodingMode::Spherical,
            laser_mode: LaserIndexMode::Calibrated,
            origin: Point3::ZERO,
            search_radius: DEFAULT_SEARCH_RADIUS,
            cartesian_correction: true,
        }
    }
}

/// Validated input frame: ordered Cartesian points, duplicate-group
/// boundaries and optional per-point laser hints.
///
/// Grouping is performed by the external ingestion layer; construction
/// verifies the boundaries it supplies are consistent so the canonical-value
/// assignment invariant is checkable at the crate boundary.
#[derive(Clone, Debug)]
pub struct PointFrame {
    points: Vec<Point3>,
    groups: Vec<DupGroup>,
    laser_hints: Option<Vec<u32>>,
}

impl PointFrame {
    /// Create a frame from pre-grouped points.
    ///
    /// Groups must be non-empty, contiguous, cover the whole point sequence,
    /// and all members of a group must carry the identical Cartesian
    /// position. `laser_hints`, when present, must be aligned with `points`.
    pub fn new(
        points: Vec<Point3>,
        groups: Vec<DupGroup>,
        laser_hints: Option<Vec<u32>>,
    ) -> Result<Self, Error> {
        if points.is_empty() != groups.is_empty() {
            return Err(Error::InvalidGroups(
                "group list does not match point list".to_string(),
            ));
        }
        let mut cursor = 0usize;
        for group in &groups {
            if group.start != cursor || group.is_empty() || group.end > points.len() {
                return Err(Error::InvalidGroups(format!(
                    "group [{}, {}) breaks coverage at index {}",
                    group.start, group.end, cursor
                )));
            }
            let canonical = points[group.start];
            for i in group.start..group.end {
                if points[i] != canonical {
                    return Err(Error::InvalidGroups(format!(
                        "group member {} differs from group position", i
                    )));
                }
            }
            cursor = group.end;
        }
        if cursor != points.len() {
            return Err(Error::InvalidGroups(format!(
                "groups cover {} of {} points",
                cursor,
                points.len()
            )));
        }
        if let Some(hints) = &laser_hints {
            if hints.len() != points.len() {
                return Err(Error::InvalidGroups(format!(
                    "{} laser hints for {} points",
                    hints.len(),
                    points.len()
                )));
            }
        }
        Ok(Self {
            points,
            groups,
            laser_hints,
        })
    }

    /// Create a frame by grouping consecutive runs of identical positions.
    ///
    /// Convenience for callers whose ingestion layer has already sorted and
    /// quantized the points but not emitted explicit group boundaries.
    pub fn from_points(points: Vec<Point3>, laser_hints: Option<Vec<u32>>) -> Result<Self, Error> {
        let mut groups = Vec::new();
        let mut start = 0usize;
        for (_, run) in &points.iter().chunk_by(|point| **point) {
            let end = start + run.count();
            groups.push(DupGroup { start, end });
            start = end;
        }
        Self::new(points, groups, laser_hints)
    }

    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[inline]
    pub fn groups(&self) -> &[DupGroup] {
        &self.groups
    }

    #[inline]
    pub fn laser_hints(&self) -> Option<&[u32]> {
        self.laser_hints.as_deref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Common error type for codec operations.
///
/// This enum consolidates configuration, construction and decode-time errors
/// into a single error type for consistent error handling.
#[derive(Debug)]
pub enum Error {
    /// Configuration error (invalid parameter, missing laser hint, strategy
    /// misuse).
    Config(String),
    /// Calibration table has no lasers.
    EmptyCalibration,
    /// Calibration scale parameter outside the supported range.
    UnsupportedScale(String),
    /// Duplicate-group boundaries are inconsistent with the point sequence.
    InvalidGroups(String),
    /// A canonical-value slot was left at its poison value after tree
    /// construction.
    UnassignedCanonical(usize),
    /// Stream does not start with the frame magic.
    BadMagic,
    /// Stream was produced by an unsupported format version.
    UnsupportedVersion(u8),
    /// Malformed frame header field.
    InvalidHeader(String),
    /// Calibration supplied to the decoder does not match the identity
    /// digest persisted in the stream.
    CalibrationMismatch,
    /// Residual stream ended at the given component position.
    TruncatedStream(usize),
    /// Varint component at the given byte position is malformed.
    InvalidVarint(usize),
    /// Decoded laser index falls outside the calibration table.
    InvalidLaserIndex(i32),
    /// Decoded radius falls outside the range any input can quantize to.
    InvalidRadius(i32),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::EmptyCalibration => write!(f, "calibration table has no lasers"),
            Error::UnsupportedScale(msg) => write!(f, "unsupported scale: {}", msg),
            Error::InvalidGroups(msg) => write!(f, "invalid duplicate groups: {}", msg),
            Error::UnassignedCanonical(idx) => {
                write!(f, "canonical value for node {} was never assigned", idx)
            }
            Error::BadMagic => write!(f, "bad frame magic"),
            Error::UnsupportedVersion(v) => write!(f, "unsupported format version: {}", v),
            Error::InvalidHeader(msg) => write!(f, "invalid frame header: {}", msg),
            Error::CalibrationMismatch => {
                write!(f, "calibration does not match the stream's identity digest")
            }
            Error::TruncatedStream(pos) => {
                write!(f, "residual stream exhausted at position {}", pos)
            }
            Error::InvalidVarint(pos) => write!(f, "malformed varint at byte {}", pos),
            Error::InvalidLaserIndex(idx) => write!(f, "laser index {} out of range", idx),
            Error::InvalidRadius(r) => write!(f, "radius {} out of range", r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_wrapping_ops() {
        let a = Point3([i32::MAX, -5, 0]);
        let b = Point3([1, 10, -3]);
        assert_eq!(a.wrapping_add(b), Point3([i32::MIN, 5, -3]));
        assert_eq!(b.wrapping_sub(a), Point3([2 - i32::MAX - 1, 15, -3]));
        assert_eq!(a.l1_distance(a), 0);
        assert_eq!(Point3::ZERO.l1_distance(Point3([1, -2, 3])), 6);
    }

    #[test]
    fn test_frame_groups_must_cover_sequence() {
        let points = vec![Point3([1, 2, 3]), Point3([4, 5, 6])];
        // Gap between groups.
        let result = PointFrame::new(
            points.clone(),
            vec![DupGroup { start: 0, end: 1 }],
            None,
        );
        assert!(result.is_err());
        // Overlapping group.
        let result = PointFrame::new(
            points.clone(),
            vec![DupGroup { start: 0, end: 2 }, DupGroup { start: 1, end: 2 }],
            None,
        );
        assert!(result.is_err());
        // Correct coverage.
        let result = PointFrame::new(
            points,
            vec![DupGroup { start: 0, end: 1 }, DupGroup { start: 1, end: 2 }],
            None,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_frame_group_members_must_match() {
        let points = vec![Point3([1, 2, 3]), Point3([4, 5, 6])];
        let result = PointFrame::new(points, vec![DupGroup { start: 0, end: 2 }], None);
        assert!(result.is_err());
    }

    #[test]
    fn test_frame_from_points_groups_runs() {
        let p = Point3([7, 8, 9]);
        let q = Point3([1, 1, 1]);
        let frame = PointFrame::from_points(vec![q, p, p, p, q], None).unwrap();
        assert_eq!(
            frame.groups(),
            &[
                DupGroup { start: 0, end: 1 },
                DupGroup { start: 1, end: 4 },
                DupGroup { start: 4, end: 5 },
            ]
        );
    }

    #[test]
    fn test_frame_hint_length_checked() {
        let points = vec![Point3([1, 2, 3])];
        let result = PointFrame::from_points(points, Some(vec![0, 1]));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_frame_is_valid() {
        let frame = PointFrame::from_points(Vec::new(), None).unwrap();
        assert!(frame.is_empty());
        assert!(frame.groups().is_empty());
    }
}
