// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-sensor laser calibration table.
//!
//! Each scanning elevation ring (laser) is described by a fixed-point
//! elevation tangent and a z-offset. The table also carries the quantization
//! scale parameters for the spherical domain. Tables are immutable for the
//! duration of a coding session and referenced, not copied, by the
//! transformer.

use crate::codec::Error;

/// Fixed-point shift for laser elevation tangents (Q18).
pub const TANGENT_SHIFT: u32 = 18;

/// Maximum laser elevation tangent magnitude (an elevation of ~89.99°).
/// Keeps the `r_scaled * tangent` product in [`Calibration::expected_z`]
/// within i64 for every radius the inverse transform accepts.
pub const MAX_TANGENT: i32 = 1 << 30;

/// Maximum supported radius scale shift.
const MAX_RADIUS_LOG2: u8 = 20;

/// Supported azimuth scale shift range. The upper bound keeps the CORDIC
/// angle conversion an exact left shift and all i64 products in range.
const MIN_AZIMUTH_LOG2: u8 = 2;
const MAX_AZIMUTH_LOG2: u8 = 24;

/// FNV-1a 64-bit offset basis and prime.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Single laser calibration entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaserEntry {
    /// Elevation tangent in Q18 fixed point.
    pub tangent: i32,
    /// Vertical offset of the laser origin, in Cartesian units.
    pub z_offset: i32,
}

/// Ordered per-laser calibration table plus spherical-domain scale
/// parameters.
#[derive(Clone, Debug)]
pub struct Calibration {
    lasers: Vec<LaserEntry>,
    radius_log2: u8,
    azimuth_log2: u8,
}

impl Calibration {
    /// Create a calibration table.
    ///
    /// An empty laser set is a caller-side precondition violation and is
    /// reported here, at construction, rather than at transform time.
    pub fn new(lasers: Vec<LaserEntry>, radius_log2: u8, azimuth_log2: u8) -> Result<Self, Error> {
        if lasers.is_empty() {
            return Err(Error::EmptyCalibration);
        }
        if radius_log2 > MAX_RADIUS_LOG2 {
            return Err(Error::UnsupportedScale(format!(
                "radius_log2 {} exceeds {}",
                radius_log2, MAX_RADIUS_LOG2
            )));
        }
        if !(MIN_AZIMUTH_LOG2..=MAX_AZIMUTH_LOG2).contains(&azimuth_log2) {
            return Err(Error::UnsupportedScale(format!(
                "azimuth_log2 {} outside [{}, {}]",
                azimuth_log2, MIN_AZIMUTH_LOG2, MAX_AZIMUTH_LOG2
            )));
        }
        if let Some(entry) = lasers
            .iter()
            .find(|entry| entry.tangent.unsigned_abs() > MAX_TANGENT as u32)
        {
            return Err(Error::UnsupportedScale(format!(
                "laser tangent {} exceeds magnitude {}",
                entry.tangent, MAX_TANGENT
            )));
        }
        Ok(Self {
            lasers,
            radius_log2,
            azimuth_log2,
        })
    }

    #[inline]
    pub fn lasers(&self) -> &[LaserEntry] {
        &self.lasers
    }

    #[inline]
    pub fn num_lasers(&self) -> usize {
        self.lasers.len()
    }

    /// Radius quantization shift: coded radius = round(hypot >> radius_log2).
    #[inline]
    pub fn radius_log2(&self) -> u8 {
        self.radius_log2
    }

    /// Azimuth quantization shift: a full turn spans `1 << azimuth_log2`
    /// coded azimuth steps.
    #[inline]
    pub fn azimuth_log2(&self) -> u8 {
        self.azimuth_log2
    }

    /// Number of coded azimuth steps per full turn.
    #[inline]
    pub fn azimuth_scale(&self) -> i64 {
        1i64 << self.azimuth_log2
    }

    /// Expected z coordinate for `laser` at the given unquantized radius.
    ///
    /// This is the single formula shared by the laser search and the inverse
    /// transform; z error is zero by construction for points exactly on a
    /// laser surface.
    #[inline]
    pub fn expected_z(&self, laser: usize, r_scaled: i64) -> i64 {
        let entry = &self.lasers[laser];
        let product = r_scaled * entry.tangent as i64;
        ((product + (1i64 << (TANGENT_SHIFT - 1))) >> TANGENT_SHIFT) - entry.z_offset as i64
    }

    /// Stable 64-bit identity digest over the laser entries and scale
    /// parameters, persisted in the frame header so a decoder can detect a
    /// mismatched calibration instead of silently producing wrong geometry.
    pub fn digest(&self) -> u64 {
        let mut hash = FNV_OFFSET;
        let mut mix = |byte: u8| {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        };
        mix(self.radius_log2);
        mix(self.azimuth_log2);
        for entry in &self.lasers {
            for byte in entry.tangent.to_le_bytes() {
                mix(byte);
            }
            for byte in entry.z_offset.to_le_bytes() {
                mix(byte);
            }
        }
        hash
    }
}
