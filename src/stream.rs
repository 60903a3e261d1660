// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Frame header wire format.
//!
//! The header persists everything the decoder must agree with the encoder
//! on: the coding-mode selector, the laser-index strategy, the correction
//! flag, the origin, the spherical scale parameters and the calibration
//! identity digest. Persisting these in the stream turns the
//! configuration-mismatch failure class (silently wrong geometry) into typed
//! decode errors.
//!
//! Layout, little-endian:
//!
//! ```text
//! ┌───────┬─────┬──────┬──────┬───────┬───────┬───────┬────────┬────────┬─────────┬─────────┬──────────────┐
//! │ magic │ ver │ mode │ lmod │ flags │ r_lg2 │ a_lg2 │ origin │ digest │ n_points│ n_groups│ group sizes… │
//! │ 4B    │ 1B  │ 1B   │ 1B   │ 1B    │ 1B    │ 1B    │ 12B    │ 8B     │ 4B      │ 4B      │ varints      │
//! └───────┴─────┴──────┴──────┴───────┴───────┴───────┴────────┴────────┴─────────┴─────────┴──────────────┘
//! ```

use crate::calibration::Calibration;
use crate::codec::{CodingMode, DupGroup, Error, LaserIndexMode, Point3};
use crate::entropy::{read_varint, write_varint};

/// Frame sync/magic bytes.
pub const MAGIC: [u8; 4] = *b"LGC1";

/// Wire format version.
pub const VERSION: u8 = 1;

/// Header flag: a secondary Cartesian correction residual follows each
/// node's coding-domain residual.
const FLAG_CARTESIAN_CORRECTION: u8 = 0x01;

/// Fixed-size header prefix length (everything before the group sizes).
const FIXED_LEN: usize = 4 + 1 + 1 + 1 + 1 + 1 + 1 + 12 + 8 + 4 + 4;

/// Decoded frame header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub mode: CodingMode,
    pub laser_mode: LaserIndexMode,
    pub cartesian_correction: bool,
    pub radius_log2: u8,
    pub azimuth_log2: u8,
    pub origin: Point3,
    pub calibration_digest: u64,
    pub groups: Vec<DupGroup>,
}

impl FrameHeader {
    /// Total number of points covered by the group list.
    pub fn n_points(&self) -> usize {
        self.groups.last().map(|g| g.end).unwrap_or(0)
    }

    /// Serialize the header into `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.push(VERSION);
        out.push(self.mode.to_wire());
        out.push(self.laser_mode.to_wire());
        let mut flags = 0u8;
        if self.cartesian_correction {
            flags |= FLAG_CARTESIAN_CORRECTION;
        }
        out.push(flags);
        out.push(self.radius_log2);
        out.push(self.azimuth_log2);
        for component in self.origin.0 {
            out.extend_from_slice(&component.to_le_bytes());
        }
        out.extend_from_slice(&self.calibration_digest.to_le_bytes());
        out.extend_from_slice(&(self.n_points() as u32).to_le_bytes());
        out.extend_from_slice(&(self.groups.len() as u32).to_le_bytes());
        for group in &self.groups {
            write_varint(out, group.len() as u32);
        }
    }

    /// Parse a header from the front of `data`, returning the header and the
    /// number of bytes consumed.
    pub fn read(data: &[u8]) -> Result<(FrameHeader, usize), Error> {
        if data.len() < FIXED_LEN {
            return Err(Error::TruncatedStream(data.len()));
        }
        if data[0..4] != MAGIC {
            return Err(Error::BadMagic);
        }
        if data[4] != VERSION {
            return Err(Error::UnsupportedVersion(data[4]));
        }
        let mode = CodingMode::from_wire(data[5])?;
        let laser_mode = LaserIndexMode::from_wire(data[6])?;
        let flags = data[7];
        if flags & !FLAG_CARTESIAN_CORRECTION != 0 {
            return Err(Error::InvalidHeader(format!("unknown flags {:#04x}", flags)));
        }
        let radius_log2 = data[8];
        let azimuth_log2 = data[9];
        let origin = Point3([
            i32::from_le_bytes([data[10], data[11], data[12], data[13]]),
            i32::from_le_bytes([data[14], data[15], data[16], data[17]]),
            i32::from_le_bytes([data[18], data[19], data[20], data[21]]),
        ]);
        let calibration_digest = u64::from_le_bytes([
            data[22], data[23], data[24], data[25], data[26], data[27], data[28], data[29],
        ]);
        let n_points =
            u32::from_le_bytes([data[30], data[31], data[32], data[33]]) as usize;
        let n_groups =
            u32::from_le_bytes([data[34], data[35], data[36], data[37]]) as usize;

        // Each group size takes at least one varint byte; a count past the
        // remaining bytes is corrupt and must be rejected before it can
        // size the group list allocation.
        if n_groups > data.len() - FIXED_LEN {
            return Err(Error::InvalidHeader(format!(
                "{} groups in {} remaining bytes",
                n_groups,
                data.len() - FIXED_LEN
            )));
        }

        let mut pos = FIXED_LEN;
        let mut groups = Vec::with_capacity(n_groups.min(n_points));
        let mut cursor = 0usize;
        for _ in 0..n_groups {
            let len = read_varint(data, &mut pos)? as usize;
            if len == 0 || cursor + len > n_points {
                return Err(Error::InvalidHeader(format!(
                    "group of {} points breaks coverage at {}",
                    len, cursor
                )));
            }
            groups.push(DupGroup {
                start: cursor,
                end: cursor + len,
            });
            cursor += len;
        }
        if cursor != n_points {
            return Err(Error::InvalidHeader(format!(
                "groups cover {} of {} points",
                cursor, n_points
            )));
        }

        Ok((
            FrameHeader {
                mode,
                laser_mode,
                cartesian_correction: flags & FLAG_CARTESIAN_CORRECTION != 0,
                radius_log2,
                azimuth_log2,
                origin,
                calibration_digest,
                groups,
            },
            pos,
        ))
    }

    /// Verify the header against the decoder's calibration table.
    pub fn check_calibration(&self, cal: &Calibration) -> Result<(), Error> {
        if self.radius_log2 != cal.radius_log2()
            || self.azimuth_log2 != cal.azimuth_log2()
            || self.calibration_digest != cal.digest()
        {
            return Err(Error::CalibrationMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::LaserEntry;

    fn header() -> FrameHeader {
        FrameHeader {
            mode: CodingMode::Spherical,
            laser_mode: LaserIndexMode::Calibrated,
            cartesian_correction: true,
            radius_log2: 1,
            azimuth_log2: 12,
            origin: Point3([-4, 5, 600]),
            calibration_digest: 0x1234_5678_9abc_def0,
            groups: vec![DupGroup { start: 0, end: 2 }, DupGroup { start: 2, end: 5 }],
        }
    }

    #[test]
    fn test_header_round_trip() {
        let original = header();
        let mut bytes = Vec::new();
        original.write(&mut bytes);
        bytes.extend_from_slice(&[0xaa, 0xbb]); // trailing payload untouched
        let (parsed, consumed) = FrameHeader::read(&bytes).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(consumed, bytes.len() - 2);
        assert_eq!(parsed.n_points(), 5);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = Vec::new();
        header().write(&mut bytes);
        bytes[0] ^= 0xff;
        assert!(matches!(FrameHeader::read(&bytes), Err(Error::BadMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = Vec::new();
        header().write(&mut bytes);
        bytes[4] = 99;
        assert!(matches!(
            FrameHeader::read(&bytes),
            Err(Error::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let mut bytes = Vec::new();
        header().write(&mut bytes);
        bytes.truncate(20);
        assert!(matches!(
            FrameHeader::read(&bytes),
            Err(Error::TruncatedStream(20))
        ));
    }

    #[test]
    fn test_group_coverage_validated() {
        let mut bytes = Vec::new();
        header().write(&mut bytes);
        bytes[34] = 1; // claim one group while n_points stays 5
        assert!(matches!(
            FrameHeader::read(&bytes),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_inflated_group_count_rejected() {
        let mut bytes = Vec::new();
        header().write(&mut bytes);
        bytes[34..38].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            FrameHeader::read(&bytes),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_calibration_check() {
        let cal = Calibration::new(vec![LaserEntry { tangent: 0, z_offset: 0 }], 1, 12).unwrap();
        let mut h = header();
        h.calibration_digest = cal.digest();
        assert!(h.check_calibration(&cal).is_ok());
        h.calibration_digest ^= 1;
        assert!(matches!(
            h.check_calibration(&cal),
            Err(Error::CalibrationMismatch)
        ));
    }
}
