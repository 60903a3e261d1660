// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Bit-exact fixed-point coordinate transforms.
//!
//! Bidirectional mapping between Cartesian integer coordinates and spherical
//! (radius, azimuth, laser index) integer coordinates, parameterized by a
//! per-sensor [`Calibration`] table.
//!
//! All trigonometry is pure-integer CORDIC: rotation mode produces sin/cos
//! for the inverse transform, vectoring mode produces atan2/hypot for the
//! forward transform. No libm calls are made anywhere on either side, so the
//! inverse transform the decoder depends on is bit-exact across platforms.
//!
//! Angles are fixed-point turn units (Q30, a full turn is `1 << 30`), which
//! makes conversion between coded azimuth steps and CORDIC angles an exact
//! shift. Trig magnitudes are Q20.
//!
//! The forward transform is lossy: quantizing radius and azimuth
//! independently does not give the closest achievable reconstruction, so a
//! local search perturbs the quantized pair over a small window and keeps the
//! candidate minimizing L1 reconstruction error.

use crate::calibration::Calibration;
use crate::codec::{CodecConfig, CodingMode, Error, LaserIndexMode, Point3};

/// Angle fixed-point: a full turn is `1 << ANGLE_BITS` units.
const ANGLE_BITS: u32 = 30;
const FULL_TURN: i64 = 1 << ANGLE_BITS;
const HALF_TURN: i64 = 1 << (ANGLE_BITS - 1);
const QUARTER_TURN: i64 = 1 << (ANGLE_BITS - 2);

/// Trig magnitude fixed-point shift (Q20).
const TRIG_SHIFT: u32 = 20;
const TRIG_ONE: i64 = 1 << TRIG_SHIFT;

/// CORDIC iteration count; the residual angle after the last step is below
/// one Q20 magnitude step.
const CORDIC_ITERATIONS: usize = 24;

/// CORDIC gain compensation `K = prod 1/sqrt(1 + 2^-2i)` in Q20.
const CORDIC_GAIN_Q20: i64 = 636_751;

/// `atan(2^-i)` in Q30 turn units.
const CORDIC_ATAN_TURNS: [i64; CORDIC_ITERATIONS] = [
    134_217_728,
    79_233_351,
    41_864_727,
    21_251_189,
    10_666_833,
    5_338_616,
    2_669_960,
    1_335_061,
    667_541,
    333_772,
    166_886,
    83_443,
    41_722,
    20_861,
    10_430,
    5_215,
    2_608,
    1_304,
    652,
    326,
    163,
    81,
    41,
    20,
];

/// Round-half-up arithmetic shift (shared by both transform directions).
#[inline]
fn round_shift(value: i64, shift: u32) -> i64 {
    if shift == 0 {
        value
    } else {
        (value + (1i64 << (shift - 1))) >> shift
    }
}

/// Fixed-point sin/cos via CORDIC rotation, `(cos, sin)` in Q20.
///
/// Angles that are exact multiples of a quarter turn return exact unit
/// vectors, so axis-aligned reconstructions carry no trig error.
fn sin_cos_turns(angle: i64) -> (i64, i64) {
    let a = angle.rem_euclid(FULL_TURN);
    if a % QUARTER_TURN == 0 {
        return match a / QUARTER_TURN {
            0 => (TRIG_ONE, 0),
            1 => (0, TRIG_ONE),
            2 => (-TRIG_ONE, 0),
            _ => (0, -TRIG_ONE),
        };
    }

    // Reduce to within a quarter turn of zero; CORDIC converges up to ~99°.
    let (mut z, negate) = if (QUARTER_TURN..3 * QUARTER_TURN).contains(&a) {
        (a - HALF_TURN, true)
    } else if a >= 3 * QUARTER_TURN {
        (a - FULL_TURN, false)
    } else {
        (a, false)
    };

    let mut x = CORDIC_GAIN_Q20;
    let mut y = 0i64;
    for (i, &atan) in CORDIC_ATAN_TURNS.iter().enumerate() {
        let (nx, ny) = if z >= 0 {
            (x - (y >> i), y + (x >> i))
        } else {
            (x + (y >> i), y - (x >> i))
        };
        z += if z >= 0 { -atan } else { atan };
        x = nx;
        y = ny;
    }
    if negate {
        (-x, -y)
    } else {
        (x, y)
    }
}

/// Fixed-point atan2/hypot via CORDIC vectoring.
///
/// Returns `(angle, hypot)` with the angle wrapped to `[0, FULL_TURN)`.
/// Axis-aligned inputs take exact fast paths.
fn atan2_hypot(x: i64, y: i64) -> (i64, i64) {
    if x == 0 && y == 0 {
        return (0, 0);
    }
    if y == 0 {
        return if x > 0 { (0, x) } else { (HALF_TURN, -x) };
    }
    if x == 0 {
        return if y > 0 {
            (QUARTER_TURN, y)
        } else {
            (3 * QUARTER_TURN, -y)
        };
    }

    // Pre-rotate left-half-plane inputs by a half turn so the vectoring loop
    // only has to close at most a quarter turn.
    let (mut vx, mut vy, base) = if x < 0 {
        (-x, -y, HALF_TURN)
    } else {
        (x, y, 0)
    };

    let mut z = 0i64;
    for (i, &atan) in CORDIC_ATAN_TURNS.iter().enumerate() {
        if vy == 0 {
            break;
        }
        let (nx, ny) = if vy > 0 {
            (vx + (vy >> i), vy - (vx >> i))
        } else {
            (vx - (vy >> i), vy + (vx >> i))
        };
        z += if vy > 0 { atan } else { -atan };
        vx = nx;
        vy = ny;
    }

    let hypot = round_shift(vx * CORDIC_GAIN_Q20, TRIG_SHIFT);
    ((base + z).rem_euclid(FULL_TURN), hypot)
}

/// Stateless (per calibration) bidirectional Cartesian/spherical transformer.
///
/// The inverse direction is the exact function used by the refinement search,
/// the encoder's reconstruction path and the decoder, so prediction on both
/// sides matches bit for bit.
pub struct CoordinateTransformer<'a> {
    cal: &'a Calibration,
    laser_mode: LaserIndexMode,
    search_radius: i32,
}

impl<'a> CoordinateTransformer<'a> {
    pub fn new(cal: &'a Calibration, laser_mode: LaserIndexMode, search_radius: i32) -> Self {
        Self {
            cal,
            laser_mode,
            search_radius,
        }
    }

    /// Quantize a Cartesian point into the spherical domain.
    ///
    /// `hint` is the sensor-reported ring id, consumed only in
    /// [`LaserIndexMode::External`]; in calibrated mode the laser index is
    /// resolved by scanning the calibration table.
    pub fn to_spherical(&self, cart: Point3, hint: Option<u32>) -> Result<Point3, Error> {
        let initial = self.unrefined_spherical(cart, hint)?;
        Ok(self.refine(cart, initial))
    }

    /// Forward quantization without the local refinement step.
    pub(crate) fn unrefined_spherical(
        &self,
        cart: Point3,
        hint: Option<u32>,
    ) -> Result<Point3, Error> {
        let (angle, hypot) = atan2_hypot(cart.0[0] as i64, cart.0[1] as i64);

        let radius = round_shift(hypot, self.cal.radius_log2() as u32);

        let azimuth_shift = ANGLE_BITS - self.cal.azimuth_log2() as u32;
        let azimuth = round_shift(angle, azimuth_shift) & (self.cal.azimuth_scale() - 1);

        let laser = self.resolve_laser(radius, cart.0[2] as i64, hint)?;

        Ok(Point3([radius as i32, azimuth as i32, laser as i32]))
    }

    /// Resolve the laser index for a point at quantized radius `radius` and
    /// true height `z`.
    fn resolve_laser(&self, radius: i64, z: i64, hint: Option<u32>) -> Result<usize, Error> {
        match self.laser_mode {
            LaserIndexMode::External => {
                let hint = hint.ok_or_else(|| {
                    Error::Config("external laser mode requires a per-point hint".to_string())
                })?;
                if hint as usize >= self.cal.num_lasers() {
                    return Err(Error::InvalidLaserIndex(hint as i32));
                }
                Ok(hint as usize)
            }
            LaserIndexMode::Calibrated => {
                let r_scaled = radius << self.cal.radius_log2();
                let mut best = 0usize;
                let mut best_err = i64::MAX;
                for laser in 0..self.cal.num_lasers() {
                    let err = (self.cal.expected_z(laser, r_scaled) - z).abs();
                    // Strict < keeps the first (lowest index) minimum on ties.
                    if err < best_err {
                        best = laser;
                        best_err = err;
                    }
                }
                Ok(best)
            }
        }
    }

    /// Local search over `(radius, azimuth)` perturbations, keeping the
    /// candidate that minimizes L1 reconstruction error against the true
    /// input. The incumbent is seeded with the unrefined estimate, so the
    /// result is never worse than it; the search terminates early once zero
    /// error is reached.
    fn refine(&self, target: Point3, initial: Point3) -> Point3 {
        let mut best = initial;
        let mut best_err = match self.to_cartesian(initial) {
            Ok(reconstructed) => reconstructed.l1_distance(target),
            Err(_) => return initial,
        };

        let window = self.search_radius;
        'search: for dr in -window..=window {
            let radius = initial.0[0] + dr;
            if radius < 0 {
                continue;
            }
            for da in -window..=window {
                if best_err == 0 {
                    break 'search;
                }
                if dr == 0 && da == 0 {
                    continue;
                }
                let candidate = Point3([radius, initial.0[1] + da, initial.0[2]]);
                let reconstructed = match self.to_cartesian(candidate) {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                let err = reconstructed.l1_distance(target);
                if err < best_err {
                    best = candidate;
                    best_err = err;
                }
            }
        }
        best
    }

    /// Inverse fixed-point transform, consistent with the forward scale
    /// factors. A laser index outside the calibration table or a radius
    /// beyond the quantization range (possible only with a corrupt residual
    /// stream) is a fatal error, not a panic.
    pub fn to_cartesian(&self, spherical: Point3) -> Result<Point3, Error> {
        let laser = spherical.0[2];
        if laser < 0 || laser as usize >= self.cal.num_lasers() {
            return Err(Error::InvalidLaserIndex(laser));
        }

        // No i32 input quantizes past this bound; larger radii would
        // overflow the Q20/Q18 products below.
        let radius = spherical.0[0] as i64;
        let max_radius = 1i64 << (32 - self.cal.radius_log2() as u32);
        if radius < 0 || radius > max_radius {
            return Err(Error::InvalidRadius(spherical.0[0]));
        }

        let r_scaled = radius << self.cal.radius_log2();

        let azimuth_shift = ANGLE_BITS - self.cal.azimuth_log2() as u32;
        let azimuth = (spherical.0[1] as i64).rem_euclid(self.cal.azimuth_scale());
        let angle = azimuth << azimuth_shift;

        let (cos, sin) = sin_cos_turns(angle);
        let x = round_shift(r_scaled * cos, TRIG_SHIFT);
        let y = round_shift(r_scaled * sin, TRIG_SHIFT);
        let z = self.cal.expected_z(laser as usize, r_scaled);

        // A component past i32 can only come from a corrupt stream; narrow
        // with a check rather than a wrapping cast.
        match (i32::try_from(x), i32::try_from(y), i32::try_from(z)) {
            (Ok(x), Ok(y), Ok(z)) => Ok(Point3([x, y, z])),
            _ => Err(Error::InvalidRadius(spherical.0[0])),
        }
    }
}

/// Single mode-checked entry point for all coordinate conversions.
///
/// Prediction and reconstruction code never calls the forward/inverse
/// transforms directly; everything is routed through this gateway, which
/// consults the one shared [`CodingMode`] value. In Cartesian mode the
/// spherical inverse formula is never applied to any node value.
pub struct DomainGateway<'a> {
    mode: CodingMode,
    origin: Point3,
    transformer: CoordinateTransformer<'a>,
}

impl<'a> DomainGateway<'a> {
    pub fn new(config: &CodecConfig, cal: &'a Calibration) -> Self {
        Self {
            mode: config.mode,
            origin: config.origin,
            transformer: CoordinateTransformer::new(cal, config.laser_mode, config.search_radius),
        }
    }

    #[inline]
    pub fn mode(&self) -> CodingMode {
        self.mode
    }

    /// Map a raw Cartesian input point into the active coding domain.
    pub fn to_coding(&self, cart: Point3, hint: Option<u32>) -> Result<Point3, Error> {
        let local = cart.wrapping_sub(self.origin);
        match self.mode {
            CodingMode::Cartesian => Ok(local),
            CodingMode::Spherical => self.transformer.to_spherical(local, hint),
        }
    }

    /// Map a reconstructed coding-domain value to an output Cartesian point.
    pub fn to_output(&self, coded: Point3) -> Result<Point3, Error> {
        match self.mode {
            CodingMode::Cartesian => Ok(self.origin.wrapping_add(coded)),
            CodingMode::Spherical => {
                let cart = self.transformer.to_cartesian(coded)?;
                Ok(self.origin.wrapping_add(cart))
            }
        }
    }
}
