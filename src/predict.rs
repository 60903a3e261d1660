// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-node prediction.
//!
//! Predictor selection is a pure function of the tree shape and the active
//! coding mode, so the encoder and decoder derive the same predictor for
//! every node without signaling. Predictions are always computed from
//! *reconstructed* ancestor values, never from pre-quantization truth. That
//! equality is what makes the residual round-trip lossless even though the
//! forward transform is not invertible.

use crate::codec::{CodingMode, Point3};
use crate::tree::{TreeShape, ROOT};

/// Predictor variants, in the order the selection rule tries them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predictor {
    /// Root node: predict zero, the residual carries the full value.
    Root,
    /// Carry over the parent's reconstructed value.
    Parent,
    /// Parent plus the parent-to-grandparent azimuth delta (Spherical mode
    /// linear extrapolation across the scan).
    ParentAzimuthDelta,
    /// Duplicate member: predict the group's first reconstructed value.
    GroupFirst,
}

/// Select the predictor for node `i`.
pub fn select(shape: &TreeShape, i: usize, mode: CodingMode) -> Predictor {
    if shape.group_first(i) as usize != i {
        return Predictor::GroupFirst;
    }
    match shape.parent(i) {
        ROOT => Predictor::Root,
        p => {
            if mode == CodingMode::Spherical && shape.parent(p as usize) != ROOT {
                Predictor::ParentAzimuthDelta
            } else {
                Predictor::Parent
            }
        }
    }
}

/// Compute the predicted coding-domain value for node `i`.
///
/// `reconstructed` must hold final values for every index the shape reaches
/// from `i` (all of which precede `i` in sequence order).
pub fn predicted_value(
    shape: &TreeShape,
    reconstructed: &[Point3],
    i: usize,
    mode: CodingMode,
) -> Point3 {
    match select(shape, i, mode) {
        Predictor::Root => Point3::ZERO,
        Predictor::GroupFirst => reconstructed[shape.group_first(i) as usize],
        Predictor::Parent => reconstructed[shape.parent(i) as usize],
        Predictor::ParentAzimuthDelta => {
            let p = shape.parent(i) as usize;
            let gp = shape.parent(p) as usize;
            let parent = reconstructed[p];
            let delta = parent.0[1].wrapping_sub(reconstructed[gp].0[1]);
            Point3([parent.0[0], parent.0[1].wrapping_add(delta), parent.0[2]])
        }
    }
}

/// Reconstruct a node value from its prediction and transmitted residual.
/// The encoder and decoder both use this function, so the reconstructed
/// arrays agree bit for bit.
#[inline]
pub fn reconstruct(predicted: Point3, residual: Point3) -> Point3 {
    predicted.wrapping_add(residual)
}
