// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Encode pipeline.
//!
//! Data flow per frame: raw Cartesian points → canonical coded-domain values
//! via the [`DomainGateway`] (one transform per duplicate group) → per-node
//! prediction and residual in the coding domain → residual components handed
//! to the entropy backend in sequence order. The encoder maintains the same
//! `reconstructed[]` array the decoder will rebuild, and continues its own
//! predictions from it, never from pre-quantization values.

use log::{debug, trace};

use crate::calibration::Calibration;
use crate::codec::{CodecConfig, CodingMode, Error, Point3, PointFrame};
use crate::entropy::{ByteWriter, ResidualWriter};
use crate::predict;
use crate::stream::FrameHeader;
use crate::transform::DomainGateway;
use crate::tree::{assign_begin_values, ChainSelector, ParentSelector, TreeShape};

/// Per-stream geometry encoder.
pub struct Encoder<'a> {
    config: CodecConfig,
    cal: &'a Calibration,
}

impl<'a> Encoder<'a> {
    pub fn new(config: CodecConfig, cal: &'a Calibration) -> Result<Self, Error> {
        if config.search_radius < 0 {
            return Err(Error::Config(format!(
                "negative search radius {}",
                config.search_radius
            )));
        }
        Ok(Self { config, cal })
    }

    /// Whether this stream codes the secondary Cartesian correction
    /// residual. The correction only exists where the forward transform is
    /// lossy, so Cartesian mode never carries it.
    fn corrects(&self) -> bool {
        self.config.cartesian_correction && self.config.mode == CodingMode::Spherical
    }

    /// Encode a frame into a self-describing byte stream (header followed by
    /// the default byte-backend residual payload).
    pub fn encode(&self, frame: &PointFrame) -> Result<Vec<u8>, Error> {
        let header = FrameHeader {
            mode: self.config.mode,
            laser_mode: self.config.laser_mode,
            cartesian_correction: self.corrects(),
            radius_log2: self.cal.radius_log2(),
            azimuth_log2: self.cal.azimuth_log2(),
            origin: self.config.origin,
            calibration_digest: self.cal.digest(),
            groups: frame.groups().to_vec(),
        };
        let mut out = Vec::new();
        header.write(&mut out);

        let mut sink = ByteWriter::new();
        self.encode_residuals(frame, &ChainSelector, &mut sink)?;
        let payload = sink.into_bytes();
        debug!(
            "encoded frame: {} points, {} groups, {} mode, {} payload bytes",
            frame.len(),
            frame.groups().len(),
            self.config.mode,
            payload.len()
        );
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Encode only the residual stream through a caller-supplied entropy
    /// backend, using `selector` for tree construction. The decode side must
    /// use the same selector; the wire carries group boundaries only.
    pub fn encode_residuals(
        &self,
        frame: &PointFrame,
        selector: &dyn ParentSelector,
        sink: &mut dyn ResidualWriter,
    ) -> Result<(), Error> {
        let gateway = DomainGateway::new(&self.config, self.cal);
        let shape = TreeShape::build(frame.len(), frame.groups(), selector)?;
        let begin = assign_begin_values(
            frame.points(),
            frame.groups(),
            frame.laser_hints(),
            &gateway,
        )?;

        let corrects = self.corrects();
        let mut reconstructed = vec![Point3::POISON; frame.len()];
        for i in 0..frame.len() {
            let predicted = predict::predicted_value(&shape, &reconstructed, i, self.config.mode);
            let residual = begin[i].wrapping_sub(predicted);
            for component in residual.0 {
                sink.write_component(component)?;
            }
            reconstructed[i] = predict::reconstruct(predicted, residual);
            trace!(
                "node {}: begin {:?} predicted {:?} residual {:?}",
                i,
                begin[i],
                predicted,
                residual
            );

            if corrects {
                let output = gateway.to_output(reconstructed[i])?;
                let correction = frame.points()[i].wrapping_sub(output);
                for component in correction.0 {
                    sink.write_component(component)?;
                }
            }
        }
        Ok(())
    }
}
