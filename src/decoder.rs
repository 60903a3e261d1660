// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Decode pipeline (encoder mirror).
//!
//! The decoder reconstructs its configuration from the frame header (the
//! coding-mode selector is read from the stream, never re-derived), then
//! rebuilds the identical tree shape from the transmitted group boundaries
//! and consumes residuals in the same sequence order the encoder emitted
//! them. Traversal order is part of the wire contract: consuming two sibling
//! nodes' residuals out of order produces divergent output.

use log::debug;

use crate::calibration::Calibration;
use crate::codec::{CodecConfig, CodingMode, Error, Point3};
use crate::entropy::{ByteReader, ResidualReader};
use crate::predict;
use crate::stream::FrameHeader;
use crate::transform::DomainGateway;
use crate::tree::{ChainSelector, ParentSelector, TreeShape};

/// Per-stream geometry decoder.
pub struct Decoder<'a> {
    cal: &'a Calibration,
}

impl<'a> Decoder<'a> {
    pub fn new(cal: &'a Calibration) -> Self {
        Self { cal }
    }

    /// Decode a self-describing byte stream produced by
    /// [`crate::encoder::Encoder::encode`] into reconstructed Cartesian
    /// points.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<Point3>, Error> {
        let (header, consumed) = FrameHeader::read(data)?;
        header.check_calibration(self.cal)?;

        // Every node carries at least one payload byte per coded component;
        // a header claiming more points than that is corrupt and must be
        // rejected before the point count can size any allocation.
        let payload = &data[consumed..];
        let corrects = header.cartesian_correction && header.mode == CodingMode::Spherical;
        let components = if corrects { 6u64 } else { 3 };
        if header.n_points() as u64 * components > payload.len() as u64 {
            return Err(Error::InvalidHeader(format!(
                "{} points exceed the {} byte payload",
                header.n_points(),
                payload.len()
            )));
        }

        let mut source = ByteReader::new(payload);
        let points = self.decode_residuals(&header, &ChainSelector, &mut source)?;
        debug!(
            "decoded frame: {} points, {} groups, {} mode",
            points.len(),
            header.groups.len(),
            header.mode
        );
        Ok(points)
    }

    /// Decode the residual stream for a parsed header through a
    /// caller-supplied entropy backend. `selector` must match the one the
    /// encoder used.
    pub fn decode_residuals(
        &self,
        header: &FrameHeader,
        selector: &dyn ParentSelector,
        source: &mut dyn ResidualReader,
    ) -> Result<Vec<Point3>, Error> {
        let config = CodecConfig {
            mode: header.mode,
            laser_mode: header.laser_mode,
            origin: header.origin,
            cartesian_correction: header.cartesian_correction,
            ..Default::default()
        };
        let gateway = DomainGateway::new(&config, self.cal);
        let n_points = header.n_points();
        let shape = TreeShape::build(n_points, &header.groups, selector)?;

        let corrects = header.cartesian_correction && header.mode == CodingMode::Spherical;
        let mut reconstructed = vec![Point3::POISON; n_points];
        let mut output = Vec::with_capacity(n_points);
        for i in 0..n_points {
            let predicted = predict::predicted_value(&shape, &reconstructed, i, header.mode);
            let mut residual = Point3::ZERO;
            for component in &mut residual.0 {
                *component = source.read_component()?;
            }
            reconstructed[i] = predict::reconstruct(predicted, residual);

            let mut cart = gateway.to_output(reconstructed[i])?;
            if corrects {
                let mut correction = Point3::ZERO;
                for component in &mut correction.0 {
                    *component = source.read_component()?;
                }
                cart = cart.wrapping_add(correction);
            }
            output.push(cart);
        }
        Ok(output)
    }
}
