// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! EdgeFirst LiDAR Geometry Codec Library
//!
//! Angular-mode predictive geometry coder for LiDAR point clouds: each point
//! is represented either in Cartesian form or in a sensor-native spherical
//! form (radius, azimuth, laser index), a prediction tree is built over the
//! point sequence, and every point is coded as a small residual against a
//! prediction derived from already-coded points and calibration data.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────────┐
//! │  PointFrame  │ ─► │ DomainGateway │ ─► │  TreeShape +     │
//! │ (points +    │    │ (mode-checked │    │  begin values    │
//! │  dup groups) │    │  transforms)  │    │  (arena arrays)  │
//! └──────────────┘    └───────────────┘    └──────────────────┘
//!                                                   │
//!                                                   ▼
//!                     ┌───────────────┐    ┌──────────────────┐
//!                     │ ResidualWriter│ ◄─ │ predict::        │
//!                     │ /Reader       │    │ predicted_value  │
//!                     │ (entropy seam)│    │ + reconstruct    │
//!                     └───────────────┘    └──────────────────┘
//! ```
//!
//! The decoder mirrors the encoder exactly: it reconstructs its
//! configuration from the frame header, rebuilds the same tree shape from
//! the transmitted duplicate-group boundaries, and consumes residuals in the
//! same sequence order. Both sides share one prediction function and one
//! fixed-point inverse transform, so reconstructed values agree bit for bit.
//!
//! # Modules
//!
//! - [`codec`]: common types, configuration, and error handling
//! - [`calibration`]: per-laser calibration table and scale parameters
//! - [`transform`]: fixed-point coordinate transforms and the domain gateway
//! - [`tree`]: prediction tree construction and canonical-value assignment
//! - [`predict`]: per-node predictor selection and reconstruction
//! - [`entropy`]: entropy-backend seam and the default byte backend
//! - [`stream`]: frame header wire format
//! - [`encoder`] / [`decoder`]: the two pipeline ends
//!
//! # Example
//!
//! ```
//! use edgefirst_lidarcodec::{
//!     Calibration, CodecConfig, Decoder, Encoder, LaserEntry, Point3, PointFrame,
//! };
//!
//! # fn main() -> Result<(), edgefirst_lidarcodec::Error> {
//! let cal = Calibration::new(vec![LaserEntry { tangent: 0, z_offset: 0 }], 0, 12)?;
//! let encoder = Encoder::new(CodecConfig::default(), &cal)?;
//!
//! // Two duplicate points collapse to one canonical spherical value.
//! let frame = PointFrame::from_points(
//!     vec![Point3([100, 0, 0]), Point3([100, 0, 0]), Point3([98, 40, 0])],
//!     None,
//! )?;
//!
//! let bytes = encoder.encode(&frame)?;
//! let decoded = Decoder::new(&cal).decode(&bytes)?;
//! assert_eq!(decoded, frame.points());
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod entropy;
pub mod predict;
pub mod stream;
pub mod transform;
pub mod tree;

// Re-exports for convenience
pub use calibration::{Calibration, LaserEntry};
pub use codec::{CodecConfig, CodingMode, DupGroup, Error, LaserIndexMode, Point3, PointFrame};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use entropy::{ResidualReader, ResidualWriter};
pub use stream::FrameHeader;
pub use transform::{CoordinateTransformer, DomainGateway};
pub use tree::{ChainSelector, ParentSelector};
