// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Entropy-backend seam.
//!
//! The codec treats the entropy stage as an external, reliable,
//! order-preserving channel: exactly one component write/read per coded
//! component per node, in the fixed traversal order. Two backends are
//! provided:
//!
//! - [`ByteWriter`]/[`ByteReader`]: the default wire backend, ZigZag
//!   mapping plus LEB128 varints over a byte buffer.
//! - [`RecordingWriter`]/[`SliceReader`]: a component-level backend for
//!   tests and for callers plugging in their own entropy coder.
//!
//! Channel exhaustion or a malformed varint surfaces as a fatal decode
//! error; reconstruction of the frame is aborted, not retried.

use crate::codec::Error;

/// Sink side of the entropy channel.
pub trait ResidualWriter {
    /// Write one residual component.
    fn write_component(&mut self, value: i32) -> Result<(), Error>;
}

/// Source side of the entropy channel.
pub trait ResidualReader {
    /// Read the next residual component.
    fn read_component(&mut self) -> Result<i32, Error>;
}

/// Map a signed component onto the unsigned varint domain.
#[inline]
fn zigzag(value: i32) -> u32 {
    ((value as u32) << 1) ^ ((value >> 31) as u32)
}

/// Inverse of [`zigzag`].
#[inline]
fn unzigzag(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Append an LEB128 varint to `out`.
pub(crate) fn write_varint(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Read an LEB128 varint from `data` at `pos`, advancing `pos`.
pub(crate) fn read_varint(data: &[u8], pos: &mut usize) -> Result<u32, Error> {
    let mut value = 0u32;
    let mut shift = 0u32;
    loop {
        let byte = *data.get(*pos).ok_or(Error::TruncatedStream(*pos))?;
        *pos += 1;
        // A u32 varint never spans more than 5 bytes.
        if shift >= 32 || (shift == 28 && byte > 0x0f) {
            return Err(Error::InvalidVarint(*pos - 1));
        }
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Default byte-stream residual sink.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the writer, returning the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl ResidualWriter for ByteWriter {
    fn write_component(&mut self, value: i32) -> Result<(), Error> {
        write_varint(&mut self.buf, zigzag(value));
        Ok(())
    }
}

/// Default byte-stream residual source.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Byte position of the next read.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl ResidualReader for ByteReader<'_> {
    fn read_component(&mut self) -> Result<i32, Error> {
        read_varint(self.data, &mut self.pos).map(unzigzag)
    }
}

/// Component-recording sink for tests and custom entropy backends.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub components: Vec<i32>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResidualWriter for RecordingWriter {
    fn write_component(&mut self, value: i32) -> Result<(), Error> {
        self.components.push(value);
        Ok(())
    }
}

/// Component-slice source matching [`RecordingWriter`].
#[derive(Debug)]
pub struct SliceReader<'a> {
    components: &'a [i32],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(components: &'a [i32]) -> Self {
        Self { components, pos: 0 }
    }
}

impl ResidualReader for SliceReader<'_> {
    fn read_component(&mut self) -> Result<i32, Error> {
        let value = *self
            .components
            .get(self.pos)
            .ok_or(Error::TruncatedStream(self.pos))?;
        self.pos += 1;
        Ok(value)
    }
}
