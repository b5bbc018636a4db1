//! Delta plus run-length codec for unsigned integer sequences
//!
//! Values are reduced to first-order differences (wrapping, so
//! out-of-order inputs still round-trip), consecutive equal differences
//! collapse into `(run_length, delta)` pairs, and every integer is
//! emitted as a base-128 varint. The first value rides as a delta from
//! zero, i.e. an absolute varint. There is no terminator on the wire;
//! the decoder is driven by an externally-supplied element count.

use crate::compression::bytestream::{ByteReader, ByteWriter};
use crate::{EmberError, Result};

/// Longest LEB128 encoding of a u64
const MAX_VARINT_LEN: usize = 10;

/// Append a base-128 varint: 7 data bits per byte, continuation bit in
/// the MSB. All-or-nothing on overflow.
fn put_varint(stream: &mut ByteWriter<'_>, value: u64) -> Result<()> {
    let mut encoded = [0u8; MAX_VARINT_LEN];
    let mut len = 0;
    let mut value = value;
    while value >= 0x80 {
        encoded[len] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        len += 1;
    }
    encoded[len] = value as u8;
    stream.put_slice(&encoded[..=len])
}

fn read_varint(stream: &mut ByteReader<'_>) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = stream.read_u8()?;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(EmberError::BadData("varint is longer than 10 bytes"));
        }
    }
}

/// Streaming delta-RLE encoder
///
/// Reusable across [`commit`](Self::commit) calls: the pending run is
/// flushed but the delta base carries over, which is what the block
/// codec relies on when it compresses one chunk at a time.
#[derive(Debug, Default)]
pub struct DeltaRleEncoder {
    prev: u64,
    run_delta: u64,
    run_length: u64,
}

impl DeltaRleEncoder {
    /// Create an encoder with a zero delta base
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value
    pub fn put(&mut self, stream: &mut ByteWriter<'_>, value: u64) -> Result<()> {
        let delta = value.wrapping_sub(self.prev);
        if delta != self.run_delta {
            self.flush_run(stream)?;
            self.run_delta = delta;
        }
        self.prev = value;
        self.run_length += 1;
        Ok(())
    }

    fn flush_run(&mut self, stream: &mut ByteWriter<'_>) -> Result<()> {
        if self.run_length > 0 {
            put_varint(stream, self.run_length)?;
            put_varint(stream, self.run_delta)?;
            self.run_length = 0;
        }
        Ok(())
    }

    /// Flush the pending run. Idempotent.
    pub fn commit(&mut self, stream: &mut ByteWriter<'_>) -> Result<()> {
        self.flush_run(stream)?;
        stream.commit()
    }

    /// Compress a full slice and flush in one call
    pub fn tput(&mut self, stream: &mut ByteWriter<'_>, values: &[u64]) -> Result<()> {
        for &value in values {
            self.put(stream, value)?;
        }
        self.commit(stream)
    }
}

/// Streaming delta-RLE decoder, the exact inverse of [`DeltaRleEncoder`]
#[derive(Debug, Default)]
pub struct DeltaRleDecoder {
    prev: u64,
    run_delta: u64,
    run_remaining: u64,
}

impl DeltaRleDecoder {
    /// Create a decoder with a zero delta base
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next value. The caller supplies the element count;
    /// reading past the encoded data fails with `OutOfData`.
    pub fn next(&mut self, stream: &mut ByteReader<'_>) -> Result<u64> {
        if self.run_remaining == 0 {
            self.run_remaining = read_varint(stream)?;
            self.run_delta = read_varint(stream)?;
            if self.run_remaining == 0 {
                return Err(EmberError::BadData("zero-length run"));
            }
        }
        self.run_remaining -= 1;
        self.prev = self.prev.wrapping_add(self.run_delta);
        Ok(self.prev)
    }
}
