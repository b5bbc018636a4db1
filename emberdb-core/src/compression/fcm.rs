//! Predictive XOR codec for IEEE-754 doubles
//!
//! Each value is bit-cast and XORed against an FCM prediction. Only
//! the meaningful bytes of the difference go on the wire, described by
//! a 4-bit flag: the low three bits carry `nbytes - 1`, the high bit
//! selects whether the leading or the trailing bytes of the difference
//! were kept. Flags for two successive values share one byte, so the
//! encoder holds a pending value and emits on every odd-indexed `put`.
//! `commit` terminates an odd sequence with a one-byte pad value that
//! keeps the reader's pair rhythm intact.
//!
//! Bit patterns round-trip exactly; NaN payloads and `-0.0` survive.

use crate::compression::bytestream::{ByteReader, ByteWriter};
use crate::compression::predictor::FcmPredictor;
use crate::compression::PREDICTOR_N;
use crate::Result;

/// Pick the flag nibble for a difference word. `leading_zeros` and
/// `trailing_zeros` are both 64 when the diff is zero, which lands in
/// the trailing-byte branch with a single zero byte on the wire.
fn flag_for(diff: u64) -> u8 {
    let leading = diff.leading_zeros();
    let trailing = diff.trailing_zeros();
    if trailing > leading {
        // low-precision value: keep the leading bytes
        let mut nbytes = 8 - trailing / 8;
        if nbytes > 0 {
            nbytes -= 1;
        }
        8 | (nbytes as u8 & 7)
    } else {
        let mut nbytes = 8 - leading / 8;
        if nbytes > 0 {
            nbytes -= 1;
        }
        nbytes as u8 & 7
    }
}

/// Emit `(flag & 7) + 1` bytes of the difference, little-endian. The
/// high flag bit shifts the kept bytes down first.
fn encode_diff(stream: &mut ByteWriter<'_>, diff: u64, flag: u8) -> Result<()> {
    let nbytes = (flag & 7) as usize + 1;
    let shifted = if flag & 8 != 0 {
        diff >> (64 - nbytes * 8)
    } else {
        diff
    };
    let bytes = shifted.to_le_bytes();
    stream.put_slice(&bytes[..nbytes])
}

fn decode_diff(stream: &mut ByteReader<'_>, flag: u8) -> Result<u64> {
    let nbytes = (flag & 7) as usize + 1;
    let mut bytes = [0u8; 8];
    stream.read_exact(&mut bytes[..nbytes])?;
    let mut diff = u64::from_le_bytes(bytes);
    if flag & 8 != 0 {
        diff <<= 64 - nbytes * 8;
    }
    Ok(diff)
}

/// Streaming encoder for the paired-flag double codec
#[derive(Debug)]
pub struct FcmEncoder {
    predictor: FcmPredictor,
    prev_diff: u64,
    prev_flag: u8,
    nelements: usize,
}

impl FcmEncoder {
    /// Create an encoder with a fresh predictor
    pub fn new() -> Self {
        Self {
            predictor: FcmPredictor::new(PREDICTOR_N),
            prev_diff: 0,
            prev_flag: 0,
            nelements: 0,
        }
    }

    /// Append one value. Even-indexed values are buffered; odd-indexed
    /// values emit the shared flag byte and both encoded differences.
    pub fn put(&mut self, stream: &mut ByteWriter<'_>, value: f64) -> Result<()> {
        let bits = value.to_bits();
        let predicted = self.predictor.predict_next();
        self.predictor.update(bits);
        let diff = bits ^ predicted;
        let flag = flag_for(diff);

        if self.nelements % 2 == 0 {
            self.prev_diff = diff;
            self.prev_flag = flag;
        } else {
            stream.put_u8((self.prev_flag << 4) | flag)?;
            encode_diff(stream, self.prev_diff, self.prev_flag)?;
            encode_diff(stream, diff, flag)?;
        }
        self.nelements += 1;
        Ok(())
    }

    /// Flush a pending odd value, padded with a one-byte zero diff so
    /// the reader keeps consuming whole pairs. Idempotent.
    pub fn commit(&mut self, stream: &mut ByteWriter<'_>) -> Result<()> {
        if self.nelements % 2 != 0 {
            stream.put_u8(self.prev_flag << 4)?;
            encode_diff(stream, self.prev_diff, self.prev_flag)?;
            encode_diff(stream, 0, 0)?;
            self.nelements += 1;
        }
        stream.commit()
    }

    /// Compress a full chunk of values and flush the pair buffer
    pub fn tput(&mut self, stream: &mut ByteWriter<'_>, values: &[f64]) -> Result<()> {
        for &value in values {
            self.put(stream, value)?;
        }
        self.commit(stream)
    }
}

impl Default for FcmEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming decoder, the exact inverse of [`FcmEncoder`]
#[derive(Debug)]
pub struct FcmDecoder {
    predictor: FcmPredictor,
    flags: u8,
    iter: usize,
}

impl FcmDecoder {
    /// Create a decoder with a fresh predictor
    pub fn new() -> Self {
        Self {
            predictor: FcmPredictor::new(PREDICTOR_N),
            flags: 0,
            iter: 0,
        }
    }

    /// Decode the next value. The caller supplies the value count; the
    /// pair protocol guarantees whole flag bytes are consumed.
    pub fn next(&mut self, stream: &mut ByteReader<'_>) -> Result<f64> {
        let flag = if self.iter % 2 == 0 {
            self.flags = stream.read_u8()?;
            self.flags >> 4
        } else {
            self.flags & 0x0F
        };
        self.iter += 1;

        let diff = decode_diff(stream, flag)?;
        let predicted = self.predictor.predict_next();
        let bits = predicted ^ diff;
        self.predictor.update(bits);
        Ok(f64::from_bits(bits))
    }
}

impl Default for FcmDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress `values` with a fresh predictor and return the element
/// count. The chunk format stores this count, not the byte size, so a
/// reader cannot skip the stream without walking it.
pub fn compress_doubles(values: &[f64], stream: &mut ByteWriter<'_>) -> Result<usize> {
    let mut encoder = FcmEncoder::new();
    for &value in values {
        encoder.put(stream, value)?;
    }
    encoder.commit(stream)?;
    Ok(values.len())
}

/// Decompress `count` values written by [`compress_doubles`]
pub fn decompress_doubles(stream: &mut ByteReader<'_>, count: usize) -> Result<Vec<f64>> {
    let mut decoder = FcmDecoder::new();
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(decoder.next(stream)?);
    }
    Ok(values)
}
