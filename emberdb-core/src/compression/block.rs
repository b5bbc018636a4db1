//! Fixed-size single-series data block
//!
//! Wire layout:
//!
//! | offset | field     | type    |
//! |--------|-----------|---------|
//! | 0      | `version` | u16 LE  |
//! | 2      | `nchunks` | u16 LE  |
//! | 4      | `ntail`   | u16 LE  |
//! | 6      | `id`      | u64 LE  |
//! | 14     | body      | bytes   |
//!
//! The body holds `nchunks` compressed chunks of [`CHUNK_SIZE`] samples
//! (delta-RLE timestamps followed by predictive-coded values), then
//! `ntail` uncompressed `(u64, f64)` pairs for samples that arrived
//! after the block ran out of room for another compressed chunk.

use bytes::Buf;
use tracing::debug;

use crate::compression::bytestream::{ByteReader, ByteWriter, Placeholder};
use crate::compression::delta_rle::{DeltaRleDecoder, DeltaRleEncoder};
use crate::compression::fcm::{FcmDecoder, FcmEncoder};
use crate::compression::{BLOCK_VERSION, CHUNK_MASK, CHUNK_SIZE};
use crate::types::{ParamId, Timestamp};
use crate::{EmberError, Result};

/// Bytes of the block header: version, nchunks, ntail, series id
pub const HEADER_SIZE: usize = 14;

// Upper bound for one compressed chunk: a flag byte plus up to eight
// data bytes per value, and the delta-RLE worst case for timestamps.
const MARGIN: usize = 10 * 16 + 9 * 16;

/// Incremental writer for a single-series data block
pub struct DataBlockWriter<'a> {
    stream: ByteWriter<'a>,
    ts_encoder: DeltaRleEncoder,
    val_encoder: FcmEncoder,
    write_index: usize,
    nchunks_slot: Placeholder<u16>,
    ntail_slot: Placeholder<u16>,
    ntail: u16,
    ts_writebuf: [Timestamp; CHUNK_SIZE],
    val_writebuf: [f64; CHUNK_SIZE],
}

impl<'a> DataBlockWriter<'a> {
    /// Write the block header into `buf` and return the writer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer cannot hold the 14-byte header. Sizing the
    /// buffer is the caller's responsibility; a buffer this small is a
    /// bug, not a runtime condition.
    pub fn new(id: ParamId, buf: &'a mut [u8]) -> Self {
        let mut stream = ByteWriter::new(buf);
        let slots = Self::write_header(&mut stream, id);
        let (nchunks_slot, ntail_slot) = match slots {
            Ok(slots) => slots,
            Err(_) => panic!("buffer is too small for the block header"),
        };
        Self {
            stream,
            ts_encoder: DeltaRleEncoder::new(),
            val_encoder: FcmEncoder::new(),
            write_index: 0,
            nchunks_slot,
            ntail_slot,
            ntail: 0,
            ts_writebuf: [0; CHUNK_SIZE],
            val_writebuf: [0.0; CHUNK_SIZE],
        }
    }

    fn write_header(
        stream: &mut ByteWriter<'_>,
        id: ParamId,
    ) -> Result<(Placeholder<u16>, Placeholder<u16>)> {
        stream.put_u16(BLOCK_VERSION)?;
        let nchunks_slot = stream.allocate_u16()?;
        let ntail_slot = stream.allocate_u16()?;
        stream.put_u64(id)?;
        Ok((nchunks_slot, ntail_slot))
    }

    /// Append one sample. `Err(Overflow)` means the block is full and
    /// should be sealed; the sample was not stored.
    pub fn put(&mut self, ts: Timestamp, value: f64) -> Result<()> {
        if self.room_for_chunk() {
            // Invariant: the staged sample count equals
            // `write_index % CHUNK_SIZE`.
            self.ts_writebuf[self.write_index & CHUNK_MASK] = ts;
            self.val_writebuf[self.write_index & CHUNK_MASK] = value;
            self.write_index += 1;
            if self.write_index & CHUNK_MASK == 0 {
                let flushed = self
                    .ts_encoder
                    .tput(&mut self.stream, &self.ts_writebuf)
                    .is_ok()
                    && self
                        .val_encoder
                        .tput(&mut self.stream, &self.val_writebuf)
                        .is_ok();
                if !flushed {
                    // Reachable only if MARGIN underestimates a chunk;
                    // the staged samples are lost.
                    debug_assert!(flushed, "chunk flush rejected inside the reserved margin");
                    return Err(EmberError::Overflow);
                }
            }
            Ok(())
        } else {
            // Uncompressed tail. First taken only with an empty write
            // buffer, and `space_left` never grows after that.
            debug_assert_eq!(self.write_index & CHUNK_MASK, 0);
            self.stream.put_u64(ts)?;
            self.stream.put_f64(value)?;
            self.ntail += 1;
            self.stream.patch_u16(self.ntail_slot, self.ntail);
            Ok(())
        }
    }

    /// Seal the block: move any staged partial chunk into the
    /// uncompressed tail, patch the header counters, and return the
    /// total bytes written.
    pub fn commit(mut self) -> usize {
        let nchunks = self.write_index / CHUNK_SIZE;
        let buftail = self.write_index & CHUNK_MASK;
        if buftail != 0 {
            // A partial chunk can only be staged while the tail is
            // still empty.
            assert_eq!(self.ntail, 0, "staged samples with a non-empty tail");
            for ix in 0..buftail {
                let stored = self.stream.put_u64(self.ts_writebuf[ix]).is_ok()
                    && self.stream.put_f64(self.val_writebuf[ix]).is_ok();
                if !stored {
                    debug_assert!(stored, "tail flush rejected inside the reserved margin");
                    break;
                }
                self.ntail += 1;
            }
            self.stream.patch_u16(self.ntail_slot, self.ntail);
        }
        assert!(
            nchunks <= usize::from(u16::MAX),
            "chunk count exceeds the u16 header field"
        );
        self.stream.patch_u16(self.nchunks_slot, nchunks as u16);
        debug!(
            nchunks,
            ntail = self.ntail,
            nbytes = self.stream.size(),
            "data block sealed"
        );
        self.stream.size()
    }

    // Conservative capacity oracle: while this holds, flushing a full
    // chunk cannot fail.
    fn room_for_chunk(&self) -> bool {
        self.stream.space_left() >= MARGIN
    }
}

/// Sequential reader over a sealed data block
pub struct DataBlockReader<'a> {
    stream: ByteReader<'a>,
    ts_decoder: DeltaRleDecoder,
    val_decoder: FcmDecoder,
    read_buffer: [Timestamp; CHUNK_SIZE],
    read_index: usize,
    version: u16,
    id: ParamId,
    nchunks: usize,
    ntail: usize,
}

impl<'a> DataBlockReader<'a> {
    /// Snapshot the header and position the stream at the body.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than the block header.
    pub fn new(buf: &'a [u8]) -> Self {
        assert!(
            buf.len() >= HEADER_SIZE,
            "buffer is too small for the block header"
        );
        let mut header = &buf[..HEADER_SIZE];
        let version = header.get_u16_le();
        let nchunks = usize::from(header.get_u16_le());
        let ntail = usize::from(header.get_u16_le());
        let id = header.get_u64_le();
        Self {
            stream: ByteReader::new(&buf[HEADER_SIZE..]),
            ts_decoder: DeltaRleDecoder::new(),
            val_decoder: FcmDecoder::new(),
            read_buffer: [0; CHUNK_SIZE],
            read_index: 0,
            version,
            id,
            nchunks,
            ntail,
        }
    }

    /// Decode the next sample, or `Ok(None)` once the block is drained
    pub fn next(&mut self) -> Result<Option<(Timestamp, f64)>> {
        if self.read_index < self.nchunks * CHUNK_SIZE {
            let chunk_index = self.read_index & CHUNK_MASK;
            self.read_index += 1;
            if chunk_index == 0 {
                // entering a new chunk: pre-decode all its timestamps
                for slot in &mut self.read_buffer {
                    *slot = self.ts_decoder.next(&mut self.stream)?;
                }
            }
            let value = self.val_decoder.next(&mut self.stream)?;
            Ok(Some((self.read_buffer[chunk_index], value)))
        } else if self.read_index < self.nchunks * CHUNK_SIZE + self.ntail {
            self.read_index += 1;
            let ts = self.stream.read_u64()?;
            let value = self.stream.read_f64()?;
            Ok(Some((ts, value)))
        } else {
            Ok(None)
        }
    }

    /// Total samples stored in the block
    pub fn nelements(&self) -> usize {
        self.nchunks * CHUNK_SIZE + self.ntail
    }

    /// Series id from the header
    pub fn id(&self) -> ParamId {
        self.id
    }

    /// Format version from the header
    pub fn version(&self) -> u16 {
        self.version
    }
}
