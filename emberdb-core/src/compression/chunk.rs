//! Variable-size multi-series chunk codec and order conversion
//!
//! Chunk format, all fields little-endian:
//!
//! ```text
//! u32 paramid_stream_size    ; bytes
//! [paramid stream]           ; delta-RLE varints
//! u32 timestamp_stream_size  ; bytes
//! [timestamp stream]         ; delta-RLE varints
//! u32 ncolumns               ; always 1
//! u32 value_stream_prefix    ; ELEMENT COUNT, not bytes
//! [value stream]             ; predictive double codec
//! ```
//!
//! The value-stream prefix carries the element count while the other
//! prefixes carry byte sizes. The asymmetry is part of the wire format;
//! readers depend on it and it must not be normalised.

use std::mem;

use tracing::trace;

use crate::compression::bytestream::{ByteReader, ByteWriter};
use crate::compression::delta_rle::{DeltaRleDecoder, DeltaRleEncoder};
use crate::compression::fcm::{compress_doubles, decompress_doubles};
use crate::types::{Timestamp, UncompressedChunk};
use crate::{EmberError, Result};

/// Sink for encoded chunks; the page layer of the full engine stands
/// behind this in production.
pub trait ChunkWriter {
    /// Hand out the writable range for the next chunk. The codec keeps
    /// the last `2 * size_of::<u32>()` bytes free for the caller's own
    /// offset bookkeeping.
    fn allocate(&mut self) -> Result<&mut [u8]>;

    /// Seal `nbytes` of the previously allocated range
    fn commit(&mut self, nbytes: usize) -> Result<()>;
}

/// Summary of one encoded chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Samples stored in the chunk
    pub n_elements: u32,
    /// Smallest timestamp seen
    pub ts_begin: Timestamp,
    /// Largest timestamp seen
    pub ts_end: Timestamp,
}

/// Encode one multi-series batch into the writer's next range. Any
/// write rejection aborts the whole chunk with `Overflow`; partially
/// written streams are not readable.
pub fn encode_chunk(
    writer: &mut dyn ChunkWriter,
    data: &UncompressedChunk,
) -> Result<ChunkSummary> {
    let range = writer.allocate()?;
    let reserved = 2 * mem::size_of::<u32>();
    let usable = range
        .len()
        .checked_sub(reserved)
        .ok_or(EmberError::Overflow)?;
    let mut stream = ByteWriter::new(&mut range[..usable]);

    // paramid stream, byte-size prefixed
    let size_slot = stream.allocate_u32()?;
    let mark = stream.size();
    let mut paramid_stream = DeltaRleEncoder::new();
    for &id in &data.paramids {
        paramid_stream.put(&mut stream, id)?;
    }
    paramid_stream.commit(&mut stream)?;
    stream.patch_u32(size_slot, (stream.size() - mark) as u32);

    // timestamp stream, byte-size prefixed
    let size_slot = stream.allocate_u32()?;
    let mark = stream.size();
    let mut timestamp_stream = DeltaRleEncoder::new();
    let mut ts_begin = Timestamp::MAX;
    let mut ts_end = Timestamp::MIN;
    for &ts in &data.timestamps {
        ts_begin = ts_begin.min(ts);
        ts_end = ts_end.max(ts);
        timestamp_stream.put(&mut stream, ts)?;
    }
    timestamp_stream.commit(&mut stream)?;
    stream.patch_u32(size_slot, (stream.size() - mark) as u32);

    // single value column
    stream.put_u32(1)?;

    // value stream, element-count prefixed
    let count_slot = stream.allocate_u32()?;
    let count = compress_doubles(&data.values, &mut stream)?;
    stream.patch_u32(count_slot, count as u32);

    let nbytes = stream.size();
    writer.commit(nbytes)?;
    trace!(nbytes, n_elements = data.len(), "chunk encoded");
    Ok(ChunkSummary {
        n_elements: data.paramids.len() as u32,
        ts_begin,
        ts_end,
    })
}

/// Decode a chunk of `nelements` samples. The stream byte sizes on the
/// wire are informational; decoding is count-driven throughout, with
/// the value count taken from the wire itself.
pub fn decode_chunk(data: &[u8], nelements: u32) -> Result<UncompressedChunk> {
    let mut stream = ByteReader::new(data);
    let mut chunk = UncompressedChunk::with_capacity(nelements as usize);

    let _paramid_bytes = stream.read_u32()?;
    let mut paramid_stream = DeltaRleDecoder::new();
    for _ in 0..nelements {
        chunk.paramids.push(paramid_stream.next(&mut stream)?);
    }

    let _timestamp_bytes = stream.read_u32()?;
    let mut timestamp_stream = DeltaRleDecoder::new();
    for _ in 0..nelements {
        chunk.timestamps.push(timestamp_stream.next(&mut stream)?);
    }

    let _ncolumns = stream.read_u32()?;

    let nvalues = stream.read_u32()?;
    chunk.values = decompress_doubles(&mut stream, nvalues as usize)?;

    Ok(chunk)
}

fn reorder_by(data: &UncompressedChunk, keys: &[u64]) -> Option<UncompressedChunk> {
    let len = data.timestamps.len();
    if len != data.values.len() || len != data.paramids.len() {
        return None;
    }
    let mut index: Vec<usize> = (0..len).collect();
    // stable, key-only: ties keep their input order
    index.sort_by_key(|&ix| keys[ix]);

    let mut out = UncompressedChunk::with_capacity(len);
    for &ix in &index {
        out.push(data.paramids[ix], data.timestamps[ix], data.values[ix]);
    }
    Some(out)
}

/// Stable-reorder a series-major batch into time order. `None` if the
/// column lengths disagree.
pub fn convert_from_chunk_order(data: &UncompressedChunk) -> Option<UncompressedChunk> {
    reorder_by(data, &data.timestamps)
}

/// Stable-reorder a time-major batch into series order. `None` if the
/// column lengths disagree.
pub fn convert_from_time_order(data: &UncompressedChunk) -> Option<UncompressedChunk> {
    reorder_by(data, &data.paramids)
}
