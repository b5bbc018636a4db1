//! Compression codecs for time-series data
//!
//! Values go through a predictive XOR codec: each double is XORed
//! against a hash-table prediction and only the meaningful bytes of the
//! difference are stored, with two 4-bit flags packed per byte.
//! Timestamps and series ids go through delta plus run-length encoding
//! with base-128 varints. Typical blocks land at 2-4 bytes per sample.
//!
//! The writer and reader sides of a format rebuild identical predictor
//! state from scratch, so the predictor parameters below are wire
//! constants even though they never appear in the byte stream.

mod block;
mod bytestream;
mod chunk;
mod delta_rle;
mod fcm;
mod predictor;

pub use block::{DataBlockReader, DataBlockWriter, HEADER_SIZE};
pub use bytestream::{ByteReader, ByteWriter, Placeholder};
pub use chunk::{
    convert_from_chunk_order, convert_from_time_order, decode_chunk, encode_chunk, ChunkSummary,
    ChunkWriter,
};
pub use delta_rle::{DeltaRleDecoder, DeltaRleEncoder};
pub use fcm::{compress_doubles, decompress_doubles, FcmDecoder, FcmEncoder};
pub use predictor::{DfcmPredictor, FcmPredictor};

/// On-disk format version stored in every data block header
pub const BLOCK_VERSION: u16 = 1;

/// Samples per compressed chunk inside a data block. Readers and
/// writers must agree on this power of two.
pub const CHUNK_SIZE: usize = 16;

pub(crate) const CHUNK_MASK: usize = CHUNK_SIZE - 1;

/// Predictor table size fixed by the value codec wire format
pub const PREDICTOR_N: usize = 1 << 10;
