//! Property-based round-trip tests for the compression codecs

use emberdb_core::compression::{
    compress_doubles, convert_from_chunk_order, decode_chunk, decompress_doubles, encode_chunk,
    ByteReader, ByteWriter, ChunkWriter, DataBlockReader, DataBlockWriter, DeltaRleDecoder,
    DeltaRleEncoder,
};
use emberdb_core::{Result, UncompressedChunk};
use proptest::prelude::*;

/// Any f64 bit pattern, NaN payloads included
fn arb_double() -> impl Strategy<Value = f64> {
    any::<u64>().prop_map(f64::from_bits)
}

fn bits_of(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

/// In-memory chunk sink used by the chunk codec properties
struct VecChunkWriter {
    buf: Vec<u8>,
    committed: usize,
}

impl ChunkWriter for VecChunkWriter {
    fn allocate(&mut self) -> Result<&mut [u8]> {
        Ok(&mut self.buf)
    }

    fn commit(&mut self, nbytes: usize) -> Result<()> {
        self.committed = nbytes;
        Ok(())
    }
}

proptest! {
    /// Decoding an encoded double sequence returns the exact bit
    /// patterns, odd lengths included.
    #[test]
    fn prop_double_codec_roundtrip(values in prop::collection::vec(arb_double(), 0..300)) {
        let mut buf = vec![0u8; values.len() * 9 + 16];
        let mut writer = ByteWriter::new(&mut buf);
        let count = compress_doubles(&values, &mut writer).unwrap();
        prop_assert_eq!(count, values.len());
        let written = writer.size();

        let mut reader = ByteReader::new(&buf[..written]);
        let decoded = decompress_doubles(&mut reader, count).unwrap();
        prop_assert_eq!(bits_of(&values), bits_of(&decoded));
        // odd sequences leave exactly the one-byte commit pad unread
        prop_assert_eq!(reader.remaining(), values.len() % 2);
    }

    /// Delta-RLE round-trips arbitrary u64 sequences given the element
    /// count.
    #[test]
    fn prop_delta_rle_roundtrip(values in prop::collection::vec(any::<u64>(), 0..300)) {
        let mut buf = vec![0u8; values.len() * 12 + 16];
        let mut writer = ByteWriter::new(&mut buf);
        let mut encoder = DeltaRleEncoder::new();
        encoder.tput(&mut writer, &values).unwrap();
        let written = writer.size();

        let mut reader = ByteReader::new(&buf[..written]);
        let mut decoder = DeltaRleDecoder::new();
        let mut decoded = Vec::with_capacity(values.len());
        for _ in 0..values.len() {
            decoded.push(decoder.next(&mut reader).unwrap());
        }
        prop_assert_eq!(decoded, values);
        prop_assert_eq!(reader.remaining(), 0);
    }

    /// A sealed data block yields every accepted sample, in order, with
    /// exact value bits.
    #[test]
    fn prop_data_block_roundtrip(
        id in any::<u64>(),
        start in 0u64..u64::MAX / 2,
        steps in prop::collection::vec((0u64..100_000, arb_double()), 1..200),
    ) {
        let mut buf = vec![0u8; 1 << 16];
        let mut writer = DataBlockWriter::new(id, &mut buf);
        let mut samples = Vec::with_capacity(steps.len());
        let mut ts = start;
        for &(step, value) in &steps {
            ts += step;
            writer.put(ts, value).unwrap();
            samples.push((ts, value));
        }
        let written = writer.commit();

        let mut reader = DataBlockReader::new(&buf[..written]);
        prop_assert_eq!(reader.id(), id);
        prop_assert_eq!(reader.nelements(), samples.len());
        for &(ts, value) in &samples {
            let (got_ts, got_value) = reader.next().unwrap().unwrap();
            prop_assert_eq!(got_ts, ts);
            prop_assert_eq!(got_value.to_bits(), value.to_bits());
        }
        prop_assert_eq!(reader.next().unwrap(), None);
    }

    /// Whatever a size-constrained block accepts before overflowing is
    /// exactly what a reader gets back.
    #[test]
    fn prop_data_block_overflow_preserves_accepted_puts(
        bufsize in 64usize..2048,
        samples in prop::collection::vec((0u64..100_000, arb_double()), 0..500),
    ) {
        let mut buf = vec![0u8; bufsize.max(14)];
        let mut writer = DataBlockWriter::new(3, &mut buf);
        let mut accepted = Vec::new();
        let mut ts = 1_700_000_000_000u64;
        for &(step, value) in &samples {
            ts += step;
            // only Overflow is possible on the put path
            if writer.put(ts, value).is_err() {
                break;
            }
            accepted.push((ts, value));
        }
        let written = writer.commit();
        prop_assert!(written <= buf.len());

        let mut reader = DataBlockReader::new(&buf[..written]);
        prop_assert_eq!(reader.nelements(), accepted.len());
        for &(ts, value) in &accepted {
            let (got_ts, got_value) = reader.next().unwrap().unwrap();
            prop_assert_eq!(got_ts, ts);
            prop_assert_eq!(got_value.to_bits(), value.to_bits());
        }
    }

    /// Chunk encode/decode round-trips all three columns and reports
    /// the timestamp extremes.
    #[test]
    fn prop_chunk_roundtrip(
        rows in prop::collection::vec((any::<u64>(), any::<u64>(), arb_double()), 1..200),
    ) {
        let mut batch = UncompressedChunk::new();
        for &(paramid, ts, value) in &rows {
            batch.push(paramid, ts, value);
        }

        let mut writer = VecChunkWriter { buf: vec![0; 1 << 16], committed: 0 };
        let summary = encode_chunk(&mut writer, &batch).unwrap();
        prop_assert_eq!(summary.n_elements as usize, batch.len());
        prop_assert_eq!(summary.ts_begin, *batch.timestamps.iter().min().unwrap());
        prop_assert_eq!(summary.ts_end, *batch.timestamps.iter().max().unwrap());

        let decoded = decode_chunk(&writer.buf[..writer.committed], summary.n_elements).unwrap();
        prop_assert_eq!(&decoded.paramids, &batch.paramids);
        prop_assert_eq!(&decoded.timestamps, &batch.timestamps);
        prop_assert_eq!(bits_of(&decoded.values), bits_of(&batch.values));
    }

    /// Time-order conversion sorts by timestamp and keeps ties in input
    /// order.
    #[test]
    fn prop_chunk_order_conversion_is_stable(
        rows in prop::collection::vec((any::<u64>(), 0u64..16, arb_double()), 0..100),
    ) {
        let mut batch = UncompressedChunk::new();
        for &(paramid, ts, value) in &rows {
            batch.push(paramid, ts, value);
        }
        let out = convert_from_chunk_order(&batch).unwrap();

        // sorted by timestamp
        prop_assert!(out.timestamps.windows(2).all(|w| w[0] <= w[1]));
        // stability: an index permutation sorted by the same key
        let mut index: Vec<usize> = (0..batch.len()).collect();
        index.sort_by_key(|&ix| batch.timestamps[ix]);
        for (slot, &ix) in index.iter().enumerate() {
            prop_assert_eq!(out.paramids[slot], batch.paramids[ix]);
            prop_assert_eq!(out.values[slot].to_bits(), batch.values[ix].to_bits());
        }
    }
}
