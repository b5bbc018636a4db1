//! EmberDB Core - Time-Series Compression Engine
//!
//! The compression core of the EmberDB time-series storage engine:
//! codecs that turn an ordered stream of `(series, timestamp, value)`
//! samples into compact, self-describing byte blocks and back, with
//! bit-exact round-trip fidelity.
//!
//! # Architecture
//!
//! Two on-disk encodings are provided by the [`compression`] module:
//!
//! - **Data block**: a fixed-size single-series block combining
//!   delta-RLE timestamps with predictive XOR value compression, plus an
//!   uncompressed tail for the last partial chunk
//! - **Multi-series chunk**: a variable-size record packing many series
//!   as parallel length-prefixed streams
//!
//! All wire formats are little-endian and versioned with a single
//! format tag. Buffers are caller-provided; the codecs never allocate
//! on the write path.

pub mod compression;

mod error;
mod types;

pub use error::{EmberError, Result};
pub use types::*;

/// EmberDB version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
