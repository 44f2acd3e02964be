//! srl-pack is a compact, self-describing binary format for arbitrary nested data, including
//! graphs with shared and circular references.
//!
//! Data is built as a [`ValueGraph`]: an arena of [`Value`] nodes addressed by [`NodeId`].
//! Containers refer to their children by id, so the same node can appear in several places, or
//! inside itself. The encoder can write such a node once and refer back to it afterwards, and the
//! decoder rebuilds the same sharing.
//!
//! An encoded document is:
//!
//! - A short header: a magic byte, the protocol version (0 through 3), a flags byte, and
//!     optionally user data and the uncompressed body length.
//! - A body: one tagged item (the root), possibly containing others.
//!
//! The body may be compressed as a whole, with a fast (Snappy) or general-purpose (deflate)
//! algorithm. Compression is only kept when it actually shrinks the body.
//!
//! ```
//! # use srl_pack::*;
//! # fn main() -> Result<()> {
//! let mut graph = ValueGraph::new();
//! let root = graph.array(vec![]);
//! let shared = graph.str("shared");
//! graph.get_mut(root).unwrap().as_array_mut().unwrap().extend([shared, shared]);
//!
//! let config = EncoderConfig::builder().track_aliases(true).build()?;
//! let encoded = encode(&graph, &config)?;
//! let decoded = decode(&encoded)?;
//! assert_eq!(decoded, graph);
//!
//! let items = decoded[decoded.root().unwrap()].as_array().unwrap();
//! assert!(decoded.same_node(items[0], items[1]));
//! # Ok(())
//! # }
//! ```
//!
//! Decoding treats its input as hostile: nesting depth, body size, and the number of values
//! created are all limited (see [`DecoderConfig`]), and malformed input fails with an [`Error`]
//! rather than a panic.

mod compress;
mod config;
mod decode;
mod depth_tracking;
mod element;
mod encode;
mod error;
mod header;
mod integer;
mod marker;
mod tracker;
mod value;
pub mod varint;

pub use compress::{CompressType, CompressionError};
pub use config::{
    DecoderConfig, DecoderConfigBuilder, EncoderConfig, EncoderConfigBuilder,
    DEFAULT_COMPRESSION_LEVEL, DEFAULT_COMPRESSION_THRESHOLD,
};
pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{Error, Result};
pub use header::{Header, MAGIC};
pub use integer::Integer;
pub use value::{NodeId, RefKind, Value, ValueGraph};

/// Newest protocol version, and the one used by default.
pub const LATEST_VERSION: u8 = 3;

/// The default maximum nesting depth, for both encoding and decoding.
pub const MAX_DEPTH: usize = 512;

/// The default maximum body size, for both encoding and decoding, is 64 MiB.
pub const MAX_SIZE: usize = 1usize << 26; // 64 MiB

/// The default maximum number of values a single decode may create.
pub const MAX_NODES: usize = 1usize << 24;

/// Encode a value graph with the given configuration.
pub fn encode(graph: &ValueGraph, config: &EncoderConfig) -> Result<Vec<u8>> {
    Encoder::new(config.clone()).encode(graph)
}

/// Decode a document with the default limits.
pub fn decode(data: &[u8]) -> Result<ValueGraph> {
    Decoder::default().decode(data)
}
