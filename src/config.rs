use std::convert::TryFrom;

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::compress::CompressType;
use crate::error::{Error, Result};
use crate::{LATEST_VERSION, MAX_DEPTH, MAX_NODES, MAX_SIZE};

/// Default minimum body size before compression is attempted.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;
/// Default compression level for [`CompressType::General`].
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Immutable encoder settings.
///
/// Build one with [`EncoderConfig::builder`] or [`EncoderConfig::new`]; both validate every
/// field, as does deserializing one.
///
/// ```
/// # use srl_pack::*;
/// let config = EncoderConfig::builder()
///     .protocol_version(2)
///     .track_references(true)
///     .compression(CompressType::Fast)
///     .build()
///     .unwrap();
/// assert_eq!(config.protocol_version(), 2);
///
/// assert!(EncoderConfig::new(4).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncoderConfigSerde", into = "EncoderConfigSerde")]
pub struct EncoderConfig {
    protocol_version: u8,
    track_references: bool,
    track_aliases: bool,
    compression: CompressType,
    compression_threshold: usize,
    compression_level: u32,
    max_depth: usize,
    max_size: usize,
    user_data: Option<Vec<u8>>,
}

impl EncoderConfig {
    /// Default settings for the given protocol version.
    pub fn new(protocol_version: u8) -> Result<Self> {
        Self::builder().protocol_version(protocol_version).build()
    }

    pub fn builder() -> EncoderConfigBuilder {
        EncoderConfigBuilder::default()
    }

    /// A builder starting from these settings.
    pub fn to_builder(&self) -> EncoderConfigBuilder {
        EncoderConfigBuilder {
            inner: self.clone(),
        }
    }

    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// Whether repeated arrays, maps, references, and objects are written once and referred back
    /// to.
    pub fn track_references(&self) -> bool {
        self.track_references
    }

    /// Whether repeated scalar nodes are written once and aliased. Also enables weak references.
    pub fn track_aliases(&self) -> bool {
        self.track_aliases
    }

    pub fn compression(&self) -> CompressType {
        self.compression
    }

    pub fn compression_threshold(&self) -> usize {
        self.compression_threshold
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Largest body the encoder will produce, before compression.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn user_data(&self) -> Option<&[u8]> {
        self.user_data.as_deref()
    }

    fn validate(self) -> Result<Self> {
        if self.protocol_version > LATEST_VERSION {
            return Err(Error::Config(format!(
                "protocol version must be between 0 and {}, got {}",
                LATEST_VERSION, self.protocol_version
            )));
        }
        if !(1..=9).contains(&self.compression_level) {
            return Err(Error::Config(format!(
                "compression level must be between 1 and 9, got {}",
                self.compression_level
            )));
        }
        if self.max_depth == 0 {
            return Err(Error::Config("max depth must be at least 1".into()));
        }
        if self.user_data.is_some() && self.protocol_version < 2 {
            return Err(Error::Config(format!(
                "user data needs protocol version 2 or later, got {}",
                self.protocol_version
            )));
        }
        Ok(self)
    }
}

impl std::default::Default for EncoderConfig {
    fn default() -> Self {
        Self {
            protocol_version: LATEST_VERSION,
            track_references: false,
            track_aliases: false,
            compression: CompressType::None,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_depth: MAX_DEPTH,
            max_size: MAX_SIZE,
            user_data: None,
        }
    }
}

/// Builder for [`EncoderConfig`]. Nothing is checked until [`build`][Self::build].
#[derive(Clone, Debug, Default)]
pub struct EncoderConfigBuilder {
    inner: EncoderConfig,
}

impl EncoderConfigBuilder {
    pub fn protocol_version(mut self, version: u8) -> Self {
        self.inner.protocol_version = version;
        self
    }

    pub fn track_references(mut self, track: bool) -> Self {
        self.inner.track_references = track;
        self
    }

    pub fn track_aliases(mut self, track: bool) -> Self {
        self.inner.track_aliases = track;
        self
    }

    pub fn compression(mut self, compression: CompressType) -> Self {
        self.inner.compression = compression;
        self
    }

    /// Bodies shorter than this are never compressed.
    pub fn compression_threshold(mut self, threshold: usize) -> Self {
        self.inner.compression_threshold = threshold;
        self
    }

    pub fn compression_level(mut self, level: u32) -> Self {
        self.inner.compression_level = level;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.inner.max_depth = max_depth;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.inner.max_size = max_size;
        self
    }

    pub fn user_data(mut self, data: Option<Vec<u8>>) -> Self {
        self.inner.user_data = data;
        self
    }

    pub fn build(self) -> Result<EncoderConfig> {
        self.inner.validate()
    }
}

// Struct used solely for serialization/deserialization
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EncoderConfigSerde {
    protocol_version: u8,
    track_references: bool,
    track_aliases: bool,
    compression: CompressType,
    compression_threshold: usize,
    compression_level: u32,
    max_depth: usize,
    max_size: usize,
    user_data: Option<ByteBuf>,
}

impl TryFrom<EncoderConfigSerde> for EncoderConfig {
    type Error = String;
    fn try_from(value: EncoderConfigSerde) -> Result<Self, Self::Error> {
        EncoderConfig {
            protocol_version: value.protocol_version,
            track_references: value.track_references,
            track_aliases: value.track_aliases,
            compression: value.compression,
            compression_threshold: value.compression_threshold,
            compression_level: value.compression_level,
            max_depth: value.max_depth,
            max_size: value.max_size,
            user_data: value.user_data.map(ByteBuf::into_vec),
        }
        .validate()
        .map_err(|e| e.to_string())
    }
}

impl From<EncoderConfig> for EncoderConfigSerde {
    fn from(value: EncoderConfig) -> Self {
        Self {
            protocol_version: value.protocol_version,
            track_references: value.track_references,
            track_aliases: value.track_aliases,
            compression: value.compression,
            compression_threshold: value.compression_threshold,
            compression_level: value.compression_level,
            max_depth: value.max_depth,
            max_size: value.max_size,
            user_data: value.user_data.map(ByteBuf::from),
        }
    }
}

/// Immutable decoder limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DecoderConfigSerde", into = "DecoderConfigSerde")]
pub struct DecoderConfig {
    max_depth: usize,
    max_size: usize,
    max_nodes: usize,
}

impl DecoderConfig {
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Largest body the decoder accepts, after decompression.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Most values a single decode may create.
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    fn validate(self) -> Result<Self> {
        if self.max_depth == 0 {
            return Err(Error::Config("max depth must be at least 1".into()));
        }
        Ok(self)
    }
}

impl std::default::Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_size: MAX_SIZE,
            max_nodes: MAX_NODES,
        }
    }
}

/// Builder for [`DecoderConfig`].
#[derive(Clone, Debug, Default)]
pub struct DecoderConfigBuilder {
    inner: DecoderConfig,
}

impl DecoderConfigBuilder {
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.inner.max_depth = max_depth;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.inner.max_size = max_size;
        self
    }

    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.inner.max_nodes = max_nodes;
        self
    }

    pub fn build(self) -> Result<DecoderConfig> {
        self.inner.validate()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DecoderConfigSerde {
    max_depth: usize,
    max_size: usize,
    max_nodes: usize,
}

impl TryFrom<DecoderConfigSerde> for DecoderConfig {
    type Error = String;
    fn try_from(value: DecoderConfigSerde) -> Result<Self, Self::Error> {
        DecoderConfig {
            max_depth: value.max_depth,
            max_size: value.max_size,
            max_nodes: value.max_nodes,
        }
        .validate()
        .map_err(|e| e.to_string())
    }
}

impl From<DecoderConfig> for DecoderConfigSerde {
    fn from(value: DecoderConfig) -> Self {
        Self {
            max_depth: value.max_depth,
            max_size: value.max_size,
            max_nodes: value.max_nodes,
        }
    }
}
