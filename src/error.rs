use crate::compress::CompressionError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while configuring, encoding, or decoding.
///
/// Errors fall into three families:
///
/// - Configuration errors ([`Error::Config`]), which are only produced while building an
///   [`EncoderConfig`][crate::EncoderConfig] or [`DecoderConfig`][crate::DecoderConfig].
/// - Format errors, produced when decoding malformed or hostile data (or when asked to encode a
///   graph that can't be represented). [`Error::is_format_error`] returns true for all of them,
///   including [`Error::DanglingReference`].
/// - [`Error::RecursionLimit`], produced on either side when nesting goes deeper than the
///   configured maximum depth.
///
/// None of these are recoverable by retrying with the same input.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid encoder or decoder options.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// The header (magic, version, flags, and length fields) failed to parse correctly.
    #[error("Data has bad header format: {0}")]
    BadHeader(String),
    /// Data ended too early.
    #[error("Expected data length {expected}, but got {actual} on step [{step}]")]
    LengthTooShort {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// Data was greater than the maximum allowed size.
    #[error("Data too long: was {actual} bytes, maximum allowed is {max}")]
    LengthTooLong { max: usize, actual: usize },
    /// A varint kept setting its continuation bit past the width of its target integer.
    #[error("Varint runs past the maximum of {max_bytes} bytes")]
    VarintOverflow { max_bytes: usize },
    /// Basic encoding failure: unknown tag, invalid UTF-8, impossible counts, trailing data, or a
    /// value graph that can't be encoded.
    #[error("Basic data encoding failure: {0}")]
    BadEncode(String),
    /// A back-reference pointed at something other than an already-decoded item.
    #[error("Reference at offset {at} points to offset {offset}, which is not a decoded item")]
    DanglingReference { offset: usize, at: usize },
    /// Nesting went deeper than the configured limit.
    #[error("Hit recursion limit: depth exceeded maximum of {max}")]
    RecursionLimit { max: usize },
    /// Decoding would materialize more values than allowed.
    #[error("Hit node limit: more than {max} values")]
    TooManyNodes { max: usize },
    /// Compression or decompression failed, or the decompressed length didn't match the header.
    #[error("Failed decompression step: {0}")]
    FailDecompress(#[from] CompressionError),
}

impl Error {
    /// True for every error that means the encoded data (or the graph handed to the encoder) is
    /// malformed.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Error::Config(_) | Error::RecursionLimit { .. })
    }

    /// True for configuration errors.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// True if the error came from the depth guard.
    pub fn is_recursion_limit(&self) -> bool {
        matches!(self, Error::RecursionLimit { .. })
    }

    pub(crate) fn too_short(step: &'static str, actual: usize, expected: usize) -> Self {
        Error::LengthTooShort {
            step,
            actual,
            expected,
        }
    }
}
