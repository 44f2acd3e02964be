use std::convert::TryFrom;
use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug)]
pub enum CompressionError {
    /// The declared decompressed size was larger than allowed.
    ExceededSize { max: usize, actual: usize },
    /// Decompression produced a different number of bytes than the header declared.
    LengthMismatch { expected: usize, actual: usize },
    Snappy(snap::Error),
    Deflate(String),
    Parsing(&'static str),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::ExceededSize { max, actual } => write!(
                f,
                "Decompressed size is {} bytes, larger than max of {} kiB",
                actual,
                (max + 1) >> 10
            ),
            CompressionError::LengthMismatch { expected, actual } => write!(
                f,
                "Decompressed to {} bytes, but header declared {}",
                actual, expected
            ),
            CompressionError::Snappy(e) => write!(f, "snappy failure ({})", e),
            CompressionError::Deflate(e) => write!(f, "deflate failure ({})", e),
            CompressionError::Parsing(s) => f.write_str(s),
        }
    }
}

impl std::error::Error for CompressionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompressionError::Snappy(e) => Some(e),
            _ => None,
        }
    }
}

/// Whole-body compression applied after encoding. Format in the header is the lowest two bits of
/// the flags byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressType {
    /// No compression
    #[default]
    None,
    /// Fast compression: a raw Snappy block
    Fast,
    /// General-purpose compression: a raw deflate stream
    General,
}

impl From<CompressType> for u8 {
    fn from(val: CompressType) -> u8 {
        match val {
            CompressType::None => 0,
            CompressType::Fast => 1,
            CompressType::General => 2,
        }
    }
}

impl TryFrom<u8> for CompressType {
    type Error = u8;
    fn try_from(val: u8) -> Result<CompressType, u8> {
        match val {
            0 => Ok(CompressType::None),
            1 => Ok(CompressType::Fast),
            2 => Ok(CompressType::General),
            _ => Err(val),
        }
    }
}

/// Compress `src` with the given algorithm. `level` (1-9) only applies to `General`.
pub(crate) fn compress(
    kind: CompressType,
    level: u32,
    src: &[u8],
) -> Result<Vec<u8>, CompressionError> {
    match kind {
        CompressType::None => Ok(src.to_vec()),
        CompressType::Fast => snap::raw::Encoder::new()
            .compress_vec(src)
            .map_err(CompressionError::Snappy),
        CompressType::General => {
            let dst = Vec::with_capacity(src.len() / 2);
            let mut enc = flate2::write::DeflateEncoder::new(dst, flate2::Compression::new(level));
            enc.write_all(src)
                .map_err(|e| CompressionError::Deflate(e.to_string()))?;
            enc.finish()
                .map_err(|e| CompressionError::Deflate(e.to_string()))
        }
    }
}

/// Decompress `src`, which the header says expands to exactly `expected_len` bytes. Fails if that
/// is more than `max_size`, before anything is allocated.
pub(crate) fn decompress(
    kind: CompressType,
    src: &[u8],
    expected_len: usize,
    max_size: usize,
) -> Result<Vec<u8>> {
    if expected_len > max_size {
        return Err(Error::LengthTooLong {
            max: max_size,
            actual: expected_len,
        });
    }
    let dst = match kind {
        CompressType::None => src.to_vec(),
        CompressType::Fast => snappy_decompress(src, expected_len, max_size)?,
        CompressType::General => deflate_decompress(src, expected_len)?,
    };
    if dst.len() != expected_len {
        return Err(CompressionError::LengthMismatch {
            expected: expected_len,
            actual: dst.len(),
        }
        .into());
    }
    Ok(dst)
}

fn snappy_decompress(
    src: &[u8],
    expected_len: usize,
    max_size: usize,
) -> Result<Vec<u8>, CompressionError> {
    // The block carries its own length prefix, which must agree with the header
    let actual = snap::raw::decompress_len(src).map_err(CompressionError::Snappy)?;
    if actual > max_size {
        return Err(CompressionError::ExceededSize {
            max: max_size,
            actual,
        });
    }
    if actual != expected_len {
        return Err(CompressionError::LengthMismatch {
            expected: expected_len,
            actual,
        });
    }
    snap::raw::Decoder::new()
        .decompress_vec(src)
        .map_err(CompressionError::Snappy)
}

fn deflate_decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>, CompressionError> {
    // Output can never grow past the declared length, and the stream must end exactly at the end
    // of the input
    let mut dst = Vec::with_capacity(expected_len);
    let mut inflate = flate2::Decompress::new(false);
    let status = inflate
        .decompress_vec(src, &mut dst, flate2::FlushDecompress::Finish)
        .map_err(|e| CompressionError::Deflate(e.to_string()))?;
    if status != flate2::Status::StreamEnd {
        return Err(CompressionError::Parsing(
            "deflate stream did not end within the declared length",
        ));
    }
    if inflate.total_in() != src.len() as u64 {
        return Err(CompressionError::Parsing(
            "trailing data after end of deflate stream",
        ));
    }
    Ok(dst)
}
