//! The document header that precedes every body.
//!
//! ```text
//! byte 0      magic 0x3D ('=')
//! byte 1      protocol version
//! byte 2      flags: bits 0-1 compression, bit 2 user data present, bits 3-7 reserved
//! [varint len + user data]       if the user data flag is set
//! [varint uncompressed length]   if compressed
//! body
//! ```

use std::convert::TryFrom;

use crate::compress::CompressType;
use crate::error::{Error, Result};
use crate::varint::{read_len, write_varint};
use crate::LATEST_VERSION;

/// First byte of every encoded document.
pub const MAGIC: u8 = 0x3D;

const FLAG_COMPRESS_MASK: u8 = 0x03;
const FLAG_USER_DATA: u8 = 0x04;
const FLAG_RESERVED_MASK: u8 = 0xF8;

/// Parsed header of an encoded document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub compression: CompressType,
    /// Opaque bytes carried alongside the body. Only allowed from protocol version 2.
    pub user_data: Option<Vec<u8>>,
    /// Length of the body before compression. Present exactly when `compression` isn't `None`.
    pub uncompressed_len: Option<usize>,
}

impl Header {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            compression: CompressType::None,
            user_data: None,
            uncompressed_len: None,
        }
    }

    /// Append the header bytes to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut flags = u8::from(self.compression) & FLAG_COMPRESS_MASK;
        if self.user_data.is_some() {
            flags |= FLAG_USER_DATA;
        }
        buf.push(MAGIC);
        buf.push(self.version);
        buf.push(flags);
        if let Some(data) = &self.user_data {
            write_varint(buf, data.len() as u64);
            buf.extend_from_slice(data);
        }
        if self.compression != CompressType::None {
            write_varint(buf, self.uncompressed_len.unwrap_or(0) as u64);
        }
    }

    /// Parse the header from the start of `data`, returning it along with the body that follows.
    pub fn split(data: &[u8]) -> Result<(Header, &[u8])> {
        let (&magic, data) = data.split_first().ok_or(Error::LengthTooShort {
            step: "get header magic",
            actual: 0,
            expected: 3,
        })?;
        if magic != MAGIC {
            return Err(Error::BadHeader(format!(
                "Magic byte is 0x{:02x}, expected 0x{:02x}",
                magic, MAGIC
            )));
        }
        let (&version, data) = data.split_first().ok_or(Error::LengthTooShort {
            step: "get header version",
            actual: 1,
            expected: 3,
        })?;
        if version > LATEST_VERSION {
            return Err(Error::BadHeader(format!(
                "Unsupported protocol version {}",
                version
            )));
        }
        let (&flags, mut data) = data.split_first().ok_or(Error::LengthTooShort {
            step: "get header flags",
            actual: 2,
            expected: 3,
        })?;
        if flags & FLAG_RESERVED_MASK != 0 {
            return Err(Error::BadHeader(format!(
                "Reserved flag bits set: 0x{:02x}",
                flags
            )));
        }
        let compression = CompressType::try_from(flags & FLAG_COMPRESS_MASK).map_err(|v| {
            Error::BadHeader(format!("Unrecognized compression type {}", v))
        })?;

        let user_data = if flags & FLAG_USER_DATA != 0 {
            if version < 2 {
                return Err(Error::BadHeader(format!(
                    "User data flag set on protocol version {}",
                    version
                )));
            }
            let len = read_len(&mut data, "decode user data length")?;
            if len > data.len() {
                return Err(Error::too_short("get user data", data.len(), len));
            }
            let (user, rest) = data.split_at(len);
            data = rest;
            Some(user.to_vec())
        } else {
            None
        };

        let uncompressed_len = if compression != CompressType::None {
            Some(read_len(&mut data, "decode uncompressed length")?)
        } else {
            None
        };

        Ok((
            Header {
                version,
                compression,
                user_data,
                uncompressed_len,
            },
            data,
        ))
    }
}
