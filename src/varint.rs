//! Variable-length integers: unsigned LEB128 with a ZigZag mapping for signed values.
//!
//! Each byte carries 7 data bits, least-significant group first, with the high bit set on every
//! byte except the last. Readers bound the number of bytes they accept by the width of the target
//! integer, so a stream of continuation bits can never make them read forever.

use crate::error::{Error, Result};

/// Longest valid encoding of a `u64`.
pub const MAX_VARINT_LEN_U64: usize = 10;
/// Longest valid encoding of a `u32`.
pub const MAX_VARINT_LEN_U32: usize = 5;

/// Append `v` to the buffer.
pub fn write_varint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Number of bytes [`write_varint`] would produce for `v`.
pub fn varint_len(v: u64) -> usize {
    let bits = 64 - (v | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Append the ZigZag encoding of `v` to the buffer.
pub fn write_zigzag(buf: &mut Vec<u8>, v: i64) {
    write_varint(buf, zigzag_encode(v))
}

pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

pub fn zigzag_decode(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Read a varint that must fit in `bits` bits, consuming it from the front of `buf`.
fn read_bounded(buf: &mut &[u8], bits: u32, step: &'static str) -> Result<u64> {
    let max_bytes = ((bits + 6) / 7) as usize;
    // Data bits allowed in the final byte
    let last_bits = bits - 7 * (max_bytes as u32 - 1);
    let mut result = 0u64;
    for (i, &byte) in buf.iter().enumerate() {
        let data = (byte & 0x7F) as u64;
        if i == max_bytes - 1 && (byte & 0x80 != 0 || data >> last_bits != 0) {
            return Err(Error::VarintOverflow { max_bytes });
        }
        result |= data << (7 * i);
        if byte & 0x80 == 0 {
            *buf = &buf[i + 1..];
            return Ok(result);
        }
    }
    Err(Error::too_short(step, buf.len(), buf.len() + 1))
}

/// Read a varint holding a `u64`. Accepts at most 10 bytes.
pub fn read_varint(buf: &mut &[u8], step: &'static str) -> Result<u64> {
    read_bounded(buf, 64, step)
}

/// Read a varint holding a `u32`. Accepts at most 5 bytes.
pub fn read_varint_u32(buf: &mut &[u8], step: &'static str) -> Result<u32> {
    read_bounded(buf, 32, step).map(|v| v as u32)
}

/// Read a ZigZag-encoded signed varint.
pub fn read_zigzag(buf: &mut &[u8], step: &'static str) -> Result<i64> {
    read_varint(buf, step).map(zigzag_decode)
}

/// Read a varint used as a length, count, or offset, converting it to `usize`.
pub fn read_len(buf: &mut &[u8], step: &'static str) -> Result<usize> {
    let v = read_varint(buf, step)?;
    usize::try_from(v).map_err(|_| Error::BadEncode(format!("{} of {} does not fit in memory", step, v)))
}
