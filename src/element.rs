use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::integer::{self, Integer};
use crate::marker::{Marker, OffsetMode, TRACK_FLAG};
use crate::varint::{read_len, read_varint, read_zigzag, write_varint, write_zigzag};

/// A single item token in a body: the tag plus whatever immediately follows it. Containers only
/// carry their count; their children are the following elements.
#[derive(Clone, Debug, PartialEq)]
pub enum Element<'a> {
    Null,
    Bool(bool),
    Int(Integer),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Bin(&'a [u8]),
    Array(usize),
    Map(usize),
    /// The next item is the target of a new reference.
    Ref,
    /// The next element is a `Ref` that should be weak.
    Weaken,
    /// The item at this absolute body offset, as a reference target.
    BackRef(usize),
    /// The item at this absolute body offset, itself.
    Alias(usize),
    /// A fresh copy of the scalar at this absolute body offset.
    Copy(usize),
    /// A class-name string and a payload item follow.
    Object,
    /// The class name is the string at this absolute body offset; a payload item follows.
    ObjectV(usize),
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'static str {
        use self::Element::*;
        match self {
            Null => "Null",
            Bool(_) => "Bool",
            Int(_) => "Int",
            F32(_) => "F32",
            F64(_) => "F64",
            Str(_) => "Str",
            Bin(_) => "Bin",
            Array(_) => "Array",
            Map(_) => "Map",
            Ref => "Ref",
            Weaken => "Weaken",
            BackRef(_) => "BackRef",
            Alias(_) => "Alias",
            Copy(_) => "Copy",
            Object => "Object",
            ObjectV(_) => "ObjectV",
        }
    }
}

/// Serialize an element onto the end of a body buffer, using the tags available in `version`.
/// Doesn't check if Array & Map structures make sense, just writes elements out. Offsets carried
/// by back-references are absolute body offsets and must be less than the buffer's current
/// length.
pub fn serialize_elem(buf: &mut Vec<u8>, elem: Element, version: u8) {
    use self::Element::*;
    let short_forms = version >= 1;
    let at = buf.len();
    let offsets = OffsetMode::for_version(version);
    match elem {
        Null => buf.push(Marker::Undef.into()),
        Bool(v) => buf.push(if v { Marker::True } else { Marker::False }.into()),
        Int(v) => match v.as_small() {
            Some(small) if short_forms => {
                if small >= 0 {
                    buf.push(Marker::PosSmall(small as u8).into());
                } else {
                    buf.push(Marker::NegSmall(small).into());
                }
            }
            _ => match integer::get_int_internal(&v) {
                integer::IntPriv::PosInt(v) => {
                    buf.push(Marker::Varint.into());
                    write_varint(buf, v);
                }
                integer::IntPriv::NegInt(v) => {
                    buf.push(Marker::Zigzag.into());
                    write_zigzag(buf, v);
                }
            },
        },
        F32(v) => {
            buf.push(Marker::Float.into());
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        F64(v) => {
            buf.push(Marker::Double.into());
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Str(v) => {
            buf.push(Marker::StrUtf8.into());
            write_varint(buf, v.len() as u64);
            buf.extend_from_slice(v.as_bytes());
        }
        Bin(v) => {
            let len = v.len();
            if short_forms && len <= 31 {
                buf.push(Marker::ShortBinary(len as u8).into());
            } else {
                buf.push(Marker::Binary.into());
                write_varint(buf, len as u64);
            }
            buf.extend_from_slice(v);
        }
        Array(len) => {
            if short_forms && len <= 15 {
                buf.push(Marker::ArrayShort(len as u8).into());
            } else {
                buf.push(Marker::Array.into());
                write_varint(buf, len as u64);
            }
        }
        Map(len) => {
            if short_forms && len <= 15 {
                buf.push(Marker::HashShort(len as u8).into());
            } else {
                buf.push(Marker::Hash.into());
                write_varint(buf, len as u64);
            }
        }
        Ref => buf.push(Marker::Refn.into()),
        Weaken => buf.push(Marker::Weaken.into()),
        BackRef(target) => {
            buf.push(Marker::Refp.into());
            write_varint(buf, offsets.encode(target, at));
        }
        Alias(target) => {
            buf.push(Marker::Alias.into());
            write_varint(buf, offsets.encode(target, at));
        }
        Copy(target) => {
            buf.push(Marker::Copy.into());
            write_varint(buf, offsets.encode(target, at));
        }
        Object => buf.push(Marker::Object.into()),
        ObjectV(target) => {
            buf.push(Marker::ObjectV.into());
            write_varint(buf, offsets.encode(target, at));
        }
    }
}

/// An element read from a body, along with where it started and whether a later reference
/// points back to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Parsed<'a> {
    pub offset: usize,
    pub tracked: bool,
    pub elem: Element<'a>,
}

/// Reads a body one element at a time. Stops yielding after the first error.
#[derive(Clone, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    total: usize,
    version: u8,
    offsets: OffsetMode,
    errored: bool,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8], version: u8) -> Parser<'a> {
        Self {
            data,
            total: data.len(),
            version,
            offsets: OffsetMode::for_version(version),
            errored: false,
        }
    }

    /// Offset of the next unread byte.
    pub fn pos(&self) -> usize {
        self.total - self.data.len()
    }

    fn take(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(Error::too_short(step, self.data.len(), len));
        }
        let (bytes, data) = self.data.split_at(len);
        self.data = data;
        Ok(bytes)
    }

    fn take_str(&mut self, len: usize, step: &'static str) -> Result<&'a str> {
        let bytes = self.take(len, step)?;
        std::str::from_utf8(bytes).map_err(|e| Error::BadEncode(format!("{}", e)))
    }

    fn offset(&mut self, at: usize, step: &'static str) -> Result<usize> {
        let raw = read_varint(&mut self.data, step)?;
        self.offsets.decode(raw, at).ok_or(Error::DanglingReference {
            offset: match self.offsets {
                OffsetMode::Absolute => raw as usize,
                OffsetMode::Delta => at.wrapping_sub(raw as usize),
            },
            at,
        })
    }

    fn count(&mut self, len: usize, per_item: usize, name: &str) -> Result<usize> {
        // Every item takes at least one byte, so a count the remaining data can't hold is bogus
        match len.checked_mul(per_item) {
            Some(min) if min <= self.data.len() => Ok(len),
            _ => Err(Error::BadEncode(format!(
                "Got {} marker with length = {}, but there are only {} bytes left.",
                name,
                len,
                self.data.len()
            ))),
        }
    }

    // Given a retrieved marker, try to turn it into the next element, which may move through the
    // data. If we can't, error. This function *does not* set the the errored flag. That's up to
    // the caller.
    fn parse_element(&mut self, marker: Marker, at: usize) -> Result<Element<'a>> {
        if !marker.valid_in(self.version) {
            return Err(Error::BadEncode(format!(
                "Tag 0x{:02x} is not valid in protocol version {}",
                marker.into_u8(),
                self.version
            )));
        }
        use self::Marker::*;
        let elem = match marker {
            PosSmall(v) => Element::Int(v.into()),
            NegSmall(v) => Element::Int(v.into()),
            Varint => Element::Int(read_varint(&mut self.data, "decode VARINT")?.into()),
            Zigzag => Element::Int(read_zigzag(&mut self.data, "decode ZIGZAG")?.into()),
            Float => {
                let have = self.data.len();
                let v = self
                    .data
                    .read_f32::<LittleEndian>()
                    .map_err(|_| Error::too_short("decode FLOAT", have, 4))?;
                Element::F32(v)
            }
            Double => {
                let have = self.data.len();
                let v = self
                    .data
                    .read_f64::<LittleEndian>()
                    .map_err(|_| Error::too_short("decode DOUBLE", have, 8))?;
                Element::F64(v)
            }
            Undef => Element::Null,
            False => Element::Bool(false),
            True => Element::Bool(true),
            ShortBinary(len) => Element::Bin(self.take(len as usize, "get SHORT_BINARY content")?),
            Binary => {
                let len = read_len(&mut self.data, "decode BINARY length")?;
                Element::Bin(self.take(len, "get BINARY content")?)
            }
            StrUtf8 => {
                let len = read_len(&mut self.data, "decode STR_UTF8 length")?;
                Element::Str(self.take_str(len, "get STR_UTF8 content")?)
            }
            ArrayShort(len) => Element::Array(self.count(len as usize, 1, "ARRAY")?),
            Array => {
                let len = read_len(&mut self.data, "decode ARRAY length")?;
                Element::Array(self.count(len, 1, "ARRAY")?)
            }
            HashShort(len) => Element::Map(self.count(len as usize, 2, "HASH")?),
            Hash => {
                let len = read_len(&mut self.data, "decode HASH length")?;
                Element::Map(self.count(len, 2, "HASH")?)
            }
            Refn => Element::Ref,
            Weaken => Element::Weaken,
            Refp => Element::BackRef(self.offset(at, "decode REFP offset")?),
            Alias => Element::Alias(self.offset(at, "decode ALIAS offset")?),
            Copy => Element::Copy(self.offset(at, "decode COPY offset")?),
            Object => Element::Object,
            ObjectV => Element::ObjectV(self.offset(at, "decode OBJECTV offset")?),
            Pad | Reserved(_) => {
                return Err(Error::BadEncode(format!(
                    "Reserved marker 0x{:02x} found",
                    marker.into_u8()
                )))
            }
        };
        Ok(elem)
    }

    fn next_item(&mut self) -> Option<Result<Parsed<'a>>> {
        // Padding is allowed before any item and carries nothing
        let (at, tag) = loop {
            let at = self.pos();
            let (&tag, data) = self.data.split_first()?;
            self.data = data;
            if tag == Marker::Pad.into_u8() {
                continue;
            }
            break (at, tag);
        };
        let tracked = tag & TRACK_FLAG != 0;
        Some(
            self.parse_element(Marker::from_u8(tag), at)
                .map(|elem| Parsed {
                    offset: at,
                    tracked,
                    elem,
                }),
        )
    }
}

impl<'a> std::iter::Iterator for Parser<'a> {
    type Item = Result<Parsed<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let result = self.next_item()?;
        if result.is_err() {
            self.errored = true;
        }
        Some(result)
    }
}
