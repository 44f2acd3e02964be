/// High bit of a tag byte, set when a later back-reference points at this item.
pub const TRACK_FLAG: u8 = 0x80;

/// Wire format tags. For internal use only.
///
/// Every item in a body starts with one tag byte. The low seven bits select the tag; the high bit
/// is [`TRACK_FLAG`]. Small integers, short binaries, and short array/map counts are stored inline
/// in the tag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// Inline integer 0 through 15.
    PosSmall(u8),
    /// Inline integer -16 through -1.
    NegSmall(i8),
    Varint,
    Zigzag,
    Float,
    Double,
    Undef,
    Binary,
    StrUtf8,
    Refn,
    Refp,
    Hash,
    Array,
    Object,
    ObjectV,
    Alias,
    Copy,
    Weaken,
    False,
    True,
    Pad,
    /// Array with an inline count of 0 through 15.
    ArrayShort(u8),
    /// Map with an inline pair count of 0 through 15.
    HashShort(u8),
    /// Binary with an inline length of 0 through 31.
    ShortBinary(u8),
    Reserved(u8),
}

impl Marker {
    /// Construct a marker from a tag byte, ignoring the track flag.
    pub fn from_u8(n: u8) -> Marker {
        let n = n & !TRACK_FLAG;
        match n {
            0x00..=0x0f => Marker::PosSmall(n),
            0x10..=0x1f => Marker::NegSmall(n as i8 - 32),
            0x20 => Marker::Varint,
            0x21 => Marker::Zigzag,
            0x22 => Marker::Float,
            0x23 => Marker::Double,
            0x25 => Marker::Undef,
            0x26 => Marker::Binary,
            0x27 => Marker::StrUtf8,
            0x28 => Marker::Refn,
            0x29 => Marker::Refp,
            0x2a => Marker::Hash,
            0x2b => Marker::Array,
            0x2c => Marker::Object,
            0x2d => Marker::ObjectV,
            0x2e => Marker::Alias,
            0x2f => Marker::Copy,
            0x30 => Marker::Weaken,
            0x3a => Marker::False,
            0x3b => Marker::True,
            0x3f => Marker::Pad,
            0x40..=0x4f => Marker::ArrayShort(n & 0x0f),
            0x50..=0x5f => Marker::HashShort(n & 0x0f),
            0x60..=0x7f => Marker::ShortBinary(n & 0x1f),
            _ => Marker::Reserved(n),
        }
    }

    /// Converts a marker object into a single-byte representation, without the track flag.
    /// Assumes the content of the marker is already masked approprately.
    pub fn into_u8(self) -> u8 {
        match self {
            Marker::PosSmall(val) => val,
            Marker::NegSmall(val) => (val + 32) as u8,
            Marker::Varint => 0x20,
            Marker::Zigzag => 0x21,
            Marker::Float => 0x22,
            Marker::Double => 0x23,
            Marker::Undef => 0x25,
            Marker::Binary => 0x26,
            Marker::StrUtf8 => 0x27,
            Marker::Refn => 0x28,
            Marker::Refp => 0x29,
            Marker::Hash => 0x2a,
            Marker::Array => 0x2b,
            Marker::Object => 0x2c,
            Marker::ObjectV => 0x2d,
            Marker::Alias => 0x2e,
            Marker::Copy => 0x2f,
            Marker::Weaken => 0x30,
            Marker::False => 0x3a,
            Marker::True => 0x3b,
            Marker::Pad => 0x3f,
            Marker::ArrayShort(len) => 0x40 | len,
            Marker::HashShort(len) => 0x50 | len,
            Marker::ShortBinary(len) => 0x60 | len,
            Marker::Reserved(val) => val,
        }
    }

    /// The first protocol version that defines this tag. `None` for reserved tags.
    pub fn min_version(&self) -> Option<u8> {
        match self {
            Marker::PosSmall(_)
            | Marker::NegSmall(_)
            | Marker::ArrayShort(_)
            | Marker::HashShort(_)
            | Marker::ShortBinary(_) => Some(1),
            Marker::ObjectV => Some(2),
            Marker::Copy => Some(3),
            Marker::Reserved(_) => None,
            _ => Some(0),
        }
    }

    /// Check if this tag may appear in a body written with `version`.
    pub fn valid_in(&self, version: u8) -> bool {
        self.min_version().map_or(false, |min| version >= min)
    }
}

impl From<u8> for Marker {
    fn from(val: u8) -> Marker {
        Marker::from_u8(val)
    }
}

impl From<Marker> for u8 {
    fn from(val: Marker) -> u8 {
        val.into_u8()
    }
}

/// How a protocol version writes the offset carried by REFP, ALIAS, COPY, and OBJECTV.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetMode {
    /// The target's offset from the start of the body.
    Absolute,
    /// The distance back from the referencing tag to the target.
    Delta,
}

impl OffsetMode {
    pub fn for_version(version: u8) -> Self {
        if version >= 2 {
            OffsetMode::Delta
        } else {
            OffsetMode::Absolute
        }
    }

    /// The number written for a reference at `at` pointing to `target`. `target` must be less
    /// than `at`.
    pub fn encode(self, target: usize, at: usize) -> u64 {
        match self {
            OffsetMode::Absolute => target as u64,
            OffsetMode::Delta => (at - target) as u64,
        }
    }

    /// Recover the target offset for a reference read at `at`. Rejects anything that isn't
    /// strictly before `at`.
    pub fn decode(self, raw: u64, at: usize) -> Option<usize> {
        let raw = usize::try_from(raw).ok()?;
        match self {
            OffsetMode::Absolute => (raw < at).then_some(raw),
            OffsetMode::Delta => (raw >= 1 && raw <= at).then(|| at - raw),
        }
    }
}
