use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;

/// Sign-split storage. Mirrors the two integer tags: `VARINT` carries `Pos`, `ZIGZAG` carries
/// `Neg`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum IntPriv {
    /// Zero or more.
    PosInt(u64),
    /// Below zero.
    NegInt(i64),
}

/// An integer anywhere in `i64::MIN..=u64::MAX`.
///
/// Values read from a document keep whatever range they were written with, so a `u64` above
/// `i64::MAX` survives a round trip, and so does `i64::MIN`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Integer {
    n: IntPriv,
}

impl Integer {
    /// The value as `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self.n {
            IntPriv::PosInt(n) => i64::try_from(n).ok(),
            IntPriv::NegInt(n) => Some(n),
        }
    }

    /// The value as `u64`, if it isn't negative.
    pub fn as_u64(&self) -> Option<u64> {
        match self.n {
            IntPriv::PosInt(n) => Some(n),
            IntPriv::NegInt(_) => None,
        }
    }

    /// The value, if it fits in the inline small-integer range of `-16..=15`.
    pub(crate) fn as_small(&self) -> Option<i8> {
        match self.n {
            IntPriv::PosInt(n) if n <= 15 => Some(n as i8),
            IntPriv::NegInt(n) if n >= -16 => Some(n as i8),
            _ => None,
        }
    }
}

pub(crate) fn get_int_internal(val: &Integer) -> IntPriv {
    val.n
}

impl Ord for Integer {
    fn cmp(&self, other: &Integer) -> Ordering {
        match (self.n, other.n) {
            (IntPriv::NegInt(a), IntPriv::NegInt(b)) => a.cmp(&b),
            (IntPriv::PosInt(a), IntPriv::PosInt(b)) => a.cmp(&b),
            (IntPriv::NegInt(_), IntPriv::PosInt(_)) => Ordering::Less,
            (IntPriv::PosInt(_), IntPriv::NegInt(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Integer {
    fn partial_cmp(&self, other: &Integer) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.n, f)
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.n {
            IntPriv::PosInt(v) => write!(f, "{}", v),
            IntPriv::NegInt(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                Integer { n: IntPriv::PosInt(n as u64) }
            }
        }
    )*};
}

macro_rules! from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                let n = n as i64;
                Integer {
                    n: if n < 0 { IntPriv::NegInt(n) } else { IntPriv::PosInt(n as u64) },
                }
            }
        }
    )*};
}

from_unsigned!(u8, u16, u32, u64, usize);
from_signed!(i8, i16, i32, i64, isize);

// Narrowing hands the original value back when it doesn't fit
macro_rules! narrow {
    ($($t:ty),*) => {$(
        impl TryFrom<Integer> for $t {
            type Error = Integer;
            fn try_from(v: Integer) -> Result<Self, Self::Error> {
                match v.n {
                    IntPriv::PosInt(n) => <$t>::try_from(n).map_err(|_| v),
                    IntPriv::NegInt(n) => <$t>::try_from(n).map_err(|_| v),
                }
            }
        }
    )*};
}

narrow!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
