use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BitPath, KeyCodec};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrParseError {
    #[error("invalid IPv4 address `{0}`")]
    InvalidAddress(String),
    #[error("invalid prefix length `{0}`")]
    InvalidPrefixLength(String),
}

/// An IPv4 network: address plus mask length, with host bits cleared.
///
/// Ordering is by network address, and for equal addresses the wider mask
/// first. That is exactly bit-path order, so `Cidr4Codec` reuses it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Cidr4 {
    addr: u32,
    len: u8,
}

#[inline]
fn mask(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(len))
    }
}

impl Cidr4 {
    /// Host bits of `addr` beyond `len` are cleared.
    pub fn new(addr: Ipv4Addr, len: u8) -> Result<Self, CidrParseError> {
        if len > 32 {
            return Err(CidrParseError::InvalidPrefixLength(len.to_string()));
        }
        Ok(Self::from_bits(u32::from(addr), len))
    }

    /// # Panics
    /// If `len > 32`.
    pub fn from_bits(addr: u32, len: u8) -> Self {
        assert!(len <= 32, "prefix length {len} exceeds 32");
        Self {
            addr: addr & mask(len),
            len,
        }
    }

    /// A single host (`/32`).
    pub fn host(addr: Ipv4Addr) -> Self {
        Self::from_bits(u32::from(addr), 32)
    }

    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }

    pub fn bits(&self) -> u32 {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    /// Whether `other` lies inside this network (including equality).
    pub fn contains(&self, other: &Cidr4) -> bool {
        self.len <= other.len && other.addr & mask(self.len) == self.addr
    }
}

impl FromStr for Cidr4 {
    type Err = CidrParseError;

    /// Accepts `a.b.c.d/n`, or a bare address meaning `/32`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = match s.split_once('/') {
            Some((addr, len)) => {
                let len = len
                    .parse::<u8>()
                    .map_err(|_| CidrParseError::InvalidPrefixLength(len.to_owned()))?;
                (addr, len)
            }
            None => (s, 32),
        };
        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| CidrParseError::InvalidAddress(addr.to_owned()))?;
        Cidr4::new(addr, len)
    }
}

impl TryFrom<String> for Cidr4 {
    type Error = CidrParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cidr4> for String {
    fn from(cidr: Cidr4) -> Self {
        cidr.to_string()
    }
}

impl fmt::Display for Cidr4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.len)
    }
}

impl fmt::Debug for Cidr4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Bit codec for [`Cidr4`]: the first `prefix_len` address bits, MSB first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cidr4Codec;

impl KeyCodec<Cidr4> for Cidr4Codec {
    #[inline]
    fn length(&self, key: &Cidr4) -> usize {
        usize::from(key.len)
    }

    #[inline]
    fn is_left(&self, key: &Cidr4, index: usize) -> bool {
        debug_assert!(index < 32);
        key.addr & (0x8000_0000 >> index) == 0
    }

    fn recreate_key(&self, path: &BitPath) -> Cidr4 {
        let mut octets = [0u8; 4];
        for (dst, src) in octets.iter_mut().zip(path.as_bytes()) {
            *dst = *src;
        }
        let len = u8::try_from(path.len()).unwrap_or(u8::MAX).min(32);
        Cidr4::from_bits(u32::from_be_bytes(octets), len)
    }

    fn compare(&self, a: &Cidr4, b: &Cidr4) -> Ordering {
        a.cmp(b)
    }
}
