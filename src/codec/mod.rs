//! Bit decomposition of keys.
//!
//! A [`KeyCodec`] turns a key into the sequence of left/right choices that
//! locates it in the trie, and turns such a sequence back into a key. The trie
//! itself never inspects keys beyond these calls.

mod cidr;
mod utf16;

pub use cidr::{Cidr4, Cidr4Codec, CidrParseError};
pub use utf16::Utf16Codec;

use std::cmp::Ordering;
use std::fmt;

/// Stateless bit-level view of a key type.
///
/// Bit `0` is the first branch taken below the root. `is_left` returning
/// `false` means the right child.
pub trait KeyCodec<K> {
    /// Number of bits in `key`. Keys with zero bits cannot be stored.
    fn length(&self, key: &K) -> usize;

    fn is_left(&self, key: &K, index: usize) -> bool;

    /// Rebuild a key from its bit path. Must round-trip with
    /// [`length`](Self::length)/[`is_left`](Self::is_left): the trie asserts
    /// that the returned key descends back to the node it came from.
    fn recreate_key(&self, path: &BitPath) -> K;

    /// Total order on keys. Must agree with bit-path order, which is what the
    /// default does.
    fn compare(&self, a: &K, b: &K) -> Ordering {
        compare_bitwise(self, a, b)
    }
}

/// Bit-path order: the first differing bit decides (left before right), and a
/// strict prefix sorts before every key it prefixes.
pub fn compare_bitwise<K, C: KeyCodec<K> + ?Sized>(codec: &C, a: &K, b: &K) -> Ordering {
    let (la, lb) = (codec.length(a), codec.length(b));
    for i in 0..la.min(lb) {
        match (codec.is_left(a, i), codec.is_left(b, i)) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    la.cmp(&lb)
}

#[inline]
fn bit_byte_index(bit: usize) -> usize {
    bit / 8
}

/// Bit index within its byte, where `0` is the MSB and `7` is the LSB.
#[inline]
fn bit_in_byte_msb0(bit: usize) -> u8 {
    (bit % 8) as u8
}

/// A packed sequence of branch choices, MSB-first within each byte, with a set
/// bit meaning "right". Trailing bits of the last byte are always zero.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitPath {
    bytes: Vec<u8>,
    len: usize,
}

impl BitPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            len: 0,
        }
    }

    /// Encode a whole key.
    pub fn from_key<K, C: KeyCodec<K> + ?Sized>(codec: &C, key: &K) -> Self {
        let n = codec.length(key);
        let mut path = Self::with_capacity(n);
        for i in 0..n {
            path.push(codec.is_left(key, i));
        }
        path
    }

    pub fn push(&mut self, left: bool) {
        if bit_in_byte_msb0(self.len) == 0 {
            self.bytes.push(0);
        }
        if !left {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> bit_in_byte_msb0(self.len);
        }
        self.len += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Panics
    /// If `index >= self.len()`.
    #[inline]
    pub fn is_left(&self, index: usize) -> bool {
        assert!(index < self.len, "bit {index} out of range for path of {} bits", self.len);
        self.bytes[bit_byte_index(index)] & (0x80 >> bit_in_byte_msb0(index)) == 0
    }

    /// Packed bits, MSB-first. A path of a multiple of 8 bits is exactly the
    /// big-endian byte encoding of the key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for BitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = (0..self.len)
            .map(|i| if self.is_left(i) { '0' } else { '1' })
            .collect();
        write!(f, "BitPath({bits})")
    }
}
