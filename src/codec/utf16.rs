use std::cmp::Ordering;

use super::{BitPath, KeyCodec};

const BITS_PER_UNIT: usize = 16;

/// Bit codec for `String` keys over their UTF-16BE encoding, 16 bits per code
/// unit. Order is lexicographic over UTF-16 code units, which differs from
/// `str`'s UTF-8 byte order for characters outside the BMP.
///
/// `is_left` re-encodes the string up to the requested unit, so per-bit access
/// is linear in the key length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Utf16Codec;

impl KeyCodec<String> for Utf16Codec {
    fn length(&self, key: &String) -> usize {
        key.encode_utf16().count() * BITS_PER_UNIT
    }

    fn is_left(&self, key: &String, index: usize) -> bool {
        let unit = key
            .encode_utf16()
            .nth(index / BITS_PER_UNIT)
            .unwrap_or_default();
        unit & (0x8000 >> (index % BITS_PER_UNIT)) == 0
    }

    fn recreate_key(&self, path: &BitPath) -> String {
        let units: Vec<u16> = path
            .as_bytes()
            .chunks(2)
            .take(path.len() / BITS_PER_UNIT)
            .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
            .collect();
        String::from_utf16_lossy(&units)
    }

    fn compare(&self, a: &String, b: &String) -> Ordering {
        a.encode_utf16().cmp(b.encode_utf16())
    }
}
