//! # bit-trie
//!
//! An uncompressed binary trie over variable-length bit-sequence keys that
//! behaves as an ordered map and answers prefix-relationship queries.
//!
//! Keys are mapped to bits by a [`KeyCodec`]. Each key lives at the node its
//! bits lead to from the root, so a key that is a bit-prefix of another sits
//! on that key's path. That makes longest-prefix matching a single descent and
//! makes ascending key order a plain pre-order walk.
//!
//! Keys need not be kept: with [`TrieConfig::retain_keys`] off, a key is
//! rebuilt from its node's position the first time something asks for it and
//! cached from then on.
//!
//! ## Example
//!
//! ```rust
//! use bit_trie::{Cidr4, CidrTrie, Navigable};
//!
//! let mut routes: CidrTrie<&str> = CidrTrie::default();
//! routes.insert("10.0.0.0/8".parse().unwrap(), "corp").unwrap();
//! routes.insert("10.1.0.0/16".parse().unwrap(), "lab").unwrap();
//! routes.insert("10.1.2.0/24".parse().unwrap(), "rack").unwrap();
//!
//! let host: Cidr4 = "10.1.2.5".parse().unwrap();
//! assert_eq!(routes.value_longest_prefix_of(&host, true), Some(&"rack"));
//! assert_eq!(routes.value_shortest_prefix_of(&host, true), Some(&"corp"));
//!
//! let next = routes.higher_key(&"10.1.0.0/16".parse().unwrap());
//! assert_eq!(next.map(|k| k.to_string()), Some("10.1.2.0/24".to_owned()));
//! ```

#![deny(unsafe_code)]

pub mod codec;
mod config;
mod cursor;
mod error;
mod navigable;
mod node;
#[cfg(feature = "serde")]
mod persist;
mod prefix;
mod resolve;
mod trie;
mod view;

pub use codec::{compare_bitwise, BitPath, Cidr4, Cidr4Codec, CidrParseError, KeyCodec, Utf16Codec};
pub use config::{PersistMode, TrieConfig};
pub use cursor::Cursor;
pub use error::TrieError;
pub use navigable::{KeyRange, Navigable};
pub use prefix::{PrefixIter, PrefixKeys, PrefixScope, PrefixValues, PrefixView};
pub use trie::BitTrie;
pub use view::{Iter, Keys, MapView, MapViewMut, Values};

/// `tracing` target for every event this crate emits.
pub const LOG_TARGET: &str = "bit_trie";

/// IPv4 networks to `V`.
pub type CidrTrie<V> = BitTrie<Cidr4, V, Cidr4Codec>;

/// Strings, ordered by UTF-16 code unit, to `V`.
pub type StringTrie<V> = BitTrie<String, V, Utf16Codec>;

#[cfg(test)]
mod proptests;
