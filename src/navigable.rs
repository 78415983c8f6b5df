//! Ordered-map navigation: ceiling/floor/higher/lower over the whole trie and
//! over bounded, optionally descending, ranges.

use std::cmp::Ordering;
use std::ops::Bound;

use crate::codec::KeyCodec;
use crate::error::TrieError;
use crate::node::NodeId;
use crate::trie::BitTrie;

// =============================================================================
// Whole-trie node queries
// =============================================================================

impl<K, V, C: KeyCodec<K>> BitTrie<K, V, C> {
    /// Least valued node `>= key`, or `> key` when `strict`.
    pub(crate) fn ceiling_node(&self, key: &K, strict: bool) -> Option<NodeId> {
        let d = self.descend(key);
        if d.is_complete() {
            if !strict && d.node != NodeId::ROOT && self.nodes.get(d.node).has_value() {
                return Some(d.node);
            }
            // Everything below the key's node is greater than the key.
            return self.successor(d.node, None, false);
        }
        if d.wanted_left {
            // `d.node` has no left child, so its successor is the first entry
            // of its right subtree, or the first entry past it.
            self.successor(d.node, None, false)
        } else {
            // The key sorts after all of `d.node`'s subtree.
            self.next_after_subtree(d.node, None, false)
        }
    }

    /// Greatest valued node `<= key`, or `< key` when `strict`.
    pub(crate) fn floor_node(&self, key: &K, strict: bool) -> Option<NodeId> {
        let d = self.descend(key);
        let valued = d.node != NodeId::ROOT && self.nodes.get(d.node).has_value();
        if d.is_complete() {
            if !strict && valued {
                return Some(d.node);
            }
            return self.predecessor(d.node, None, false);
        }
        if !d.wanted_left {
            if let Some(left) = self.nodes.get(d.node).left {
                // The key sorts after the whole left subtree.
                return Some(self.last_in_subtree(left));
            }
        }
        if valued {
            Some(d.node)
        } else {
            self.predecessor(d.node, None, false)
        }
    }
}

// =============================================================================
// Key ranges
// =============================================================================

/// An immutable `[lo, hi]` descriptor, each end inclusive, exclusive or open,
/// in the codec's ascending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRange<K> {
    lo: Bound<K>,
    hi: Bound<K>,
}

impl<K> KeyRange<K> {
    pub fn full() -> Self {
        Self {
            lo: Bound::Unbounded,
            hi: Bound::Unbounded,
        }
    }

    /// Fails with [`TrieError::InvertedRange`] if `lo` sorts after `hi`.
    pub fn new<C: KeyCodec<K>>(codec: &C, lo: Bound<K>, hi: Bound<K>) -> Result<Self, TrieError> {
        if let (Bound::Included(l) | Bound::Excluded(l), Bound::Included(h) | Bound::Excluded(h)) = (&lo, &hi) {
            if codec.compare(l, h) == Ordering::Greater {
                return Err(TrieError::InvertedRange);
            }
        }
        Ok(Self { lo, hi })
    }

    /// Bounds the caller already knows to be ordered.
    pub(crate) fn from_bounds(lo: Bound<K>, hi: Bound<K>) -> Self {
        Self { lo, hi }
    }

    pub fn lo(&self) -> Bound<&K> {
        self.lo.as_ref()
    }

    pub fn hi(&self) -> Bound<&K> {
        self.hi.as_ref()
    }

    pub(crate) fn too_low<C: KeyCodec<K>>(&self, codec: &C, key: &K) -> bool {
        match &self.lo {
            Bound::Unbounded => false,
            Bound::Included(lo) => codec.compare(key, lo) == Ordering::Less,
            Bound::Excluded(lo) => codec.compare(key, lo) != Ordering::Greater,
        }
    }

    pub(crate) fn too_high<C: KeyCodec<K>>(&self, codec: &C, key: &K) -> bool {
        match &self.hi {
            Bound::Unbounded => false,
            Bound::Included(hi) => codec.compare(key, hi) == Ordering::Greater,
            Bound::Excluded(hi) => codec.compare(key, hi) != Ordering::Less,
        }
    }

    pub fn contains<C: KeyCodec<K>>(&self, codec: &C, key: &K) -> bool {
        !self.too_low(codec, key) && !self.too_high(codec, key)
    }

    /// Whether `key` may serve as a bound of a narrower range: inside this
    /// range, or equal to one of its ends.
    fn admits<C: KeyCodec<K>>(&self, codec: &C, key: &K) -> bool {
        let above_lo = match &self.lo {
            Bound::Unbounded => true,
            Bound::Included(lo) | Bound::Excluded(lo) => codec.compare(key, lo) != Ordering::Less,
        };
        let below_hi = match &self.hi {
            Bound::Unbounded => true,
            Bound::Included(hi) | Bound::Excluded(hi) => codec.compare(key, hi) != Ordering::Greater,
        };
        above_lo && below_hi
    }

    /// Intersect with new bounds. An unbounded side inherits this range's
    /// bound. A new bound outside this range is [`TrieError::KeyOutOfRange`].
    pub fn narrow<C: KeyCodec<K>>(&self, codec: &C, lo: Bound<K>, hi: Bound<K>) -> Result<Self, TrieError>
    where
        K: Clone,
    {
        let lo = match lo {
            Bound::Unbounded => self.lo.clone(),
            Bound::Included(k) if !self.contains(codec, &k) => return Err(TrieError::KeyOutOfRange),
            Bound::Excluded(k) if !self.admits(codec, &k) => return Err(TrieError::KeyOutOfRange),
            bound => bound,
        };
        let hi = match hi {
            Bound::Unbounded => self.hi.clone(),
            Bound::Included(k) if !self.contains(codec, &k) => return Err(TrieError::KeyOutOfRange),
            Bound::Excluded(k) if !self.admits(codec, &k) => return Err(TrieError::KeyOutOfRange),
            bound => bound,
        };
        Self::new(codec, lo, hi)
    }
}

impl<K> Default for KeyRange<K> {
    fn default() -> Self {
        Self::full()
    }
}

// =============================================================================
// Bounded queries
// =============================================================================

/// A trie seen through a range, ascending or descending. Every query computes
/// the whole-trie answer and clamps it against the range.
pub(crate) struct Bounds<'t, 'r, K, V, C> {
    pub(crate) trie: &'t BitTrie<K, V, C>,
    pub(crate) range: &'r KeyRange<K>,
    pub(crate) descending: bool,
}

impl<'t, 'r, K, V, C: KeyCodec<K>> Bounds<'t, 'r, K, V, C> {
    fn node_too_low(&self, id: NodeId) -> bool {
        self.trie
            .resolve_key(id)
            .map_or(true, |k| self.range.too_low(&self.trie.codec, k))
    }

    fn node_too_high(&self, id: NodeId) -> bool {
        self.trie
            .resolve_key(id)
            .map_or(true, |k| self.range.too_high(&self.trie.codec, k))
    }

    fn abs_lowest(&self) -> Option<NodeId> {
        let n = match &self.range.lo {
            Bound::Unbounded => self.trie.first_node(),
            Bound::Included(lo) => self.trie.ceiling_node(lo, false),
            Bound::Excluded(lo) => self.trie.ceiling_node(lo, true),
        };
        n.filter(|&id| !self.node_too_high(id))
    }

    fn abs_highest(&self) -> Option<NodeId> {
        let n = match &self.range.hi {
            Bound::Unbounded => self.trie.last_node(),
            Bound::Included(hi) => self.trie.floor_node(hi, false),
            Bound::Excluded(hi) => self.trie.floor_node(hi, true),
        };
        n.filter(|&id| !self.node_too_low(id))
    }

    fn abs_ceiling(&self, key: &K, strict: bool) -> Option<NodeId> {
        if self.range.too_low(&self.trie.codec, key) {
            return self.abs_lowest();
        }
        self.trie
            .ceiling_node(key, strict)
            .filter(|&id| !self.node_too_high(id))
    }

    fn abs_floor(&self, key: &K, strict: bool) -> Option<NodeId> {
        if self.range.too_high(&self.trie.codec, key) {
            return self.abs_highest();
        }
        self.trie
            .floor_node(key, strict)
            .filter(|&id| !self.node_too_low(id))
    }

    /// First entry past the top of the range, in ascending order.
    pub(crate) fn abs_high_fence(&self) -> Option<NodeId> {
        match &self.range.hi {
            Bound::Unbounded => None,
            Bound::Included(hi) => self.trie.ceiling_node(hi, true),
            Bound::Excluded(hi) => self.trie.ceiling_node(hi, false),
        }
    }

    /// Last entry below the bottom of the range, in ascending order.
    pub(crate) fn abs_low_fence(&self) -> Option<NodeId> {
        match &self.range.lo {
            Bound::Unbounded => None,
            Bound::Included(lo) => self.trie.floor_node(lo, true),
            Bound::Excluded(lo) => self.trie.floor_node(lo, false),
        }
    }

    pub(crate) fn first(&self) -> Option<NodeId> {
        if self.descending {
            self.abs_highest()
        } else {
            self.abs_lowest()
        }
    }

    pub(crate) fn last(&self) -> Option<NodeId> {
        if self.descending {
            self.abs_lowest()
        } else {
            self.abs_highest()
        }
    }

    /// `>= key` (or `>`) in this view's direction.
    pub(crate) fn ceiling(&self, key: &K, strict: bool) -> Option<NodeId> {
        if self.descending {
            self.abs_floor(key, strict)
        } else {
            self.abs_ceiling(key, strict)
        }
    }

    /// `<= key` (or `<`) in this view's direction.
    pub(crate) fn floor(&self, key: &K, strict: bool) -> Option<NodeId> {
        if self.descending {
            self.abs_ceiling(key, strict)
        } else {
            self.abs_floor(key, strict)
        }
    }

    /// Answer a [`Seek`] inside the range, in the range's direction.
    pub(crate) fn seek(&self, to: Seek<'_, K>) -> Option<NodeId> {
        match to {
            Seek::First => self.first(),
            Seek::Last => self.last(),
            Seek::Ceiling { key, strict } => self.ceiling(key, strict),
            Seek::Floor { key, strict } => self.floor(key, strict),
        }
    }
}

// =============================================================================
// Navigable
// =============================================================================

pub(crate) mod sealed {
    /// Where a navigation query lands.
    pub enum Seek<'k, K> {
        First,
        Last,
        /// Least entry `>= key`, or `> key` when `strict`.
        Ceiling { key: &'k K, strict: bool },
        /// Greatest entry `<= key`, or `< key` when `strict`.
        Floor { key: &'k K, strict: bool },
    }

    /// Node-level lookup behind [`super::Navigable`]. Not nameable outside the
    /// crate, so arena positions never reach callers.
    pub trait Seekable<K, V> {
        fn seek(&self, to: Seek<'_, K>) -> Option<(&K, &V)>;
    }
}

use sealed::{Seek, Seekable};

/// Ordered-map navigation shared by the trie and its views.
///
/// Implemented by [`BitTrie`], [`MapView`](crate::MapView) and
/// [`MapViewMut`](crate::MapViewMut); the trait is sealed. "Higher" and
/// "lower" follow the implementor's own direction, so on a descending view
/// `higher_key` moves toward smaller keys.
pub trait Navigable<K, V>: Seekable<K, V> {
    fn first_entry(&self) -> Option<(&K, &V)> {
        self.seek(Seek::First)
    }

    fn last_entry(&self) -> Option<(&K, &V)> {
        self.seek(Seek::Last)
    }

    fn ceiling_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.seek(Seek::Ceiling { key, strict: false })
    }

    fn floor_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.seek(Seek::Floor { key, strict: false })
    }

    fn higher_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.seek(Seek::Ceiling { key, strict: true })
    }

    fn lower_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.seek(Seek::Floor { key, strict: true })
    }

    fn first_key<'s>(&'s self) -> Option<&'s K>
    where
        V: 's,
    {
        self.first_entry().map(|(k, _)| k)
    }

    fn last_key<'s>(&'s self) -> Option<&'s K>
    where
        V: 's,
    {
        self.last_entry().map(|(k, _)| k)
    }

    fn ceiling_key<'s>(&'s self, key: &K) -> Option<&'s K>
    where
        V: 's,
    {
        self.ceiling_entry(key).map(|(k, _)| k)
    }

    fn floor_key<'s>(&'s self, key: &K) -> Option<&'s K>
    where
        V: 's,
    {
        self.floor_entry(key).map(|(k, _)| k)
    }

    fn higher_key<'s>(&'s self, key: &K) -> Option<&'s K>
    where
        V: 's,
    {
        self.higher_entry(key).map(|(k, _)| k)
    }

    fn lower_key<'s>(&'s self, key: &K) -> Option<&'s K>
    where
        V: 's,
    {
        self.lower_entry(key).map(|(k, _)| k)
    }
}

impl<K, V, C: KeyCodec<K>> Seekable<K, V> for BitTrie<K, V, C> {
    fn seek(&self, to: Seek<'_, K>) -> Option<(&K, &V)> {
        let id = match to {
            Seek::First => self.first_node(),
            Seek::Last => self.last_node(),
            Seek::Ceiling { key, strict } => self.ceiling_node(key, strict),
            Seek::Floor { key, strict } => self.floor_node(key, strict),
        };
        self.entry(id?)
    }
}

impl<K, V, C: KeyCodec<K>> Navigable<K, V> for BitTrie<K, V, C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Cidr4, Cidr4Codec};
    use crate::CidrTrie;

    fn c(s: &str) -> Cidr4 {
        s.parse().unwrap()
    }

    fn trie(keys: &[&str]) -> CidrTrie<u32> {
        let mut t = CidrTrie::default();
        for (i, k) in keys.iter().enumerate() {
            t.insert(c(k), i as u32).unwrap();
        }
        t
    }

    fn s(k: Option<&Cidr4>) -> Option<String> {
        k.map(|k| k.to_string())
    }

    #[test]
    fn test_ceiling_on_empty() {
        let t: CidrTrie<u32> = CidrTrie::default();
        for k in ["10.0.0.0/8", "0.0.0.0/1", "255.255.255.255/32", "128.0.0.0/1"] {
            assert_eq!(t.ceiling_key(&c(k)), None);
            assert_eq!(t.floor_key(&c(k)), None);
            assert_eq!(t.higher_key(&c(k)), None);
            assert_eq!(t.lower_key(&c(k)), None);
        }
        assert_eq!(t.first_key(), None);
        assert_eq!(t.last_key(), None);
    }

    #[test]
    fn test_ceiling_floor() {
        let t = trie(&["10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24", "172.16.0.0/12"]);

        // Exact hits.
        assert_eq!(s(t.ceiling_key(&c("10.1.0.0/16"))), Some("10.1.0.0/16".into()));
        assert_eq!(s(t.floor_key(&c("10.1.0.0/16"))), Some("10.1.0.0/16".into()));
        assert_eq!(s(t.higher_key(&c("10.1.0.0/16"))), Some("10.1.2.0/24".into()));
        assert_eq!(s(t.lower_key(&c("10.1.0.0/16"))), Some("10.0.0.0/8".into()));

        // Between stored keys.
        assert_eq!(s(t.ceiling_key(&c("10.1.1.0/24"))), Some("10.1.2.0/24".into()));
        assert_eq!(s(t.floor_key(&c("10.1.1.0/24"))), Some("10.1.0.0/16".into()));
        assert_eq!(s(t.ceiling_key(&c("10.2.0.0/16"))), Some("172.16.0.0/12".into()));
        assert_eq!(s(t.floor_key(&c("10.2.0.0/16"))), Some("10.1.2.0/24".into()));
        assert_eq!(s(t.floor_key(&c("10.1.3.0/24"))), Some("10.1.2.0/24".into()));

        // Intermediate (value-less) node on an existing path.
        assert_eq!(s(t.ceiling_key(&c("10.1.0.0/20"))), Some("10.1.2.0/24".into()));
        assert_eq!(s(t.floor_key(&c("10.1.0.0/20"))), Some("10.1.0.0/16".into()));

        // Extending a stored key.
        assert_eq!(s(t.floor_key(&c("10.1.2.5/32"))), Some("10.1.2.0/24".into()));
        assert_eq!(s(t.ceiling_key(&c("10.1.2.5/32"))), Some("172.16.0.0/12".into()));

        // Edges.
        assert_eq!(s(t.ceiling_key(&c("1.0.0.0/8"))), Some("10.0.0.0/8".into()));
        assert_eq!(t.floor_key(&c("1.0.0.0/8")), None);
        assert_eq!(t.lower_key(&c("10.0.0.0/8")), None);
        assert_eq!(t.ceiling_key(&c("200.0.0.0/8")), None);
        assert_eq!(t.higher_key(&c("172.16.0.0/12")), None);
        assert_eq!(s(t.floor_key(&c("200.0.0.0/8"))), Some("172.16.0.0/12".into()));
        assert_eq!(t.ceiling_key(&c("255.255.255.255/32")), None);
    }

    #[test]
    fn test_first_last_entries() {
        let t = trie(&["172.16.0.0/12", "10.0.0.0/8", "10.1.0.0/16"]);
        assert_eq!(t.first_entry(), Some((&c("10.0.0.0/8"), &1)));
        assert_eq!(t.last_entry(), Some((&c("172.16.0.0/12"), &0)));
        assert_eq!(t.ceiling_entry(&c("10.0.0.0/9")), Some((&c("10.1.0.0/16"), &2)));
    }

    #[test]
    fn test_range_validation() {
        let codec = Cidr4Codec;
        let err = KeyRange::new(&codec, Bound::Included(c("11.0.0.0/8")), Bound::Included(c("10.0.0.0/8")));
        assert_eq!(err, Err(TrieError::InvertedRange));
        let r = KeyRange::new(&codec, Bound::Included(c("10.0.0.0/8")), Bound::Excluded(c("10.0.0.0/8"))).unwrap();
        assert!(!r.contains(&codec, &c("10.0.0.0/8")));

        let r = KeyRange::new(&codec, Bound::Included(c("10.0.0.0/8")), Bound::Excluded(c("12.0.0.0/8"))).unwrap();
        assert!(r.contains(&codec, &c("10.0.0.0/8")));
        assert!(r.contains(&codec, &c("11.255.0.0/16")));
        assert!(!r.contains(&codec, &c("12.0.0.0/8")));
        assert!(!r.contains(&codec, &c("9.0.0.0/8")));

        let narrowed = r.narrow(&codec, Bound::Excluded(c("10.0.0.0/8")), Bound::Unbounded).unwrap();
        assert_eq!(narrowed.hi(), Bound::Excluded(&c("12.0.0.0/8")));
        assert_eq!(
            r.narrow(&codec, Bound::Unbounded, Bound::Included(c("12.0.0.0/8"))),
            Err(TrieError::KeyOutOfRange)
        );
        assert!(r.narrow(&codec, Bound::Unbounded, Bound::Excluded(c("12.0.0.0/8"))).is_ok());
        assert_eq!(
            r.narrow(&codec, Bound::Included(c("9.0.0.0/8")), Bound::Unbounded),
            Err(TrieError::KeyOutOfRange)
        );
    }

    #[test]
    fn test_fences() {
        let t = trie(&["10.0.0.0/8", "11.0.0.0/8", "12.0.0.0/8", "13.0.0.0/8"]);
        let codec = Cidr4Codec;
        let range = KeyRange::new(&codec, Bound::Excluded(c("10.0.0.0/8")), Bound::Included(c("12.0.0.0/8"))).unwrap();
        let b = Bounds {
            trie: &t,
            range: &range,
            descending: false,
        };
        let key = |id: Option<NodeId>| id.and_then(|id| t.resolve_key(id)).map(|k| k.to_string());
        assert_eq!(key(b.first()), Some("11.0.0.0/8".into()));
        assert_eq!(key(b.last()), Some("12.0.0.0/8".into()));
        assert_eq!(key(b.abs_high_fence()), Some("13.0.0.0/8".into()));
        assert_eq!(key(b.abs_low_fence()), Some("10.0.0.0/8".into()));
        assert_eq!(key(b.ceiling(&c("1.0.0.0/8"), false)), Some("11.0.0.0/8".into()));
        assert_eq!(key(b.floor(&c("200.0.0.0/8"), false)), Some("12.0.0.0/8".into()));
        assert_eq!(b.ceiling(&c("12.0.0.0/8"), true), None);
        assert_eq!(b.floor(&c("11.0.0.0/8"), true), None);
    }

    #[test]
    fn test_navigation_survives_clear() {
        let mut t = trie(&["10.0.0.0/8", "10.1.0.0/16", "172.16.0.0/12"]);
        assert_eq!(s(t.last_key()), Some("172.16.0.0/12".into()));
        t.clear();
        assert_eq!(t.last_entry(), None);
        assert_eq!(t.floor_key(&c("200.0.0.0/8")), None);
        assert_eq!(t.higher_entry(&c("0.0.0.0/1")), None);

        t.insert(c("10.0.0.0/8"), 7).unwrap();
        assert_eq!(t.last_entry(), Some((&c("10.0.0.0/8"), &7)));
        assert_eq!(s(t.floor_key(&c("200.0.0.0/8"))), Some("10.0.0.0/8".into()));
    }
}
