//! Map-shaped views: borrowing iterators and bounded / descending sub-maps.
//!
//! A view is a trie reference plus an immutable [`KeyRange`] and a direction.
//! Sub-maps of views, descending views of sub-maps and so on are all the same
//! two structs with different descriptors.

use std::iter::FusedIterator;
use std::ops::Bound;

use crate::codec::KeyCodec;
use crate::cursor::{Cursor, Walk};
use crate::error::TrieError;
use crate::navigable::sealed::{Seek, Seekable};
use crate::navigable::{Bounds, KeyRange, Navigable};
use crate::node::NodeId;
use crate::trie::BitTrie;

// =============================================================================
// Iterators
// =============================================================================

/// Entries between two nodes inclusive, walked from either end.
pub struct Iter<'a, K, V, C> {
    trie: &'a BitTrie<K, V, C>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    descending: bool,
}

impl<'a, K, V, C> Iter<'a, K, V, C> {
    pub(crate) fn new(trie: &'a BitTrie<K, V, C>, front: Option<NodeId>, back: Option<NodeId>, descending: bool) -> Self {
        Self {
            trie,
            front,
            back,
            descending,
        }
    }

    /// Next node from the front, closing the iterator once the ends meet.
    fn step_front(&mut self) -> Option<NodeId> {
        let id = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = if self.descending {
                self.trie.predecessor(id, None, false)
            } else {
                self.trie.successor(id, None, false)
            };
        }
        Some(id)
    }

    fn step_back(&mut self) -> Option<NodeId> {
        let id = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = if self.descending {
                self.trie.successor(id, None, false)
            } else {
                self.trie.predecessor(id, None, false)
            };
        }
        Some(id)
    }
}

impl<'a, K, V, C: KeyCodec<K>> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.step_front()?;
        self.trie.entry(id)
    }
}

impl<'a, K, V, C: KeyCodec<K>> DoubleEndedIterator for Iter<'a, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.step_back()?;
        self.trie.entry(id)
    }
}

impl<'a, K, V, C: KeyCodec<K>> FusedIterator for Iter<'a, K, V, C> {}

pub struct Keys<'a, K, V, C> {
    inner: Iter<'a, K, V, C>,
}

impl<'a, K, V, C> Keys<'a, K, V, C> {
    pub(crate) fn new(inner: Iter<'a, K, V, C>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V, C: KeyCodec<K>> Iterator for Keys<'a, K, V, C> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

impl<'a, K, V, C: KeyCodec<K>> DoubleEndedIterator for Keys<'a, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

/// Values in key order. Keys are never materialized.
pub struct Values<'a, K, V, C> {
    inner: Iter<'a, K, V, C>,
}

impl<'a, K, V, C> Values<'a, K, V, C> {
    pub(crate) fn new(inner: Iter<'a, K, V, C>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V, C: KeyCodec<K>> Iterator for Values<'a, K, V, C> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.inner.step_front()?;
        self.inner.trie.value(id)
    }
}

impl<'a, K, V, C: KeyCodec<K>> DoubleEndedIterator for Values<'a, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.inner.step_back()?;
        self.inner.trie.value(id)
    }
}

// =============================================================================
// MapView
// =============================================================================

/// Read-only view of the entries of a trie inside a range.
pub struct MapView<'a, K, V, C> {
    trie: &'a BitTrie<K, V, C>,
    range: KeyRange<K>,
    descending: bool,
}

impl<'a, K, V, C: KeyCodec<K>> MapView<'a, K, V, C> {
    fn bounds(&self) -> Bounds<'a, '_, K, V, C> {
        Bounds {
            trie: self.trie,
            range: &self.range,
            descending: self.descending,
        }
    }

    pub fn range(&self) -> &KeyRange<K> {
        &self.range
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.range.contains(&self.trie.codec, key) && self.trie.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&'a V> {
        if !self.range.contains(&self.trie.codec, key) {
            return None;
        }
        self.trie.get(key)
    }

    /// Counts by walking the range.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().first().is_none()
    }

    /// Entries in this view's direction.
    pub fn iter(&self) -> Iter<'a, K, V, C> {
        let b = self.bounds();
        Iter::new(self.trie, b.first(), b.last(), self.descending)
    }

    pub fn keys(&self) -> Keys<'a, K, V, C> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'a, K, V, C> {
        Values::new(self.iter())
    }

    /// Detached fail-fast cursor over this view.
    pub fn cursor(&self) -> Cursor {
        range_cursor(&self.bounds())
    }

    /// The same range walked the other way.
    pub fn descending(self) -> Self {
        Self {
            descending: !self.descending,
            ..self
        }
    }

    /// Narrow to `from..to` in this view's direction. Fails if `from` sorts
    /// after `to`, or either end lies outside the view.
    pub fn sub_map(&self, from: K, from_inclusive: bool, to: K, to_inclusive: bool) -> Result<Self, TrieError>
    where
        K: Clone,
    {
        let (from, to) = (bound(from, from_inclusive), bound(to, to_inclusive));
        self.narrowed(from, to)
    }

    /// Entries before `to` in this view's direction.
    pub fn head_map(&self, to: K, inclusive: bool) -> Result<Self, TrieError>
    where
        K: Clone,
    {
        self.narrowed(Bound::Unbounded, bound(to, inclusive))
    }

    /// Entries from `from` onward in this view's direction.
    pub fn tail_map(&self, from: K, inclusive: bool) -> Result<Self, TrieError>
    where
        K: Clone,
    {
        self.narrowed(bound(from, inclusive), Bound::Unbounded)
    }

    /// `from`/`to` are in view order; flip them for a descending view.
    fn narrowed(&self, from: Bound<K>, to: Bound<K>) -> Result<Self, TrieError>
    where
        K: Clone,
    {
        let (lo, hi) = if self.descending { (to, from) } else { (from, to) };
        Ok(Self {
            trie: self.trie,
            range: self.range.narrow(&self.trie.codec, lo, hi)?,
            descending: self.descending,
        })
    }
}

fn bound<K>(key: K, inclusive: bool) -> Bound<K> {
    if inclusive {
        Bound::Included(key)
    } else {
        Bound::Excluded(key)
    }
}

fn range_cursor<K, V, C: KeyCodec<K>>(b: &Bounds<'_, '_, K, V, C>) -> Cursor {
    let walk = if b.descending {
        Walk::Descending {
            end: b.abs_low_fence(),
        }
    } else {
        Walk::Ascending {
            end: b.abs_high_fence(),
        }
    };
    Cursor::new(walk, b.first(), b.trie.mod_count)
}

impl<'a, K, V, C: KeyCodec<K>> Seekable<K, V> for MapView<'a, K, V, C> {
    fn seek(&self, to: Seek<'_, K>) -> Option<(&K, &V)> {
        self.trie.entry(self.bounds().seek(to)?)
    }
}

impl<'a, K, V, C: KeyCodec<K>> Navigable<K, V> for MapView<'a, K, V, C> {}

impl<'a, K, V, C: KeyCodec<K>> IntoIterator for &MapView<'a, K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// MapViewMut
// =============================================================================

/// Mutable view of a range. Inserting or removing a key outside the range is
/// [`TrieError::KeyOutOfRange`]; lookups outside it find nothing.
pub struct MapViewMut<'a, K, V, C> {
    trie: &'a mut BitTrie<K, V, C>,
    range: KeyRange<K>,
    descending: bool,
}

impl<'a, K, V, C: KeyCodec<K>> MapViewMut<'a, K, V, C> {
    fn bounds(&self) -> Bounds<'_, '_, K, V, C> {
        Bounds {
            trie: &*self.trie,
            range: &self.range,
            descending: self.descending,
        }
    }

    pub fn range(&self) -> &KeyRange<K> {
        &self.range
    }

    pub fn descending(self) -> Self {
        Self {
            descending: !self.descending,
            ..self
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TrieError> {
        if !self.range.contains(&self.trie.codec, &key) {
            return Err(TrieError::KeyOutOfRange);
        }
        self.trie.insert(key, value)
    }

    /// Fails with [`TrieError::KeyOutOfRange`] for a key outside the range.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, TrieError> {
        if !self.range.contains(&self.trie.codec, key) {
            return Err(TrieError::KeyOutOfRange);
        }
        Ok(self.trie.remove(key))
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        if !self.range.contains(&self.trie.codec, key) {
            return None;
        }
        self.trie.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.range.contains(&self.trie.codec, key) {
            return None;
        }
        self.trie.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.range.contains(&self.trie.codec, key) && self.trie.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().first().is_none()
    }

    /// First entry in this view's direction, removed.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let id = self.bounds().first()?;
        self.trie.remove_entry_at(id)
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let id = self.bounds().last()?;
        self.trie.remove_entry_at(id)
    }

    /// Remove every entry in the range. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;
        while self.pop_first().is_some() {
            removed += 1;
        }
        removed
    }

    pub fn iter(&self) -> Iter<'_, K, V, C> {
        let b = self.bounds();
        Iter::new(&*self.trie, b.first(), b.last(), self.descending)
    }

    pub fn keys(&self) -> Keys<'_, K, V, C> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V, C> {
        Values::new(self.iter())
    }

    pub fn cursor(&self) -> Cursor {
        range_cursor(&self.bounds())
    }

    /// Re-borrow the underlying trie, for use with a [`Cursor`].
    pub fn trie_mut(&mut self) -> &mut BitTrie<K, V, C> {
        self.trie
    }
}

impl<'a, K, V, C: KeyCodec<K>> Seekable<K, V> for MapViewMut<'a, K, V, C> {
    fn seek(&self, to: Seek<'_, K>) -> Option<(&K, &V)> {
        self.trie.entry(self.bounds().seek(to)?)
    }
}

impl<'a, K, V, C: KeyCodec<K>> Navigable<K, V> for MapViewMut<'a, K, V, C> {}

// =============================================================================
// View constructors
// =============================================================================

impl<K, V, C: KeyCodec<K>> BitTrie<K, V, C> {
    /// Entries with `lo`/`hi` bounds, ascending. Fails if `lo` sorts after `hi`.
    pub fn range_view(&self, lo: Bound<K>, hi: Bound<K>) -> Result<MapView<'_, K, V, C>, TrieError> {
        Ok(MapView {
            trie: self,
            range: KeyRange::new(&self.codec, lo, hi)?,
            descending: false,
        })
    }

    pub fn range_view_mut(&mut self, lo: Bound<K>, hi: Bound<K>) -> Result<MapViewMut<'_, K, V, C>, TrieError> {
        let range = KeyRange::new(&self.codec, lo, hi)?;
        Ok(MapViewMut {
            trie: self,
            range,
            descending: false,
        })
    }

    pub fn sub_map(&self, from: K, from_inclusive: bool, to: K, to_inclusive: bool) -> Result<MapView<'_, K, V, C>, TrieError> {
        self.range_view(bound(from, from_inclusive), bound(to, to_inclusive))
    }

    pub fn head_map(&self, to: K, inclusive: bool) -> MapView<'_, K, V, C> {
        MapView {
            trie: self,
            range: KeyRange::from_bounds(Bound::Unbounded, bound(to, inclusive)),
            descending: false,
        }
    }

    pub fn tail_map(&self, from: K, inclusive: bool) -> MapView<'_, K, V, C> {
        MapView {
            trie: self,
            range: KeyRange::from_bounds(bound(from, inclusive), Bound::Unbounded),
            descending: false,
        }
    }

    /// Every entry, largest key first.
    pub fn descending(&self) -> MapView<'_, K, V, C> {
        MapView {
            trie: self,
            range: KeyRange::full(),
            descending: true,
        }
    }

    /// Every entry, as a view.
    pub fn as_view(&self) -> MapView<'_, K, V, C> {
        MapView {
            trie: self,
            range: KeyRange::full(),
            descending: false,
        }
    }

    /// Detached fail-fast cursor over all entries, ascending.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(Walk::Ascending { end: None }, self.first_node(), self.mod_count)
    }
}
