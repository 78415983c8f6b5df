//! Prefix-relationship queries.
//!
//! A query walks the query key's bit path from the root. Valued nodes met
//! above the key's depth are its prefixes, the node at its depth is the key
//! itself, and the valued nodes of that node's subtree are the keys it
//! prefixes. The three groups can be selected independently and always come
//! out in ascending order.

use std::iter::FusedIterator;

use crate::codec::{BitPath, KeyCodec};
use crate::cursor::{Cursor, Walk};
use crate::node::NodeId;
use crate::trie::BitTrie;

/// Which stored keys a prefix query yields, relative to the query key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PrefixScope {
    /// Stored keys that are proper prefixes of the query.
    pub prefixes: bool,
    /// The query key itself, if stored.
    pub exact: bool,
    /// Stored keys the query is a proper prefix of.
    pub extensions: bool,
}

impl PrefixScope {
    pub const fn prefixes_of(inclusive: bool) -> Self {
        Self {
            prefixes: true,
            exact: inclusive,
            extensions: false,
        }
    }

    pub const fn prefixed_by(inclusive: bool) -> Self {
        Self {
            prefixes: false,
            exact: inclusive,
            extensions: true,
        }
    }

    pub const fn prefix_of_or_by(inclusive: bool) -> Self {
        Self {
            prefixes: true,
            exact: inclusive,
            extensions: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    /// Following the query path; `node` sits at `depth`.
    Path { node: NodeId, depth: usize },
    /// Pre-order walk below `fence`, last yielded `node`.
    Subtree { fence: NodeId, node: NodeId },
    Done,
}

/// Resumable state of one prefix query.
#[derive(Clone, Debug)]
pub(crate) struct PrefixWalk {
    path: BitPath,
    scope: PrefixScope,
    phase: Phase,
}

impl PrefixWalk {
    pub(crate) fn new(path: BitPath, scope: PrefixScope) -> Self {
        Self {
            path,
            scope,
            phase: Phase::Path {
                node: NodeId::ROOT,
                depth: 0,
            },
        }
    }

    /// Next matching valued node, or `None` once the query is exhausted.
    ///
    /// Only ever holds on to nodes at or after the last match, so the caller
    /// may remove earlier matches between calls.
    pub(crate) fn next_match<K, V, C>(&mut self, trie: &BitTrie<K, V, C>) -> Option<NodeId> {
        loop {
            match self.phase {
                Phase::Path { node, depth } => {
                    let n = trie.nodes.get(node);
                    let hit = if depth < self.path.len() {
                        self.phase = match n.child(self.path.is_left(depth)) {
                            Some(child) => Phase::Path {
                                node: child,
                                depth: depth + 1,
                            },
                            None => Phase::Done,
                        };
                        self.scope.prefixes
                    } else {
                        self.phase = if self.scope.extensions {
                            Phase::Subtree { fence: node, node }
                        } else {
                            Phase::Done
                        };
                        self.scope.exact
                    };
                    if hit && node != NodeId::ROOT && n.has_value() {
                        return Some(node);
                    }
                }
                Phase::Subtree { fence, node } => match trie.successor(node, Some(fence), false) {
                    Some(next) => {
                        self.phase = Phase::Subtree { fence, node: next };
                        return Some(next);
                    }
                    None => {
                        self.phase = Phase::Done;
                        return None;
                    }
                },
                Phase::Done => return None,
            }
        }
    }
}

// =============================================================================
// PrefixView
// =============================================================================

/// Lazy, restartable sequence of the entries a prefix query matches.
///
/// Nothing is walked until iterated; each iteration starts from the root again.
pub struct PrefixView<'a, K, V, C> {
    trie: &'a BitTrie<K, V, C>,
    path: BitPath,
    scope: PrefixScope,
}

impl<'a, K, V, C: KeyCodec<K>> PrefixView<'a, K, V, C> {
    fn walk(&self) -> PrefixWalk {
        PrefixWalk::new(self.path.clone(), self.scope)
    }

    pub fn scope(&self) -> PrefixScope {
        self.scope
    }

    /// Matches in ascending order.
    pub fn iter(&self) -> PrefixIter<'a, K, V, C> {
        PrefixIter {
            trie: self.trie,
            walk: self.walk(),
        }
    }

    pub fn keys(&self) -> PrefixKeys<'a, K, V, C> {
        PrefixKeys { inner: self.iter() }
    }

    /// Matching values. Keys are never materialized.
    pub fn values(&self) -> PrefixValues<'a, K, V, C> {
        PrefixValues { inner: self.iter() }
    }

    /// Shortest match.
    pub fn first(&self) -> Option<(&'a K, &'a V)> {
        self.iter().next()
    }

    /// Longest match for prefix-of queries; last in ascending order in general.
    pub fn last(&self) -> Option<(&'a K, &'a V)> {
        let id = self.last_id()?;
        self.trie.entry(id)
    }

    fn last_id(&self) -> Option<NodeId> {
        let mut walk = self.walk();
        let mut last = None;
        while let Some(id) = walk.next_match(self.trie) {
            last = Some(id);
        }
        last
    }

    pub fn count(&self) -> usize {
        let mut walk = self.walk();
        std::iter::from_fn(|| walk.next_match(self.trie)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.walk().next_match(self.trie).is_none()
    }

    /// Detached fail-fast cursor over the matches. Removing through it removes
    /// the entry from the trie.
    pub fn cursor(&self) -> Cursor {
        let mut walk = self.walk();
        let first = walk.next_match(self.trie);
        Cursor::new(Walk::Prefix(walk), first, self.trie.mod_count)
    }
}

impl<'a, K, V, C: KeyCodec<K>> IntoIterator for &PrefixView<'a, K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = PrefixIter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct PrefixIter<'a, K, V, C> {
    trie: &'a BitTrie<K, V, C>,
    walk: PrefixWalk,
}

impl<'a, K, V, C> PrefixIter<'a, K, V, C> {
    fn next_id(&mut self) -> Option<NodeId> {
        self.walk.next_match(self.trie)
    }
}

impl<'a, K, V, C: KeyCodec<K>> Iterator for PrefixIter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next_id()?;
        self.trie.entry(id)
    }
}

impl<'a, K, V, C: KeyCodec<K>> FusedIterator for PrefixIter<'a, K, V, C> {}

pub struct PrefixKeys<'a, K, V, C> {
    inner: PrefixIter<'a, K, V, C>,
}

impl<'a, K, V, C: KeyCodec<K>> Iterator for PrefixKeys<'a, K, V, C> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

pub struct PrefixValues<'a, K, V, C> {
    inner: PrefixIter<'a, K, V, C>,
}

impl<'a, K, V, C: KeyCodec<K>> Iterator for PrefixValues<'a, K, V, C> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.inner.next_id()?;
        self.inner.trie.value(id)
    }
}

// =============================================================================
// Trie surface
// =============================================================================

impl<K, V, C: KeyCodec<K>> BitTrie<K, V, C> {
    /// Entries related to `key` as selected by `scope`.
    pub fn prefix_view(&self, key: &K, scope: PrefixScope) -> PrefixView<'_, K, V, C> {
        PrefixView {
            trie: self,
            path: BitPath::from_key(&self.codec, key),
            scope,
        }
    }

    /// Stored keys that are prefixes of `key`, shortest first. `inclusive`
    /// admits `key` itself.
    pub fn prefixes_of(&self, key: &K, inclusive: bool) -> PrefixView<'_, K, V, C> {
        self.prefix_view(key, PrefixScope::prefixes_of(inclusive))
    }

    /// Stored keys that `key` is a prefix of, ascending.
    pub fn prefixed_by(&self, key: &K, inclusive: bool) -> PrefixView<'_, K, V, C> {
        self.prefix_view(key, PrefixScope::prefixed_by(inclusive))
    }

    pub fn prefix_of_or_by(&self, key: &K, inclusive: bool) -> PrefixView<'_, K, V, C> {
        self.prefix_view(key, PrefixScope::prefix_of_or_by(inclusive))
    }

    pub fn values_prefix_of(&self, key: &K, inclusive: bool) -> PrefixValues<'_, K, V, C> {
        self.prefixes_of(key, inclusive).values()
    }

    pub fn values_prefixed_by(&self, key: &K, inclusive: bool) -> PrefixValues<'_, K, V, C> {
        self.prefixed_by(key, inclusive).values()
    }

    pub fn values_prefix_of_or_by(&self, key: &K, inclusive: bool) -> PrefixValues<'_, K, V, C> {
        self.prefix_of_or_by(key, inclusive).values()
    }

    /// Longest-prefix match: the most specific stored key covering `key`.
    pub fn longest_prefix_of(&self, key: &K, inclusive: bool) -> Option<(&K, &V)> {
        self.prefixes_of(key, inclusive).last()
    }

    pub fn shortest_prefix_of(&self, key: &K, inclusive: bool) -> Option<(&K, &V)> {
        self.prefixes_of(key, inclusive).first()
    }

    pub fn value_longest_prefix_of(&self, key: &K, inclusive: bool) -> Option<&V> {
        let id = self.prefixes_of(key, inclusive).last_id()?;
        self.value(id)
    }

    pub fn value_shortest_prefix_of(&self, key: &K, inclusive: bool) -> Option<&V> {
        self.values_prefix_of(key, inclusive).next()
    }

    /// Last entry below `key` in ascending order.
    pub fn value_longest_prefixed_by(&self, key: &K, inclusive: bool) -> Option<&V> {
        let id = self.prefixed_by(key, inclusive).last_id()?;
        self.value(id)
    }

    /// First entry below `key` in ascending order.
    pub fn value_shortest_prefixed_by(&self, key: &K, inclusive: bool) -> Option<&V> {
        self.values_prefixed_by(key, inclusive).next()
    }

    /// Remove every entry `key` is a prefix of. Returns how many went.
    pub fn remove_prefixed_by(&mut self, key: &K, inclusive: bool) -> usize {
        let mut walk = PrefixWalk::new(BitPath::from_key(&self.codec, key), PrefixScope::prefixed_by(inclusive));
        let mut removed = 0;
        // Step past each match before removing it; pruning only frees nodes
        // the walk has already left.
        let mut next = walk.next_match(self);
        while let Some(id) = next {
            next = walk.next_match(self);
            if self.remove_node(id).is_some() {
                removed += 1;
            }
        }
        removed
    }
}
