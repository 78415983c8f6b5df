//! Detached, fail-fast iteration.
//!
//! A [`Cursor`] does not borrow the trie. Each step takes the trie as an
//! argument, so the caller may remove the current entry through the cursor in
//! between steps. Any other structural change to the trie makes the next step
//! fail with [`TrieError::ConcurrentModification`].

use crate::codec::KeyCodec;
use crate::error::TrieError;
use crate::node::NodeId;
use crate::prefix::PrefixWalk;
use crate::trie::BitTrie;

/// How a cursor finds the node after the current one.
#[derive(Clone, Debug)]
pub(crate) enum Walk {
    /// Successor order, stopping before `end`.
    Ascending { end: Option<NodeId> },
    /// Predecessor order, stopping before `end`.
    Descending { end: Option<NodeId> },
    Prefix(PrefixWalk),
}

impl Walk {
    fn step<K, V, C>(&mut self, trie: &BitTrie<K, V, C>, from: NodeId) -> Option<NodeId> {
        match self {
            Walk::Ascending { end } => trie
                .successor(from, None, false)
                .filter(|&id| Some(id) != *end),
            Walk::Descending { end } => trie
                .predecessor(from, None, false)
                .filter(|&id| Some(id) != *end),
            Walk::Prefix(walk) => walk.next_match(trie),
        }
    }
}

/// Fail-fast position in an ordered walk over a trie.
///
/// The node after the current one is found before the current entry is
/// handed out, so removing the current entry never disturbs the walk.
#[derive(Clone, Debug)]
pub struct Cursor {
    walk: Walk,
    upcoming: Option<NodeId>,
    current: Option<NodeId>,
    expected_mod_count: u64,
}

impl Cursor {
    pub(crate) fn new(walk: Walk, first: Option<NodeId>, mod_count: u64) -> Self {
        Self {
            walk,
            upcoming: first,
            current: None,
            expected_mod_count: mod_count,
        }
    }

    fn check<K, V, C>(&self, trie: &BitTrie<K, V, C>) -> Result<(), TrieError> {
        if trie.mod_count != self.expected_mod_count {
            return Err(TrieError::ConcurrentModification);
        }
        Ok(())
    }

    /// Advance and return the next entry, or `None` when exhausted.
    ///
    /// `trie` must be the trie this cursor was created from.
    pub fn next<'t, K, V, C: KeyCodec<K>>(
        &mut self,
        trie: &'t BitTrie<K, V, C>,
    ) -> Result<Option<(&'t K, &'t V)>, TrieError> {
        self.check(trie)?;
        let Some(id) = self.upcoming else {
            self.current = None;
            return Ok(None);
        };
        self.upcoming = self.walk.step(trie, id);
        self.current = Some(id);
        Ok(trie.entry(id))
    }

    /// Whether another entry follows. Does not check for modification.
    pub fn has_next(&self) -> bool {
        self.upcoming.is_some()
    }

    /// Remove the entry last returned by [`next`](Self::next) from the trie
    /// and keep the cursor valid.
    pub fn remove<K, V, C: KeyCodec<K>>(&mut self, trie: &mut BitTrie<K, V, C>) -> Result<V, TrieError> {
        self.check(trie)?;
        let id = self.current.take().ok_or(TrieError::NoCurrentEntry)?;
        let value = trie.remove_node(id).ok_or(TrieError::NoCurrentEntry)?;
        self.expected_mod_count = trie.mod_count;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Bound;

    use crate::codec::Cidr4;
    use crate::error::TrieError;
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

    #[test]
    fn test_cursor_walks_all() {
        let t = trie(&["11.0.0.0/8", "10.0.0.0/8", "10.1.0.0/16"]);
        let mut cur = t.cursor();
        let mut got = Vec::new();
        while let Some((k, v)) = cur.next(&t).unwrap() {
            got.push((k.to_string(), *v));
        }
        assert_eq!(
            got,
            [("10.0.0.0/8".to_owned(), 1), ("10.1.0.0/16".to_owned(), 2), ("11.0.0.0/8".to_owned(), 0)]
        );
        assert!(!cur.has_next());
        assert_eq!(cur.next(&t), Ok(None));
    }

    #[test]
    fn test_modification_fails_fast() {
        let mut t = trie(&["10.0.0.0/8", "11.0.0.0/8"]);
        let mut cur = t.cursor();
        assert!(cur.next(&t).unwrap().is_some());
        t.insert(c("12.0.0.0/8"), 5).unwrap();
        assert_eq!(cur.next(&t), Err(TrieError::ConcurrentModification));

        let mut cur = t.cursor();
        assert!(cur.next(&t).unwrap().is_some());
        t.remove(&c("12.0.0.0/8"));
        assert_eq!(cur.next(&t), Err(TrieError::ConcurrentModification));

        let mut cur = t.cursor();
        t.clear();
        assert_eq!(cur.next(&t), Err(TrieError::ConcurrentModification));
    }

    #[test]
    fn test_value_replacement_is_not_structural() {
        let mut t = trie(&["10.0.0.0/8", "11.0.0.0/8"]);
        let mut cur = t.cursor();
        assert!(cur.next(&t).unwrap().is_some());
        t.insert(c("11.0.0.0/8"), 9).unwrap();
        assert_eq!(cur.next(&t), Ok(Some((&c("11.0.0.0/8"), &9))));
    }

    #[test]
    fn test_remove_through_cursor() {
        let mut t = trie(&["10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24", "11.0.0.0/8"]);
        let mut cur = t.cursor();
        assert_eq!(cur.remove(&mut t), Err(TrieError::NoCurrentEntry));
        let mut kept = Vec::new();
        loop {
            let Some((k, _)) = cur.next(&t).unwrap() else { break };
            if k.prefix_len() == 16 || k.prefix_len() == 24 {
                cur.remove(&mut t).unwrap();
                assert_eq!(cur.remove(&mut t), Err(TrieError::NoCurrentEntry));
            } else {
                kept.push(k.to_string());
            }
        }
        assert_eq!(kept, ["10.0.0.0/8", "11.0.0.0/8"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.node_count(), 1 + 8 + 1);
    }

    #[test]
    fn test_bounded_cursor_stops_at_fence() {
        let mut t = trie(&["10.0.0.0/8", "11.0.0.0/8", "12.0.0.0/8", "13.0.0.0/8"]);
        let mut cur = t
            .range_view(Bound::Excluded(c("10.0.0.0/8")), Bound::Included(c("12.0.0.0/8")))
            .unwrap()
            .cursor();
        let mut n = 0;
        while cur.next(&t).unwrap().is_some() {
            cur.remove(&mut t).unwrap();
            n += 1;
        }
        assert_eq!(n, 2);
        let left: Vec<String> = t.keys().map(|k| k.to_string()).collect();
        assert_eq!(left, ["10.0.0.0/8", "13.0.0.0/8"]);
    }

    #[test]
    fn test_descending_cursor() {
        let t = trie(&["10.0.0.0/8", "11.0.0.0/8", "12.0.0.0/8", "13.0.0.0/8"]);
        let view = t
            .range_view(Bound::Included(c("11.0.0.0/8")), Bound::Unbounded)
            .unwrap()
            .descending();
        let mut cur = view.cursor();
        let mut got = Vec::new();
        while let Some((k, _)) = cur.next(&t).unwrap() {
            got.push(k.to_string());
        }
        assert_eq!(got, ["13.0.0.0/8", "12.0.0.0/8", "11.0.0.0/8"]);
    }
}
