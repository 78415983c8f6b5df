use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use tracing::debug;

use crate::codec::KeyCodec;
use crate::config::TrieConfig;
use crate::error::TrieError;
use crate::node::{NodeArena, NodeId};
use crate::view::{Iter, Keys, Values};
use crate::LOG_TARGET;

// =============================================================================
// BitTrie
// =============================================================================

/// An uncompressed binary trie keyed by bit sequences.
///
/// Each key lives at the node reached by following its bits from the root
/// (`0` = left, `1` = right). Nodes are created on insert and pruned on
/// removal, so every childless node below the root holds a value. Ascending
/// order is pre-order: a key sorts right before the keys it prefixes.
pub struct BitTrie<K, V, C> {
    pub(crate) nodes: NodeArena<K, V>,
    pub(crate) codec: C,
    pub(crate) config: TrieConfig,
    pub(crate) len: usize,
    /// Bumped on every structural change; cursors compare against it.
    pub(crate) mod_count: u64,
}

/// Where a key's descent from the root stopped.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Descent {
    /// Deepest node reached along the key's path.
    pub(crate) node: NodeId,
    pub(crate) depth: usize,
    pub(crate) len: usize,
    /// Branch that was missing below `node`. Meaningless when complete.
    pub(crate) wanted_left: bool,
}

impl Descent {
    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.depth == self.len
    }
}

impl<K, V, C: KeyCodec<K>> BitTrie<K, V, C> {
    pub fn new(codec: C) -> Self {
        Self::with_config(codec, TrieConfig::default())
    }

    pub fn with_config(codec: C, config: TrieConfig) -> Self {
        let config = config.sanitize();
        Self {
            nodes: NodeArena::with_capacity(config.node_capacity),
            codec,
            config,
            len: 0,
            mod_count: 0,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn config(&self) -> &TrieConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of arena nodes currently linked into the tree, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.live()
    }

    pub fn memory_usage(&self) -> usize {
        self.nodes.memory_usage()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Follow `key`'s bits as far as existing nodes allow.
    pub(crate) fn descend(&self, key: &K) -> Descent {
        let len = self.codec.length(key);
        let mut node = NodeId::ROOT;
        for depth in 0..len {
            let left = self.codec.is_left(key, depth);
            match self.nodes.get(node).child(left) {
                Some(child) => node = child,
                None => {
                    return Descent {
                        node,
                        depth,
                        len,
                        wanted_left: left,
                    }
                }
            }
        }
        Descent {
            node,
            depth: len,
            len,
            wanted_left: false,
        }
    }

    /// The node at `key`'s full path, valued or not.
    pub(crate) fn locate(&self, key: &K) -> Option<NodeId> {
        let d = self.descend(key);
        (d.is_complete() && d.len > 0).then_some(d.node)
    }

    fn locate_valued(&self, key: &K) -> Option<NodeId> {
        self.locate(key).filter(|&id| self.nodes.get(id).has_value())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.nodes.get(self.locate(key)?).value.as_ref()
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.locate(key)?;
        self.nodes.get_mut(id).value.as_mut()
    }

    /// The stored key equal to `key` together with its value.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.entry(self.locate_valued(key)?)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.locate_valued(key).is_some()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    /// Insert or replace. Returns the previous value.
    ///
    /// Fails with [`TrieError::EmptyKey`] if `key` encodes to zero bits.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TrieError> {
        let len = self.codec.length(&key);
        if len == 0 {
            return Err(TrieError::EmptyKey);
        }

        let mut node = NodeId::ROOT;
        for depth in 0..len {
            let left = self.codec.is_left(&key, depth);
            node = match self.nodes.get(node).child(left) {
                Some(child) => child,
                None => self.nodes.alloc_child(node, left),
            };
        }

        let retain = self.config.retain_keys;
        let n = self.nodes.get_mut(node);
        let old = n.value.replace(value);
        if retain {
            n.key = OnceLock::from(key);
        }
        if old.is_none() {
            self.len += 1;
            self.mod_count += 1;
        }
        Ok(old)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.locate(key)?;
        self.remove_node(id)
    }

    /// Remove and return the stored key and its value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let id = self.locate(key)?;
        self.remove_entry_at(id)
    }

    /// Clear a node's value and prune the branch it leaves behind.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<V> {
        let node = self.nodes.get_mut(id);
        let old = node.value.take()?;
        node.key.take();
        self.len -= 1;
        self.mod_count += 1;
        self.prune(id);
        Some(old)
    }

    pub(crate) fn remove_entry_at(&mut self, id: NodeId) -> Option<(K, V)> {
        self.resolve_key(id)?;
        let key = self.nodes.get_mut(id).key.take()?;
        let value = self.remove_node(id)?;
        Some((key, value))
    }

    /// Walk upward releasing value-less leaves until an occupied node or the
    /// root is reached.
    fn prune(&mut self, from: NodeId) {
        let mut cur = from;
        while cur != NodeId::ROOT {
            let node = self.nodes.get(cur);
            if node.has_value() || !node.is_leaf() {
                break;
            }
            let Some(parent) = node.parent else { break };
            self.nodes.release(cur);
            cur = parent;
        }
    }

    pub fn clear(&mut self) {
        debug!(target: LOG_TARGET, len = self.len, "Clearing trie");
        self.nodes.reset();
        self.len = 0;
        self.mod_count += 1;
    }

    /// Insert every pair in iteration order. Stops at the first invalid key;
    /// pairs before it stay inserted.
    pub fn bulk_insert<I>(&mut self, entries: I) -> Result<usize, TrieError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut added = 0;
        let mut outcome = Ok(());
        for (key, value) in entries {
            match self.insert(key, value) {
                Ok(None) => added += 1,
                Ok(Some(_)) => {}
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        self.mod_count += 1;
        debug!(target: LOG_TARGET, added, len = self.len, failed = outcome.is_err(), "Bulk insert finished");
        outcome.map(|()| added)
    }

    /// Keep only the entries for which `f` returns `true`, visiting in
    /// ascending order.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut next = self.first_node();
        while let Some(id) = next {
            next = self.successor(id, None, false);
            if self.resolve_key(id).is_none() {
                continue;
            }
            let node = self.nodes.get_mut(id);
            let keep = match (node.key.get(), node.value.as_mut()) {
                (Some(key), Some(value)) => f(key, value),
                _ => true,
            };
            if !keep {
                self.remove_node(id);
            }
        }
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let id = self.first_node()?;
        self.remove_entry_at(id)
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let id = self.last_node()?;
        self.remove_entry_at(id)
    }

    /// Ascending entries.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter::new(self, self.first_node(), self.last_node(), false)
    }

    pub fn keys(&self) -> Keys<'_, K, V, C> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V, C> {
        Values::new(self.iter())
    }

    pub(crate) fn value(&self, id: NodeId) -> Option<&V> {
        self.nodes.get(id).value.as_ref()
    }

    /// Key and value of a valued node, materializing the key if needed.
    pub(crate) fn entry(&self, id: NodeId) -> Option<(&K, &V)> {
        let value = self.value(id)?;
        Some((self.resolve_key(id)?, value))
    }
}

// =============================================================================
// Stackless traversal
// =============================================================================

impl<K, V, C> BitTrie<K, V, C> {
    /// First node of `id`'s subtree in pre-order, skipping value-less nodes
    /// unless `include_empty`.
    fn first_in_subtree(&self, mut id: NodeId, include_empty: bool) -> NodeId {
        loop {
            let node = self.nodes.get(id);
            if include_empty || node.has_value() {
                return id;
            }
            match node.left.or(node.right) {
                Some(child) => id = child,
                None => {
                    debug_assert!(false, "value-less leaf reachable from root");
                    return id;
                }
            }
        }
    }

    /// Last node of `id`'s subtree in pre-order: the rightmost-then-leftmost
    /// leaf, which always holds a value.
    pub(crate) fn last_in_subtree(&self, mut id: NodeId) -> NodeId {
        loop {
            let node = self.nodes.get(id);
            match node.right.or(node.left) {
                Some(child) => id = child,
                None => return id,
            }
        }
    }

    /// Next node in ascending order after `id`.
    ///
    /// With a `fence`, the walk never leaves the fence's subtree.
    pub(crate) fn successor(&self, id: NodeId, fence: Option<NodeId>, include_empty: bool) -> Option<NodeId> {
        let node = self.nodes.get(id);
        if let Some(child) = node.left.or(node.right) {
            return Some(self.first_in_subtree(child, include_empty));
        }
        self.next_after_subtree(id, fence, include_empty)
    }

    /// First node in ascending order that is not inside `id`'s subtree.
    pub(crate) fn next_after_subtree(&self, id: NodeId, fence: Option<NodeId>, include_empty: bool) -> Option<NodeId> {
        let mut cur = id;
        loop {
            if Some(cur) == fence {
                return None;
            }
            let parent = self.nodes.get(cur).parent?;
            let p = self.nodes.get(parent);
            if p.left == Some(cur) {
                if let Some(right) = p.right {
                    return Some(self.first_in_subtree(right, include_empty));
                }
            }
            cur = parent;
        }
    }

    /// Previous node in ascending order before `id`. The root is never
    /// returned.
    pub(crate) fn predecessor(&self, id: NodeId, fence: Option<NodeId>, include_empty: bool) -> Option<NodeId> {
        let mut cur = id;
        loop {
            if Some(cur) == fence {
                return None;
            }
            let parent = self.nodes.get(cur).parent?;
            let p = self.nodes.get(parent);
            if p.right == Some(cur) {
                if let Some(left) = p.left {
                    return Some(self.last_in_subtree(left));
                }
            }
            if parent == NodeId::ROOT {
                return None;
            }
            if include_empty || p.has_value() {
                return Some(parent);
            }
            cur = parent;
        }
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.successor(NodeId::ROOT, None, false)
    }

    pub(crate) fn last_node(&self) -> Option<NodeId> {
        let root = self.nodes.get(NodeId::ROOT);
        root.right.or(root.left).map(|child| self.last_in_subtree(child))
    }
}

// =============================================================================
// Std trait impls
// =============================================================================

impl<K, V, C: KeyCodec<K> + Default> Default for BitTrie<K, V, C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

/// Copies build fresh nodes; key cells start empty and are rebuilt on demand.
impl<K, V: Clone, C: Clone> Clone for BitTrie<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone_values(),
            codec: self.codec.clone(),
            config: self.config,
            len: self.len,
            mod_count: 0,
        }
    }
}

impl<K: PartialEq, V: PartialEq, C: KeyCodec<K>> PartialEq for BitTrie<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C: KeyCodec<K>> Eq for BitTrie<K, V, C> {}

impl<K: Hash, V: Hash, C: KeyCodec<K>> Hash for BitTrie<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for entry in self.iter() {
            entry.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: KeyCodec<K>> fmt::Debug for BitTrie<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, C: KeyCodec<K>> IntoIterator for &'a BitTrie<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
