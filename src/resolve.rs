//! Lazy key materialization.
//!
//! A node's key is defined by its position. The key cell is filled on first
//! request by rebuilding the key from the bit path, so tries that never look
//! at keys never pay for them.

use tracing::error;

use crate::codec::{BitPath, KeyCodec};
use crate::node::NodeId;
use crate::trie::BitTrie;
use crate::LOG_TARGET;

impl<K, V, C: KeyCodec<K>> BitTrie<K, V, C> {
    /// The key of a valued node. `None` for the root and value-less nodes.
    ///
    /// # Panics
    /// If the codec rebuilds a key that does not descend back to `id`.
    pub(crate) fn resolve_key(&self, id: NodeId) -> Option<&K> {
        let node = self.nodes.get(id);
        if id == NodeId::ROOT || !node.has_value() {
            return None;
        }
        Some(node.key.get_or_init(|| self.reconstruct_key(id)))
    }

    /// Branch choices from the root down to `id`.
    pub(crate) fn path_of(&self, id: NodeId) -> BitPath {
        let mut rev = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.nodes.get(cur).parent {
            rev.push(self.nodes.get(parent).left == Some(cur));
            cur = parent;
        }
        let mut path = BitPath::with_capacity(rev.len());
        for left in rev.into_iter().rev() {
            path.push(left);
        }
        path
    }

    /// Rebuild the key of `id` from its path. `None` if the rebuilt key
    /// descends to some other node.
    pub(crate) fn rebuild_key(&self, id: NodeId) -> Option<K> {
        let key = self.codec.recreate_key(&self.path_of(id));
        (self.locate(&key) == Some(id)).then_some(key)
    }

    fn reconstruct_key(&self, id: NodeId) -> K {
        if let Some(key) = self.rebuild_key(id) {
            return key;
        }
        let path = self.path_of(id);
        error!(target: LOG_TARGET, bits = path.len(), path = ?path, "Codec rebuilt a key that does not round-trip");
        panic!(
            "key codec does not round-trip: key rebuilt from a {}-bit path descends elsewhere",
            path.len()
        )
    }
}
