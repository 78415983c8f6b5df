#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::node::MAX_NODES;
use crate::LOG_TARGET;

/// Persisted form written by the `Serialize` impl of [`BitTrie`](crate::BitTrie).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PersistMode {
    /// Resolved `(key, value)` pairs in ascending order.
    #[default]
    Entries,
    /// The raw node tree in pre-order. Keys are never materialized.
    Nodes,
}

/// Per-instance trie settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrieConfig {
    /// Keep the key passed to `insert` in the node's key cell. When `false`
    /// keys are only reconstructed from the bit path when something asks.
    pub retain_keys: bool,
    pub persist: PersistMode,
    /// Number of nodes to pre-allocate in the arena.
    pub node_capacity: usize,
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self {
            retain_keys: true,
            persist: PersistMode::Entries,
            node_capacity: 0,
        }
    }
}

impl TrieConfig {
    /// Clamp settings that the arena cannot honour.
    pub fn sanitize(self) -> Self {
        let mut conf = self;
        if conf.node_capacity > MAX_NODES {
            warn!(target: LOG_TARGET, provided = conf.node_capacity, updated = MAX_NODES, "Sanitizing oversized node capacity");
            conf.node_capacity = MAX_NODES;
        }
        conf
    }
}
