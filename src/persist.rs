//! serde support for [`BitTrie`].
//!
//! The persisted form is chosen per instance by [`TrieConfig::persist`]:
//!
//! * `Entries` writes resolved `(key, value)` pairs in ascending order and
//!   rebuilds through [`BitTrie::bulk_insert`].
//! * `Nodes` writes one record per node in pre-order and replays them into a
//!   fresh arena. Keys are neither written nor read, so codecs whose keys are
//!   expensive to materialize never pay for them.
//!
//! Deserializing needs a `Default` codec; the codec itself is not persisted.

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::codec::KeyCodec;
use crate::config::{PersistMode, TrieConfig};
use crate::error::TrieError;
use crate::node::NodeId;
use crate::trie::BitTrie;
use crate::LOG_TARGET;

#[derive(Serialize)]
#[serde(rename = "NodeRecord")]
struct NodeRecordRef<'a, V> {
    value: Option<&'a V>,
    left: bool,
    right: bool,
}

/// One node of the `Nodes` form.
#[derive(Deserialize)]
#[serde(rename = "NodeRecord")]
pub(crate) struct NodeRecord<V> {
    pub(crate) value: Option<V>,
    pub(crate) left: bool,
    pub(crate) right: bool,
}

#[derive(Deserialize)]
#[serde(rename = "Persisted")]
enum Persisted<K, V> {
    Entries(Vec<(K, V)>),
    Nodes(Vec<NodeRecord<V>>),
}

struct EntrySeq<'a, K, V, C>(&'a BitTrie<K, V, C>);

impl<'a, K: Serialize, V: Serialize, C: KeyCodec<K>> Serialize for EntrySeq<'a, K, V, C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for entry in self.0.iter() {
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }
}

struct NodeSeq<'a, K, V, C>(&'a BitTrie<K, V, C>);

impl<'a, K, V: Serialize, C> Serialize for NodeSeq<'a, K, V, C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let trie = self.0;
        let mut seq = serializer.serialize_seq(Some(trie.nodes.live()))?;
        let mut next = Some(NodeId::ROOT);
        while let Some(id) = next {
            let node = trie.nodes.get(id);
            seq.serialize_element(&NodeRecordRef {
                value: node.value.as_ref(),
                left: node.left.is_some(),
                right: node.right.is_some(),
            })?;
            next = trie.successor(id, None, true);
        }
        seq.end()
    }
}

impl<K: Serialize, V: Serialize, C: KeyCodec<K>> Serialize for BitTrie<K, V, C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.config.persist {
            PersistMode::Entries => serializer.serialize_newtype_variant("Persisted", 0, "Entries", &EntrySeq(self)),
            PersistMode::Nodes => serializer.serialize_newtype_variant("Persisted", 1, "Nodes", &NodeSeq(self)),
        }
    }
}

impl<'de, K, V, C> Deserialize<'de> for BitTrie<K, V, C>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
    C: KeyCodec<K> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let trie = match Persisted::deserialize(deserializer)? {
            Persisted::Entries(entries) => {
                let config = TrieConfig {
                    persist: PersistMode::Entries,
                    ..TrieConfig::default()
                };
                let mut trie = Self::with_config(C::default(), config);
                trie.bulk_insert(entries).map_err(D::Error::custom)?;
                trie
            }
            Persisted::Nodes(records) => Self::from_node_records(C::default(), records).map_err(D::Error::custom)?,
        };
        debug!(target: LOG_TARGET, mode = ?trie.config.persist, len = trie.len(), nodes = trie.node_count(), "Deserialized trie");
        Ok(trie)
    }
}

impl<K, V, C: KeyCodec<K>> BitTrie<K, V, C> {
    /// Rebuild a trie from pre-order node records, root first.
    pub(crate) fn from_node_records(codec: C, records: Vec<NodeRecord<V>>) -> Result<Self, TrieError> {
        let config = TrieConfig {
            retain_keys: false,
            persist: PersistMode::Nodes,
            node_capacity: records.len(),
        };
        let mut trie = Self::with_config(codec, config);
        let mut records = records.into_iter();

        let root = records.next().ok_or(TrieError::MalformedNodes("missing root record"))?;
        if root.value.is_some() {
            return Err(TrieError::MalformedNodes("root record holds a value"));
        }
        // Slots still waiting for a record, as (parent, is_left). Left is
        // pushed last so it is filled first.
        let mut pending = Vec::new();
        push_children(&mut pending, NodeId::ROOT, &root);
        let mut valued = Vec::new();

        for record in records {
            let (parent, left) = pending
                .pop()
                .ok_or(TrieError::MalformedNodes("more records than linked nodes"))?;
            if record.value.is_none() && !record.left && !record.right {
                return Err(TrieError::MalformedNodes("value-less leaf"));
            }
            let id = trie.nodes.alloc_child(parent, left);
            push_children(&mut pending, id, &record);
            if let Some(value) = record.value {
                trie.nodes.get_mut(id).value = Some(value);
                trie.len += 1;
                valued.push(id);
            }
        }
        if !pending.is_empty() {
            return Err(TrieError::MalformedNodes("truncated node records"));
        }
        // Every stored position must be one the codec can name.
        for id in valued {
            let key = trie
                .rebuild_key(id)
                .ok_or(TrieError::MalformedNodes("record path not representable by codec"))?;
            let _ = trie.nodes.get(id).key.set(key);
        }
        trie.mod_count += 1;
        Ok(trie)
    }
}

fn push_children<V>(pending: &mut Vec<(NodeId, bool)>, id: NodeId, record: &NodeRecord<V>) {
    if record.right {
        pending.push((id, false));
    }
    if record.left {
        pending.push((id, true));
    }
}
