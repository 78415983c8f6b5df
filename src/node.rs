use std::num::NonZeroU32;
use std::sync::OnceLock;

use tracing::trace;

use crate::LOG_TARGET;

/// Upper bound on live arena slots (one `u32` index space minus the niche).
pub(crate) const MAX_NODES: usize = (u32::MAX - 1) as usize;

/// Index of a node in the arena. Stored as `index + 1` so `Option<NodeId>`
/// stays four bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(NonZeroU32::MIN);

    #[inline]
    fn from_index(index: usize) -> Self {
        debug_assert!(index < MAX_NODES);
        // `index + 1` is never zero for an in-range index.
        Self(NonZeroU32::MIN.saturating_add(index as u32))
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// A trie node. The bit path from the root is the node's key; `key` only
/// caches the materialized form.
pub(crate) struct Node<K, V> {
    pub(crate) value: Option<V>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) key: OnceLock<K>,
}

impl<K, V> Node<K, V> {
    fn empty(parent: Option<NodeId>) -> Self {
        Self {
            value: None,
            left: None,
            right: None,
            parent,
            key: OnceLock::new(),
        }
    }

    #[inline]
    pub(crate) fn child(&self, left: bool) -> Option<NodeId> {
        if left {
            self.left
        } else {
            self.right
        }
    }

    #[inline]
    pub(crate) fn has_value(&self) -> bool {
        self.value.is_some()
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Node arena. Slot 0 is always the root; pruned slots go to a free list and
/// come back as fresh, empty nodes.
pub(crate) struct NodeArena<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
}

impl<K, V> NodeArena<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node::empty(None));
        Self {
            nodes,
            free: Vec::new(),
        }
    }

    /// Number of live nodes, root included.
    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.index()]
    }

    /// Allocate an empty child of `parent` on the given side and link it.
    ///
    /// # Panics
    /// If the arena already holds [`MAX_NODES`] slots.
    pub(crate) fn alloc_child(&mut self, parent: NodeId, left: bool) -> NodeId {
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Node::empty(Some(parent));
                id
            }
            None => {
                assert!(self.nodes.len() < MAX_NODES, "node arena exhausted");
                self.nodes.push(Node::empty(Some(parent)));
                NodeId::from_index(self.nodes.len() - 1)
            }
        };
        let p = self.get_mut(parent);
        if left {
            p.left = Some(id);
        } else {
            p.right = Some(id);
        }
        trace!(target: LOG_TARGET, slot = id.index(), parent = parent.index(), left, "Allocated trie node");
        id
    }

    /// Unlink a childless node from its parent and recycle its slot.
    pub(crate) fn release(&mut self, id: NodeId) {
        debug_assert_ne!(id, NodeId::ROOT);
        debug_assert!(self.get(id).is_leaf());
        let node = std::mem::replace(&mut self.nodes[id.index()], Node::empty(None));
        if let Some(parent) = node.parent {
            let p = self.get_mut(parent);
            if p.left == Some(id) {
                p.left = None;
            } else if p.right == Some(id) {
                p.right = None;
            }
        }
        trace!(target: LOG_TARGET, slot = id.index(), "Released trie node");
        self.free.push(id);
    }

    /// Drop every node but a fresh root.
    pub(crate) fn reset(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0] = Node::empty(None);
        self.free.clear();
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
        self.free.shrink_to_fit();
    }

    pub(crate) fn memory_usage(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node<K, V>>()
            + self.free.capacity() * std::mem::size_of::<NodeId>()
    }

    /// Copy the structure and values. Key cells start empty in the copy.
    pub(crate) fn clone_values(&self) -> Self
    where
        V: Clone,
    {
        Self {
            nodes: self
                .nodes
                .iter()
                .map(|n| Node {
                    value: n.value.clone(),
                    left: n.left,
                    right: n.right,
                    parent: n.parent,
                    key: OnceLock::new(),
                })
                .collect(),
            free: self.free.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_niche() {
        assert_eq!(std::mem::size_of::<Option<NodeId>>(), 4);
        assert_eq!(NodeId::ROOT.index(), 0);
        assert_eq!(NodeId::from_index(41).index(), 41);
    }

    #[test]
    fn test_alloc_and_release_recycles() {
        let mut arena: NodeArena<u32, u32> = NodeArena::with_capacity(0);
        let a = arena.alloc_child(NodeId::ROOT, true);
        let b = arena.alloc_child(a, false);
        assert_eq!(arena.get(NodeId::ROOT).left, Some(a));
        assert_eq!(arena.get(a).right, Some(b));
        assert_eq!(arena.get(b).parent, Some(a));
        assert_eq!(arena.live(), 3);

        arena.release(b);
        assert_eq!(arena.get(a).right, None);
        assert_eq!(arena.live(), 2);

        let c = arena.alloc_child(a, true);
        assert_eq!(c, b, "freed slot is reused");
        assert_eq!(arena.get(c).parent, Some(a));
        assert!(arena.get(c).value.is_none());
        assert_eq!(arena.get(a).left, Some(c));
    }

    #[test]
    fn test_reset() {
        let mut arena: NodeArena<u32, u32> = NodeArena::with_capacity(8);
        let a = arena.alloc_child(NodeId::ROOT, false);
        arena.get_mut(a).value = Some(1);
        arena.reset();
        assert_eq!(arena.live(), 1);
        assert!(arena.get(NodeId::ROOT).is_leaf());
    }
}
