use thiserror::Error;

/// Errors signalled by [`BitTrie`](crate::BitTrie) and its views.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieError {
    #[error("key must encode to at least one bit")]
    EmptyKey,
    #[error("range start sorts after range end")]
    InvertedRange,
    #[error("key lies outside the view's range")]
    KeyOutOfRange,
    #[error("trie was structurally modified during iteration")]
    ConcurrentModification,
    #[error("cursor has no current entry")]
    NoCurrentEntry,
    #[error("malformed node records: {0}")]
    MalformedNodes(&'static str),
}
