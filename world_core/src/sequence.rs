//! Version identifiers - world uids and lineage ids.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Version stamp of a world. Uids from one [`UidSequence`] are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(pub u64);

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of world uids, owned by the application and threaded into every
/// world it creates. Clones share the same counter.
#[derive(Debug, Clone)]
pub struct UidSequence {
    next: Arc<AtomicU64>,
}

impl UidSequence {
    /// A sequence whose first uid is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A sequence whose first uid is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Allocate the next uid.
    pub fn next_uid(&self) -> Uid {
        Uid(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// The uid the next allocation will return.
    pub fn peek(&self) -> Uid {
        Uid(self.next.load(Ordering::SeqCst))
    }
}

impl Default for UidSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one chain of worlds descending from a single genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageId(pub Uuid);

impl LineageId {
    /// Create a new random lineage ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LineageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uids_increase() {
        let seq = UidSequence::new();
        let a = seq.next_uid();
        let b = seq.next_uid();
        assert_eq!(a, Uid(1));
        assert!(b > a);
        assert_eq!(seq.peek(), Uid(3));
    }

    #[test]
    fn test_clones_share_counter() {
        let seq = UidSequence::starting_at(10);
        let other = seq.clone();
        assert_eq!(seq.next_uid(), Uid(10));
        assert_eq!(other.next_uid(), Uid(11));
    }

    #[test]
    fn test_lineage_ids_unique() {
        assert_ne!(LineageId::new(), LineageId::new());
    }
}
