//! The hash-consing table: canonical `(variable, low, high) -> NodeId`
//! lookup that gives the cache its "reduced" and "ordered" properties.
//!
//! This module only holds the index. The rule that collapses `low == high`
//! instead of consulting the table (invariant U2) lives in
//! [`crate::cache::Cache::unique`], since that's the only place with
//! enough context (the node store, for incref/decref bookkeeping) to apply
//! it correctly.

use fxhash::FxHashMap;

use crate::nid::NodeId;

pub(crate) type UniqueKey = (u32, NodeId, NodeId);

/// Maps a `(variable, low, high)` triple to the one live nonterminal node
/// that represents it (invariant U1: at most one such node may exist at a
/// time).
#[derive(Default)]
pub(crate) struct UniqueTable {
    table: FxHashMap<UniqueKey, NodeId>,
}

impl UniqueTable {
    pub fn new() -> Self {
        UniqueTable { table: FxHashMap::default() }
    }

    pub fn lookup(&self, key: UniqueKey) -> Option<NodeId> {
        self.table.get(&key).copied()
    }

    pub fn insert(&mut self, key: UniqueKey, id: NodeId) {
        let prior = self.table.insert(key, id);
        debug_assert!(prior.is_none(), "unique table key {key:?} inserted twice");
    }

    /// Drop the entry for `key`, e.g. once its node's refcount reaches zero
    /// and the node is reclaimed. Returns whether an entry was removed.
    pub fn remove(&mut self, key: UniqueKey) -> bool {
        self.table.remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nid::{ONE, ZERO};

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut table = UniqueTable::new();
        let key = (3, ZERO, ONE);
        assert_eq!(table.lookup(key), None);
        table.insert(key, NodeId::nonterminal(7));
        assert_eq!(table.lookup(key), Some(NodeId::nonterminal(7)));
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut table = UniqueTable::new();
        let key = (0, ZERO, ONE);
        table.insert(key, NodeId::nonterminal(0));
        assert!(table.remove(key));
        assert_eq!(table.lookup(key), None);
        assert!(!table.remove(key));
    }
}
