//! The operator engine: owns the node arena, the unique table, and the
//! three memoization caches (AND, OR, ITE), and is the only thing in the
//! crate that can actually build or tear down nodes.
//!
//! There is deliberately no process-global cache: every
//! [`Set`](crate::set::Set) and [`Map`](crate::map::Map) is built against
//! an explicit `&mut Cache` that the caller owns.

use fxhash::FxHashMap;

use crate::nid::{NodeId, ONE, ZERO};
use crate::store::{Node, NodeStore};
use crate::unique::UniqueTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum BinOp {
    And,
    Or,
}

impl BinOp {
    #[inline]
    fn eval(self, a: u32, b: u32) -> u32 {
        match self {
            BinOp::And => (a != 0 && b != 0) as u32,
            BinOp::Or => (a != 0 || b != 0) as u32,
        }
    }
}

type BinKey = (BinOp, NodeId, NodeId);
type IteKey = (NodeId, NodeId, NodeId);

/// Owns every node ever created and the tables needed to hash-cons and
/// memoize operations over them.
pub struct Cache {
    store: NodeStore,
    unique: UniqueTable,
    // Every key operand and every result held live in these two tables is
    // refcounted as if the table itself were a caller: see apply_binary
    // and ite. That's what lets an entry outlive every external reference
    // to its operands without the freed index being handed to a later,
    // unrelated node and silently matching a stale entry.
    and_or_cache: FxHashMap<BinKey, NodeId>,
    ite_cache: FxHashMap<IteKey, NodeId>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            store: NodeStore::new(),
            unique: UniqueTable::new(),
            and_or_cache: FxHashMap::default(),
            ite_cache: FxHashMap::default(),
        }
    }

    /// Construct (or retrieve) the nonterminal for `(variable, low, high)`,
    /// hash-consed so there is exactly one live node per triple, and
    /// reduced so no node ever has `low == high`.
    pub fn unique(&mut self, variable: u32, low: NodeId, high: NodeId) -> NodeId {
        if low == high {
            return low;
        }
        let key = (variable, low, high);
        if let Some(id) = self.unique.lookup(key) {
            return id;
        }
        let index = self.store.alloc(Node { variable, low, high });
        let id = NodeId::nonterminal(index);
        self.incref(low);
        self.incref(high);
        self.unique.insert(key, id);
        trace!("unique({variable}, {low:?}, {high:?}) = {id:?}");
        id
    }

    /// Bump `id`'s refcount. No-op for terminals, which are never freed.
    pub fn incref(&mut self, id: NodeId) {
        if id.is_nonterminal() {
            self.store.incref(id.index());
        }
    }

    /// Drop `id`'s refcount, reclaiming it (and cascading into its
    /// children) once it reaches zero. No-op for terminals.
    pub fn decref(&mut self, id: NodeId) {
        if id.is_nonterminal() {
            self.decref_index(id.index());
        }
    }

    fn decref_index(&mut self, index: usize) {
        let remaining = self.store.decref(index);
        if remaining == 0 {
            let node = *self.store.get(index);
            self.unique.remove((node.variable, node.low, node.high));
            self.store.free(index);
            self.decref(node.low);
            self.decref(node.high);
        }
    }

    fn variable_of(&self, id: NodeId) -> Option<u32> {
        id.is_nonterminal().then(|| self.store.get(id.index()).variable)
    }

    /// Split `id` on `variable`: if `id` is a nonterminal branching on
    /// exactly that variable, return its (low, high) children; otherwise
    /// `id` doesn't depend on `variable`, so both branches are `id` itself.
    fn split(&self, id: NodeId, variable: u32) -> (NodeId, NodeId) {
        match self.variable_of(id) {
            Some(v) if v == variable => {
                let node = self.store.get(id.index());
                (node.low, node.high)
            }
            _ => (id, id),
        }
    }

    fn apply_binary(&mut self, op: BinOp, f: NodeId, g: NodeId) -> NodeId {
        if f.is_terminal() && g.is_terminal() {
            return NodeId::terminal(op.eval(f.terminal_value(), g.terminal_value()));
        }
        let key: BinKey = if f <= g { (op, f, g) } else { (op, g, f) };
        if let Some(result) = self.and_or_cache.get(&key) {
            return *result;
        }

        let variable = match (self.variable_of(f), self.variable_of(g)) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => unreachable!("both-terminal case handled above"),
        };
        let (lf, hf) = self.split(f, variable);
        let (lg, hg) = self.split(g, variable);
        let low = self.apply_binary(op, lf, lg);
        let high = self.apply_binary(op, hf, hg);
        let result = self.unique(variable, low, high);

        self.incref(f);
        self.incref(g);
        self.incref(result);
        self.and_or_cache.insert(key, result);
        result
    }

    /// Boolean AND of `f` and `g`.
    pub fn and(&mut self, f: NodeId, g: NodeId) -> NodeId {
        self.apply_binary(BinOp::And, f, g)
    }

    /// Boolean OR of `f` and `g`.
    pub fn or(&mut self, f: NodeId, g: NodeId) -> NodeId {
        self.apply_binary(BinOp::Or, f, g)
    }

    /// Boolean NOT of `f`, expressed as `ite(f, 0, 1)` since there is no
    /// dedicated complement representation (no complement edges).
    pub fn not(&mut self, f: NodeId) -> NodeId {
        self.ite(f, ZERO, ONE)
    }

    /// `f AND NOT g`, used by `Set`/`Map` removal (add the complement,
    /// intersect with the existing root).
    pub fn and_not(&mut self, f: NodeId, g: NodeId) -> NodeId {
        let not_g = self.not(g);
        self.and(f, not_g)
    }

    /// If-then-else: `f ? g : h`, the universal ternary operator every
    /// other boolean combinator in this crate is expressed through.
    pub fn ite(&mut self, f: NodeId, g: NodeId, h: NodeId) -> NodeId {
        if f.is_terminal() {
            return if f.terminal_value() == 0 { h } else { g };
        }
        if g == h {
            return g;
        }
        if g == ONE && h == ZERO {
            return f;
        }

        let key: IteKey = (f, g, h);
        if let Some(result) = self.ite_cache.get(&key) {
            return *result;
        }

        let mut variable = self.variable_of(f).expect("f is nonterminal here");
        if let Some(v) = self.variable_of(g) {
            variable = variable.min(v);
        }
        if let Some(v) = self.variable_of(h) {
            variable = variable.min(v);
        }

        let (lf, hf) = self.split(f, variable);
        let (lg, hg) = self.split(g, variable);
        let (lh, hh) = self.split(h, variable);
        let low = self.ite(lf, lg, lh);
        let high = self.ite(hf, hg, hh);
        let result = self.unique(variable, low, high);

        self.incref(f);
        self.incref(g);
        self.incref(h);
        self.incref(result);
        self.ite_cache.insert(key, result);
        result
    }

    /// Evaluate `root` against a fully-specified assignment: walk from the
    /// root, at each nonterminal following `high` if the assignment's bit
    /// for that node's variable is set, `low` otherwise, until a terminal
    /// is reached.
    pub fn evaluate<F>(&self, root: NodeId, mut bit: F) -> u32
    where
        F: FnMut(u32) -> bool,
    {
        let mut current = root;
        while current.is_nonterminal() {
            let node = self.store.get(current.index());
            current = if bit(node.variable) { node.high } else { node.low };
        }
        current.terminal_value()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.store.get(id.index())
    }

    /// Number of distinct nonterminal nodes reachable from `root`,
    /// counting shared subgraphs once.
    pub fn node_count(&self, root: NodeId) -> usize {
        if root.is_terminal() {
            return 0;
        }
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !id.is_nonterminal() || !seen.insert(id) {
                continue;
            }
            let node = self.store.get(id.index());
            stack.push(node.low);
            stack.push(node.high);
        }
        seen.len()
    }

    /// Approximate memory footprint, in bytes, of the subgraph rooted at
    /// `root`: the reachable node count times the size of one node record.
    pub fn memory_size(&self, root: NodeId) -> usize {
        self.node_count(root) * std::mem::size_of::<Node>()
    }

    /// Total number of live nonterminal nodes across the whole arena,
    /// regardless of which roots currently reference them.
    pub fn live_node_count(&self) -> usize {
        self.store.live_count()
    }
}

/// Structural equality between nodes that may belong to two distinct
/// caches. Ordinary `==` on two `NodeId`s is only meaningful within a
/// single cache, where it reduces to id equality; comparing across
/// caches requires walking both graphs in lockstep, since the same
/// function can land at different arena indices in each cache.
pub fn nodes_equal(cache_a: &Cache, a: NodeId, cache_b: &Cache, b: NodeId) -> bool {
    match (a.is_terminal(), b.is_terminal()) {
        (true, true) => a.terminal_value() == b.terminal_value(),
        (false, false) => {
            let na = cache_a.node(a);
            let nb = cache_b.node(b);
            na.variable == nb.variable
                && nodes_equal(cache_a, na.low, cache_b, nb.low)
                && nodes_equal(cache_a, na.high, cache_b, nb.high)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_of_constants() {
        let mut cache = Cache::new();
        assert_eq!(cache.and(ZERO, ONE), ZERO);
        assert_eq!(cache.and(ONE, ONE), ONE);
        assert_eq!(cache.or(ZERO, ONE), ONE);
        assert_eq!(cache.or(ZERO, ZERO), ZERO);
    }

    #[test]
    fn single_variable_diagram_evaluates_correctly() {
        let mut cache = Cache::new();
        // f = variable 3 (low=0, high=1), i.e. "bit 3 is set"
        let f = cache.unique(3, ZERO, ONE);
        assert_eq!(cache.evaluate(f, |v| v == 3), 1);
        assert_eq!(cache.evaluate(f, |_| false), 0);
    }

    #[test]
    fn unique_collapses_equal_children() {
        let mut cache = Cache::new();
        assert_eq!(cache.unique(0, ONE, ONE), ONE);
        assert_eq!(cache.live_node_count(), 0);
    }

    #[test]
    fn unique_hash_conses_identical_triples() {
        let mut cache = Cache::new();
        let a = cache.unique(1, ZERO, ONE);
        let b = cache.unique(1, ZERO, ONE);
        assert_eq!(a, b);
        assert_eq!(cache.live_node_count(), 1);
    }

    #[test]
    fn and_matches_truth_table_over_two_variables() {
        let mut cache = Cache::new();
        let x = cache.unique(0, ZERO, ONE);
        let y = cache.unique(1, ZERO, ONE);
        let f = cache.and(x, y);
        for (xv, yv) in [(false, false), (false, true), (true, false), (true, true)] {
            let expect = (xv && yv) as u32;
            let got = cache.evaluate(f, |v| if v == 0 { xv } else { yv });
            assert_eq!(got, expect, "AND({xv}, {yv})");
        }
    }

    #[test]
    fn ite_trivial_cases() {
        let mut cache = Cache::new();
        let x = cache.unique(0, ZERO, ONE);
        assert_eq!(cache.ite(ONE, x, ZERO), x);
        assert_eq!(cache.ite(ZERO, ZERO, x), x);
        assert_eq!(cache.ite(x, ONE, ZERO), x);
        assert_eq!(cache.ite(x, x, x), x);
    }

    #[test]
    fn not_inverts_a_single_variable() {
        let mut cache = Cache::new();
        let x = cache.unique(0, ZERO, ONE);
        let not_x = cache.not(x);
        assert_eq!(cache.evaluate(not_x, |_| true), 0);
        assert_eq!(cache.evaluate(not_x, |_| false), 1);
    }

    #[test]
    fn decref_reclaims_unreferenced_nodes() {
        let mut cache = Cache::new();
        let x = cache.unique(0, ZERO, ONE);
        cache.incref(x);
        assert_eq!(cache.live_node_count(), 1);
        cache.decref(x);
        assert_eq!(cache.live_node_count(), 0);
    }

    #[test]
    fn nodes_equal_compares_structurally_across_distinct_caches() {
        let mut cache_a = Cache::new();
        let mut cache_b = Cache::new();
        // Build the same function in each cache via a different path, so
        // the two resulting ids are not numerically comparable but are
        // structurally identical.
        let a_low = cache_a.unique(1, ZERO, ONE);
        let a = cache_a.unique(0, a_low, ZERO);
        let b_hi = cache_b.unique(2, ZERO, ONE); // pad cache_b's arena so indices diverge
        let _ = b_hi;
        let b_low = cache_b.unique(1, ZERO, ONE);
        let b = cache_b.unique(0, b_low, ZERO);

        assert!(nodes_equal(&cache_a, a, &cache_b, b));

        let c = cache_b.unique(0, ZERO, b_low);
        assert!(!nodes_equal(&cache_a, a, &cache_b, c));
    }

    #[test]
    fn node_count_deduplicates_shared_subgraphs() {
        let mut cache = Cache::new();
        let shared = cache.unique(2, ZERO, ONE);
        let top = cache.unique(0, shared, shared);
        // low == high collapses, so `top` should just be `shared` itself.
        assert_eq!(top, shared);
        assert_eq!(cache.node_count(top), 1);
    }
}
