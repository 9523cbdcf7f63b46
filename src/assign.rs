//! Partial assignments over a BDD's variables, and evaluation against them.
//!
//! An [`Assignment`] gives each variable one of three states: `False`,
//! `True`, or `Either` (don't-care). This is the vocabulary the iterator
//! and CIDR summarizer (`iter.rs`) walk BDD paths in: a path from the root
//! to a terminal fixes some variables and leaves the rest as `Either`.

use crate::cache::Cache;
use crate::nid::NodeId;

/// The value a single variable takes along a BDD path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tribool {
    False,
    True,
    Either,
}

impl Tribool {
    #[inline]
    pub fn is_either(self) -> bool {
        matches!(self, Tribool::Either)
    }
}

/// A full assignment of every variable in `0..len`, used to evaluate a
/// BDD deterministically (variables left `Either` are treated as `False`
/// by [`Cache::evaluate`]; the iterator in `iter.rs` is what actually
/// enumerates the `Either` branches).
#[derive(Clone, Debug)]
pub struct Assignment {
    values: Vec<Tribool>,
}

impl Assignment {
    pub fn new(len: usize) -> Self {
        Assignment { values: vec![Tribool::Either; len] }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, variable: u32) -> Tribool {
        self.values[variable as usize]
    }

    pub fn set(&mut self, variable: u32, value: Tribool) {
        self.values[variable as usize] = value;
    }

    /// Evaluate `root` treating any `Either` variable as `False`, matching
    /// `ipset_assignment_get` semantics for a non-yet-set bit.
    pub fn evaluate(&self, cache: &Cache, root: NodeId) -> u32 {
        cache.evaluate(root, |v| self.get(v) == Tribool::True)
    }
}
