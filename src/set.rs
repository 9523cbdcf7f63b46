//! Compact, exact sets of IPv4/IPv6 addresses backed by a single BDD root.

use std::net::IpAddr;

use crate::cache::Cache;
use crate::error::IpSetError;
use crate::ip::{self, ipv4_bits, ipv6_bits, CidrPolicy, ADDRESS_VAR_BASE, FAMILY_VAR};
use crate::iter::{self, CidrBlock};
use crate::nid::{NodeId, ZERO};

/// A set of IPv4 and/or IPv6 addresses and networks.
///
/// `Set` itself is just a [`NodeId`] plus the bookkeeping to keep its own
/// refcount current; every operation takes the [`Cache`] it was built
/// against explicitly.
pub struct Set {
    root: NodeId,
}

impl Set {
    /// An empty set.
    pub fn new() -> Self {
        Set { root: ZERO }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Wrap an already-built root, taking ownership of one reference to it.
    /// Used to adopt a root produced by [`crate::format::read`] or by a
    /// [`Cache`] operator invoked directly.
    pub fn from_root(root: NodeId) -> Self {
        Set { root }
    }

    fn replace_root(&mut self, cache: &mut Cache, new_root: NodeId) {
        cache.incref(new_root);
        cache.decref(self.root);
        self.root = new_root;
    }

    pub fn is_empty(&self) -> bool {
        self.root == ZERO
    }

    /// Two sets are equal exactly when their roots are the same node,
    /// since hash-consing guarantees one node per distinct function.
    pub fn is_equal(&self, other: &Set) -> bool {
        self.root == other.root
    }

    /// Add `addr`. Returns `true` if it was already present (the set is
    /// unchanged).
    pub fn add_address(&mut self, cache: &mut Cache, addr: IpAddr) -> bool {
        let path = match addr {
            IpAddr::V4(a) => ip::encode_ipv4(cache, a),
            IpAddr::V6(a) => ip::encode_ipv6(cache, a),
        };
        let new_root = cache.or(self.root, path);
        let already_present = new_root == self.root;
        self.replace_root(cache, new_root);
        cache.decref(path);
        already_present
    }

    /// Add every address in `addr/prefix_len`. Returns `true` if the
    /// network was already fully covered by the set (the set is
    /// unchanged).
    pub fn add_network(
        &mut self,
        cache: &mut Cache,
        addr: IpAddr,
        prefix_len: u32,
        policy: CidrPolicy,
    ) -> Result<bool, IpSetError> {
        let path = match addr {
            IpAddr::V4(a) => ip::encode_ipv4_network(cache, a, prefix_len, policy)?,
            IpAddr::V6(a) => ip::encode_ipv6_network(cache, a, prefix_len, policy)?,
        };
        let new_root = cache.or(self.root, path);
        let already_present = new_root == self.root;
        self.replace_root(cache, new_root);
        cache.decref(path);
        Ok(already_present)
    }

    /// Remove `addr`. Returns `true` if it was already absent (the set is
    /// unchanged).
    pub fn remove_address(&mut self, cache: &mut Cache, addr: IpAddr) -> bool {
        let path = match addr {
            IpAddr::V4(a) => ip::encode_ipv4(cache, a),
            IpAddr::V6(a) => ip::encode_ipv6(cache, a),
        };
        let new_root = cache.and_not(self.root, path);
        let already_absent = new_root == self.root;
        self.replace_root(cache, new_root);
        cache.decref(path);
        already_absent
    }

    /// Remove every address in `addr/prefix_len`. Returns `true` if none
    /// of it was present (the set is unchanged).
    pub fn remove_network(
        &mut self,
        cache: &mut Cache,
        addr: IpAddr,
        prefix_len: u32,
        policy: CidrPolicy,
    ) -> Result<bool, IpSetError> {
        let path = match addr {
            IpAddr::V4(a) => ip::encode_ipv4_network(cache, a, prefix_len, policy)?,
            IpAddr::V6(a) => ip::encode_ipv6_network(cache, a, prefix_len, policy)?,
        };
        let new_root = cache.and_not(self.root, path);
        let already_absent = new_root == self.root;
        self.replace_root(cache, new_root);
        cache.decref(path);
        Ok(already_absent)
    }

    /// The set of addresses in either `self` or `other`.
    pub fn union(&self, other: &Set, cache: &mut Cache) -> Set {
        let new_root = cache.or(self.root, other.root);
        let mut result = Set::new();
        result.replace_root(cache, new_root);
        result
    }

    /// The set of addresses in both `self` and `other`.
    pub fn intersection(&self, other: &Set, cache: &mut Cache) -> Set {
        let new_root = cache.and(self.root, other.root);
        let mut result = Set::new();
        result.replace_root(cache, new_root);
        result
    }

    /// The set of addresses in `self` but not in `other`.
    pub fn difference(&self, other: &Set, cache: &mut Cache) -> Set {
        let new_root = cache.and_not(self.root, other.root);
        let mut result = Set::new();
        result.replace_root(cache, new_root);
        result
    }

    /// Whether every address in `self` is also in `other`.
    pub fn is_subset_of(&self, other: &Set, cache: &mut Cache) -> bool {
        cache.and_not(self.root, other.root) == ZERO
    }

    pub fn contains(&self, cache: &Cache, addr: IpAddr) -> bool {
        let value = match addr {
            IpAddr::V4(a) => {
                let bits = ipv4_bits(a);
                cache.evaluate(self.root, |v| {
                    if v == FAMILY_VAR {
                        true
                    } else {
                        bits.get((v - ADDRESS_VAR_BASE) as usize).copied().unwrap_or(false)
                    }
                })
            }
            IpAddr::V6(a) => {
                let bits = ipv6_bits(a);
                cache.evaluate(self.root, |v| {
                    if v == FAMILY_VAR {
                        false
                    } else {
                        bits.get((v - ADDRESS_VAR_BASE) as usize).copied().unwrap_or(false)
                    }
                })
            }
        };
        value != 0
    }

    /// Number of distinct nonterminal nodes making up this set's diagram.
    pub fn node_count(&self, cache: &Cache) -> usize {
        cache.node_count(self.root)
    }

    /// Approximate memory footprint, in bytes, of this set's diagram.
    pub fn memory_size(&self, cache: &Cache) -> usize {
        cache.memory_size(self.root)
    }

    /// Summarize the set's contents as the minimal list of CIDR blocks
    /// that exactly cover it (network mode).
    pub fn networks(&self, cache: &Cache) -> Vec<CidrBlock> {
        iter::iterate_networks(cache, self.root)
    }

    /// Enumerate every individual address the set contains (address
    /// mode). Lazy: safe to call even on sets with very large networks as
    /// long as the caller doesn't insist on collecting it all.
    pub fn addresses(&self, cache: &Cache) -> impl Iterator<Item = IpAddr> {
        iter::iterate_addresses(cache, self.root)
    }

    /// Release this set's reference to its root. Call when discarding a
    /// `Set` that was built against a `Cache` you intend to keep using.
    pub fn release(mut self, cache: &mut Cache) {
        cache.decref(self.root);
        self.root = ZERO;
    }
}

impl Default for Set {
    fn default() -> Self {
        Self::new()
    }
}
