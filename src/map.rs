//! Compact maps from IPv4/IPv6 addresses to small integer values, backed
//! by the same BDD machinery as [`crate::set::Set`] but with arbitrary
//! terminal values instead of just 0/1.
//!
//! Mirrors the original library's minimal `ipmap_*` surface: there is no
//! map-algebra combinator (union-with-merge-function) here, only
//! "overwrite the value at this address/network" and "look one up".

use std::net::IpAddr;

use crate::cache::Cache;
use crate::error::IpSetError;
use crate::ip::{self, ipv4_bits, ipv6_bits, CidrPolicy, ADDRESS_VAR_BASE, FAMILY_VAR};
use crate::nid::NodeId;

/// A map from IPv4/IPv6 addresses to `u32` values, with a default value
/// returned for any address that was never explicitly set.
pub struct Map {
    root: NodeId,
    default_value: u32,
}

impl Map {
    /// A map where every address currently evaluates to `default_value`.
    pub fn new(default_value: u32) -> Self {
        Map { root: NodeId::terminal(default_value), default_value }
    }

    pub fn default_value(&self) -> u32 {
        self.default_value
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn replace_root(&mut self, cache: &mut Cache, new_root: NodeId) {
        cache.incref(new_root);
        cache.decref(self.root);
        self.root = new_root;
    }

    pub fn set_address(&mut self, cache: &mut Cache, addr: IpAddr, value: u32) {
        let path = match addr {
            IpAddr::V4(a) => ip::encode_ipv4(cache, a),
            IpAddr::V6(a) => ip::encode_ipv6(cache, a),
        };
        let new_root = cache.ite(path, NodeId::terminal(value), self.root);
        self.replace_root(cache, new_root);
        cache.decref(path);
    }

    pub fn set_network(
        &mut self,
        cache: &mut Cache,
        addr: IpAddr,
        prefix_len: u32,
        value: u32,
        policy: CidrPolicy,
    ) -> Result<(), IpSetError> {
        let path = match addr {
            IpAddr::V4(a) => ip::encode_ipv4_network(cache, a, prefix_len, policy)?,
            IpAddr::V6(a) => ip::encode_ipv6_network(cache, a, prefix_len, policy)?,
        };
        let new_root = cache.ite(path, NodeId::terminal(value), self.root);
        self.replace_root(cache, new_root);
        cache.decref(path);
        Ok(())
    }

    pub fn get(&self, cache: &Cache, addr: IpAddr) -> u32 {
        match addr {
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
        }
    }

    pub fn node_count(&self, cache: &Cache) -> usize {
        cache.node_count(self.root)
    }

    pub fn memory_size(&self, cache: &Cache) -> usize {
        cache.memory_size(self.root)
    }

    pub fn release(mut self, cache: &mut Cache) {
        cache.decref(self.root);
        self.root = NodeId::terminal(self.default_value);
    }
}
