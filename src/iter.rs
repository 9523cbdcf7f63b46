//! Enumerating the networks covered by a [`crate::set::Set`] as a minimal
//! list of CIDR blocks.
//!
//! The family variable (0) is handled before the address bits: if a node
//! still branches on it, the two branches are walked under their
//! respective family (this is the "normal" case, each path has already
//! settled on IPv4 or IPv6). If a node's *first* variable is already past
//! the family slot, the family was never decided along this path (it
//! collapsed during reduction because both family branches led to the
//! same subgraph) and the same subgraph is walked twice, once per family,
//! matching `libipset`'s `IPSET_ITERATOR_MULTIPLE_IPV4` / `_MULTIPLE_IPV6`
//! states.
//!
//! Within a family, a path is summarized as a single CIDR as soon as it
//! reaches the `true` terminal, however many address-bit variables that
//! took; variables skipped along the way (because the reduced diagram
//! doesn't depend on them at that point) are exactly the network's host
//! bits. A path whose variables aren't contiguous from there to the end
//! can't be expressed as one CIDR; the same walk naturally produces
//! multiple smaller blocks for it instead, since each skipped bit is
//! explored as two independent sub-paths.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::cache::Cache;
use crate::ip::{Family, ADDRESS_VAR_BASE, FAMILY_VAR};
use crate::nid::NodeId;

/// One summarized network: a family, a network address with host bits
/// zeroed, and a prefix length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CidrBlock {
    V4(Ipv4Addr, u8),
    V6(Ipv6Addr, u8),
}

impl std::fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CidrBlock::V4(addr, prefix) => write!(f, "{addr}/{prefix}"),
            CidrBlock::V6(addr, prefix) => write!(f, "{addr}/{prefix}"),
        }
    }
}

fn bits_to_ipv4(bits: &[bool]) -> Ipv4Addr {
    let mut octets = [0u8; 4];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            octets[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    Ipv4Addr::from(octets)
}

fn bits_to_ipv6(bits: &[bool]) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            octets[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    Ipv6Addr::from(octets)
}

fn emit(family: Family, bits: &[bool], out: &mut Vec<CidrBlock>) {
    let prefix_len = bits.len() as u8;
    match family {
        Family::V4 => out.push(CidrBlock::V4(bits_to_ipv4(bits), prefix_len)),
        Family::V6 => out.push(CidrBlock::V6(bits_to_ipv6(bits), prefix_len)),
    }
}

fn walk_address(
    cache: &Cache,
    node: NodeId,
    variable_at: u32,
    last_variable: u32,
    family: Family,
    bits: &mut Vec<bool>,
    out: &mut Vec<CidrBlock>,
) {
    if node.is_terminal() {
        if node.terminal_value() != 0 {
            emit(family, bits, out);
        }
        return;
    }
    if variable_at > last_variable {
        // No address variable beyond `last_variable` should ever be
        // reachable within a single family's width.
        return;
    }
    let n = cache.node(node);
    if n.variable == variable_at {
        bits.push(false);
        walk_address(cache, n.low, variable_at + 1, last_variable, family, bits, out);
        bits.pop();
        bits.push(true);
        walk_address(cache, n.high, variable_at + 1, last_variable, family, bits, out);
        bits.pop();
    } else {
        // This level doesn't affect the outcome here: explore both
        // values of it while staying on the same node.
        bits.push(false);
        walk_address(cache, node, variable_at + 1, last_variable, family, bits, out);
        bits.pop();
        bits.push(true);
        walk_address(cache, node, variable_at + 1, last_variable, family, bits, out);
        bits.pop();
    }
}

fn walk_address_from_root(cache: &Cache, node: NodeId, family: Family, out: &mut Vec<CidrBlock>) {
    let last_variable = ADDRESS_VAR_BASE + family.width() - 1;
    let mut bits = Vec::new();
    walk_address(cache, node, ADDRESS_VAR_BASE, last_variable, family, &mut bits, out);
}

/// Walk the family slot, then hand off to `walk_address_from_root` for
/// each family the path is still ambiguous about.
fn walk_family(cache: &Cache, node: NodeId, out: &mut Vec<CidrBlock>) {
    if node.is_terminal() {
        if node.terminal_value() != 0 {
            // The family was never decided at all: every address of
            // both families is covered.
            walk_address_from_root(cache, node, Family::V4, out);
            walk_address_from_root(cache, node, Family::V6, out);
        }
        return;
    }
    let n = cache.node(node);
    if n.variable == FAMILY_VAR {
        // high = family flag true = IPv4, low = false = IPv6.
        walk_address_from_root(cache, n.high, Family::V4, out);
        walk_address_from_root(cache, n.low, Family::V6, out);
    } else {
        // Family undecided along this path: same subgraph, both families.
        walk_address_from_root(cache, node, Family::V4, out);
        walk_address_from_root(cache, node, Family::V6, out);
    }
}

/// Enumerate the minimal set of CIDR blocks that exactly cover the
/// addresses accepted by `root`.
pub fn iterate_networks(cache: &Cache, root: NodeId) -> Vec<CidrBlock> {
    let mut out = Vec::new();
    walk_family(cache, root, &mut out);
    out
}

fn block_addresses(block: CidrBlock) -> Box<dyn Iterator<Item = std::net::IpAddr>> {
    match block {
        CidrBlock::V4(network, prefix) => {
            let base = u32::from(network);
            let host_bits = 32 - prefix as u32;
            let end: u32 = if host_bits == 32 { u32::MAX } else { (1u32 << host_bits) - 1 };
            Box::new(
                (0..=end).map(move |i| std::net::IpAddr::V4(Ipv4Addr::from(base.wrapping_add(i)))),
            )
        }
        CidrBlock::V6(network, prefix) => {
            let base = u128::from(network);
            let host_bits = 128 - prefix as u32;
            let end: u128 = if host_bits == 128 { u128::MAX } else { (1u128 << host_bits) - 1 };
            Box::new(
                (0..=end).map(move |i| std::net::IpAddr::V6(Ipv6Addr::from(base.wrapping_add(i)))),
            )
        }
    }
}

/// Enumerate every individual address covered by `root`, by expanding each
/// network [`iterate_networks`] summarizes it into back into its member
/// addresses. Address-mode enumeration of a set with wide networks (a
/// `/0` or anything close to it) is combinatorially enormous by nature;
/// this is exact, not an approximation, and callers who only want the
/// summary should use [`iterate_networks`] instead.
pub fn iterate_addresses(cache: &Cache, root: NodeId) -> impl Iterator<Item = std::net::IpAddr> {
    iterate_networks(cache, root).into_iter().flat_map(block_addresses)
}
