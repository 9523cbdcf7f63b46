//! Encoding of IPv4/IPv6 addresses and networks as BDD paths.
//!
//! Variable 0 is the address family flag (`true` selects IPv4, `false`
//! selects IPv6); variables `1..=32` or `1..=128` are the address bits,
//! most-significant first. A network shorter than the full width simply
//! stops the path early, leaving the remaining bits as don't-cares:
//! there is no explicit "either" terminal to encode, the BDD's structure
//! expresses it directly.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::cache::Cache;
use crate::error::IpSetError;
use crate::nid::{NodeId, ONE, ZERO};

/// Variable index of the address-family flag.
pub const FAMILY_VAR: u32 = 0;
/// Variable index of the first (most significant) address bit.
pub const ADDRESS_VAR_BASE: u32 = 1;

/// Which address family a path encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Number of address bits for this family.
    pub fn width(self) -> u32 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// The value variable 0 takes for this family (true = IPv4).
    fn flag(self) -> bool {
        matches!(self, Family::V4)
    }
}

/// How strictly `encode_network` treats host bits set past the prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CidrPolicy {
    /// Reject a network whose address has any nonzero bit past the prefix.
    #[default]
    Strict,
    /// Mask host bits to zero before encoding.
    Lenient,
}

pub(crate) fn ipv4_bits(addr: Ipv4Addr) -> [bool; 32] {
    let bits_of_octet = |byte: u8| (0..8).rev().map(move |i| (byte >> i) & 1 != 0);
    let mut bits = [false; 32];
    for (i, bit) in addr.octets().into_iter().flat_map(bits_of_octet).enumerate() {
        bits[i] = bit;
    }
    bits
}

pub(crate) fn ipv6_bits(addr: Ipv6Addr) -> [bool; 128] {
    let bits_of_octet = |byte: u8| (0..8).rev().map(move |i| (byte >> i) & 1 != 0);
    let mut bits = [false; 128];
    for (i, bit) in addr.octets().into_iter().flat_map(bits_of_octet).enumerate() {
        bits[i] = bit;
    }
    bits
}

/// Build the single-path BDD that accepts exactly the assignment
/// `(FAMILY_VAR, family_flag), (ADDRESS_VAR_BASE, bits[0]), ...` up to
/// `prefix_len` address bits, with everything past that a don't-care.
///
/// Returns a node with one reference already owned by the caller (a
/// temporary): callers fold it into a root via `or`/`and_not`/`ite` and
/// must `cache.decref` it afterward.
fn build_path(cache: &mut Cache, family_flag: bool, bits: &[bool]) -> NodeId {
    let mut node = ONE;
    for (offset, &bit) in bits.iter().enumerate().rev() {
        let variable = ADDRESS_VAR_BASE + offset as u32;
        node = if bit { cache.unique(variable, ZERO, node) } else { cache.unique(variable, node, ZERO) };
    }
    let path = if family_flag {
        cache.unique(FAMILY_VAR, ZERO, node)
    } else {
        cache.unique(FAMILY_VAR, node, ZERO)
    };
    cache.incref(path);
    path
}

/// Encode a single IPv4 address as a full-width (/32) path.
pub fn encode_ipv4(cache: &mut Cache, addr: Ipv4Addr) -> NodeId {
    build_path(cache, Family::V4.flag(), &ipv4_bits(addr))
}

/// Encode a single IPv6 address as a full-width (/128) path.
pub fn encode_ipv6(cache: &mut Cache, addr: Ipv6Addr) -> NodeId {
    build_path(cache, Family::V6.flag(), &ipv6_bits(addr))
}

fn check_and_apply_policy(
    family: Family,
    mut bits: Vec<bool>,
    prefix_len: u32,
    policy: CidrPolicy,
    display: &str,
) -> Result<Vec<bool>, IpSetError> {
    let width = family.width();
    if prefix_len > width {
        return Err(IpSetError::InvalidNetwork(format!(
            "prefix length {prefix_len} exceeds {width}-bit address width ({display})"
        )));
    }
    let host_bits_set = bits[prefix_len as usize..].iter().any(|&b| b);
    if host_bits_set {
        match policy {
            CidrPolicy::Strict => {
                return Err(IpSetError::InvalidNetwork(format!(
                    "{display} has nonzero host bits past /{prefix_len}"
                )));
            }
            CidrPolicy::Lenient => {
                for bit in &mut bits[prefix_len as usize..] {
                    *bit = false;
                }
            }
        }
    }
    bits.truncate(prefix_len as usize);
    Ok(bits)
}

/// Encode an IPv4 network, validating the prefix length and (per `policy`)
/// any host bits set past it.
pub fn encode_ipv4_network(
    cache: &mut Cache,
    addr: Ipv4Addr,
    prefix_len: u32,
    policy: CidrPolicy,
) -> Result<NodeId, IpSetError> {
    let bits = check_and_apply_policy(
        Family::V4,
        ipv4_bits(addr).to_vec(),
        prefix_len,
        policy,
        &format!("{addr}/{prefix_len}"),
    )?;
    Ok(build_path(cache, Family::V4.flag(), &bits))
}

/// Encode an IPv6 network, validating the prefix length and (per `policy`)
/// any host bits set past it.
pub fn encode_ipv6_network(
    cache: &mut Cache,
    addr: Ipv6Addr,
    prefix_len: u32,
    policy: CidrPolicy,
) -> Result<NodeId, IpSetError> {
    let bits = check_and_apply_policy(
        Family::V6,
        ipv6_bits(addr).to_vec(),
        prefix_len,
        policy,
        &format!("{addr}/{prefix_len}"),
    )?;
    Ok(build_path(cache, Family::V6.flag(), &bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_address_is_reachable_with_all_bits_set_to_itself() {
        let mut cache = Cache::new();
        let addr: Ipv4Addr = "10.0.0.1".parse().unwrap();
        let path = encode_ipv4(&mut cache, addr);
        let bits = ipv4_bits(addr);
        let value = cache.evaluate(path, |v| {
            if v == FAMILY_VAR {
                true
            } else {
                bits[(v - ADDRESS_VAR_BASE) as usize]
            }
        });
        assert_eq!(value, 1);
    }

    #[test]
    fn strict_policy_rejects_host_bits() {
        let mut cache = Cache::new();
        let addr: Ipv4Addr = "10.0.0.1".parse().unwrap();
        let result = encode_ipv4_network(&mut cache, addr, 24, CidrPolicy::Strict);
        assert!(matches!(result, Err(IpSetError::InvalidNetwork(_))));
    }

    #[test]
    fn lenient_policy_masks_host_bits() {
        let mut cache = Cache::new();
        let addr: Ipv4Addr = "10.0.0.1".parse().unwrap();
        let network = encode_ipv4_network(&mut cache, addr, 24, CidrPolicy::Lenient).unwrap();
        let masked: Ipv4Addr = "10.0.0.0".parse().unwrap();
        let exact = encode_ipv4_network(&mut cache, masked, 24, CidrPolicy::Strict).unwrap();
        assert_eq!(network, exact);
    }

    #[test]
    fn prefix_longer_than_width_is_rejected() {
        let mut cache = Cache::new();
        let addr: Ipv4Addr = "10.0.0.1".parse().unwrap();
        let result = encode_ipv4_network(&mut cache, addr, 33, CidrPolicy::Lenient);
        assert!(matches!(result, Err(IpSetError::InvalidNetwork(_))));
    }
}
