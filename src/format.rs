//! The stable on-disk binary format (version 1).
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! magic:              b"IP set"    (6 bytes)
//! version:            u16          (= 1)
//! length:             u64          (total byte count of the stream, header included)
//! nonterminal_count:  u32
//! if nonterminal_count == 0:
//!     root_value:     u32          (the whole diagram is this one terminal)
//! else:
//!     nonterminal_count records, children before parents, each:
//!         variable:   u8
//!         low:        i32          (>=0: terminal value; <0: -(serial number) of an earlier record)
//!         high:       i32          (same encoding as low)
//!     root = the last record written
//! ```
//!
//! Mirrors `ipset_node_cache_save`/`ipset_node_cache_load`'s wire layout:
//! same magic, same big-endian fixed-width fields, same
//! children-before-parents topological order, same "last record is the
//! root" convention.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::cache::Cache;
use crate::error::{IpSetError, Result};
use crate::nid::NodeId;

const MAGIC: &[u8; 6] = b"IP set";
const VERSION: u16 = 1;

fn topo_order(cache: &Cache, root: NodeId) -> Vec<usize> {
    let mut order = Vec::new();
    let mut seen = std::collections::HashSet::new();
    fn visit(
        cache: &Cache,
        id: NodeId,
        seen: &mut std::collections::HashSet<usize>,
        order: &mut Vec<usize>,
    ) {
        if id.is_terminal() {
            return;
        }
        let index = id.index();
        if !seen.insert(index) {
            return;
        }
        let node = *cache.node(id);
        visit(cache, node.low, seen, order);
        visit(cache, node.high, seen, order);
        order.push(index);
    }
    visit(cache, root, &mut seen, &mut order);
    order
}

/// Serialize the diagram rooted at `root` in the v1 binary format.
pub fn write<W: Write>(writer: &mut W, cache: &Cache, root: NodeId) -> Result<()> {
    if root.is_terminal() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&root.terminal_value().to_be_bytes());
        return write_framed(writer, &body);
    }

    let order = topo_order(cache, root);
    let serial_of: HashMap<usize, u32> =
        order.iter().enumerate().map(|(i, &arena_index)| (arena_index, (i + 1) as u32)).collect();

    let encode_field = |id: NodeId| -> Result<i32> {
        if id.is_terminal() {
            i32::try_from(id.terminal_value())
                .map_err(|_| IpSetError::Parse("terminal value too large to serialize".into()))
        } else {
            let serial = serial_of[&id.index()];
            i32::try_from(serial)
                .map(|s| -s)
                .map_err(|_| IpSetError::Parse("too many nodes to serialize".into()))
        }
    };

    let mut body = Vec::new();
    body.extend_from_slice(&(order.len() as u32).to_be_bytes());
    for &arena_index in &order {
        let node = *cache.node(NodeId::nonterminal(arena_index));
        let variable: u8 = node
            .variable
            .try_into()
            .map_err(|_| IpSetError::Parse("variable index exceeds a byte".into()))?;
        body.push(variable);
        body.extend_from_slice(&encode_field(node.low)?.to_be_bytes());
        body.extend_from_slice(&encode_field(node.high)?.to_be_bytes());
    }
    write_framed(writer, &body)
}

fn write_framed<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    let length = (MAGIC.len() + 2 + 8) as u64 + body.len() as u64;
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_be_bytes())?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(body)?;
    Ok(())
}

/// Deserialize a v1 binary stream, materializing its nodes into `cache`
/// and returning the root with one reference already owned by the
/// caller (mirroring what [`crate::set::Set::from_root`] expects).
pub fn read<R: Read>(reader: &mut R, cache: &mut Cache) -> Result<NodeId> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(IpSetError::Parse(format!("bad magic: {magic:?}")));
    }

    let mut u16_buf = [0u8; 2];
    reader.read_exact(&mut u16_buf)?;
    let version = u16::from_be_bytes(u16_buf);
    if version != VERSION {
        return Err(IpSetError::Parse(format!("unsupported version: {version}")));
    }

    let mut u64_buf = [0u8; 8];
    reader.read_exact(&mut u64_buf)?;
    let declared_length = u64::from_be_bytes(u64_buf);

    let mut u32_buf = [0u8; 4];
    reader.read_exact(&mut u32_buf)?;
    let count = u32::from_be_bytes(u32_buf);

    let mut bytes_read = (6 + 2 + 8 + 4) as u64;

    let root = if count == 0 {
        reader.read_exact(&mut u32_buf)?;
        bytes_read += 4;
        NodeId::terminal(u32::from_be_bytes(u32_buf))
    } else {
        let mut materialized: Vec<NodeId> = Vec::with_capacity(count as usize);
        for i in 0..count {
            let mut variable_buf = [0u8; 1];
            reader.read_exact(&mut variable_buf)?;
            let variable = variable_buf[0] as u32;

            let mut low_buf = [0u8; 4];
            reader.read_exact(&mut low_buf)?;
            let low_raw = i32::from_be_bytes(low_buf);

            let mut high_buf = [0u8; 4];
            reader.read_exact(&mut high_buf)?;
            let high_raw = i32::from_be_bytes(high_buf);

            bytes_read += 9;

            let resolve = |raw: i32| -> Result<NodeId> {
                if raw >= 0 {
                    Ok(NodeId::terminal(raw as u32))
                } else {
                    let back_index = (-raw) as usize - 1;
                    materialized.get(back_index).copied().ok_or_else(|| {
                        IpSetError::Parse(format!(
                            "node {i} references unresolved back-reference {back_index}"
                        ))
                    })
                }
            };

            let low = resolve(low_raw)?;
            let high = resolve(high_raw)?;
            let id = cache.unique(variable, low, high);
            materialized.push(id);
        }
        *materialized.last().ok_or_else(|| IpSetError::Parse("empty node list".into()))?
    };

    if bytes_read != declared_length {
        return Err(IpSetError::Parse(format!(
            "length mismatch: header declared {declared_length} bytes, read {bytes_read}"
        )));
    }

    cache.incref(root);
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::CidrPolicy;
    use crate::set::Set;

    #[test]
    fn empty_set_round_trips() {
        let mut cache = Cache::new();
        let set = Set::new();
        let mut buf = Vec::new();
        write(&mut buf, &cache, set.root()).unwrap();

        let root = read(&mut &buf[..], &mut cache).unwrap();
        let loaded = Set::from_root(root);
        assert!(loaded.is_empty());
    }

    #[test]
    fn populated_set_round_trips() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        set.add_network(&mut cache, "10.0.0.0".parse().unwrap(), 24, CidrPolicy::Strict).unwrap();
        set.add_address(&mut cache, "192.168.1.1".parse().unwrap());

        let mut buf = Vec::new();
        write(&mut buf, &cache, set.root()).unwrap();

        let root = read(&mut &buf[..], &mut cache).unwrap();
        let loaded = Set::from_root(root);
        assert!(loaded.is_equal(&set));
        assert!(loaded.contains(&cache, "10.0.0.5".parse().unwrap()));
        assert!(loaded.contains(&cache, "192.168.1.1".parse().unwrap()));
        assert!(!loaded.contains(&cache, "192.168.1.2".parse().unwrap()));
    }

    /// Loaded into a *fresh* cache, the root id is not numerically
    /// comparable to the source set's (different allocation order), so
    /// the round-trip is checked via `nodes_equal` instead.
    #[test]
    fn round_trip_into_a_fresh_cache_is_structurally_equal() {
        let mut source_cache = Cache::new();
        let mut set = Set::new();
        set.add_network(&mut source_cache, "10.0.0.0".parse().unwrap(), 8, CidrPolicy::Strict)
            .unwrap();
        set.remove_network(&mut source_cache, "10.1.0.0".parse().unwrap(), 16, CidrPolicy::Strict)
            .unwrap();
        set.add_address(&mut source_cache, "2001:db8::1".parse().unwrap());

        let mut buf = Vec::new();
        write(&mut buf, &source_cache, set.root()).unwrap();

        let mut fresh_cache = Cache::new();
        let loaded_root = read(&mut &buf[..], &mut fresh_cache).unwrap();

        assert!(crate::cache::nodes_equal(&source_cache, set.root(), &fresh_cache, loaded_root));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut cache = Cache::new();
        let bytes = b"XXXXXX\x00\x01\x00\x00\x00\x00\x00\x00\x00\x11\x00\x00\x00\x00";
        let err = read(&mut &bytes[..], &mut cache).unwrap_err();
        assert!(matches!(err, IpSetError::Parse(_)));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        set.add_network(&mut cache, "10.0.0.0".parse().unwrap(), 24, CidrPolicy::Strict).unwrap();
        let mut buf = Vec::new();
        write(&mut buf, &cache, set.root()).unwrap();
        buf.truncate(buf.len() - 2);
        assert!(read(&mut &buf[..], &mut cache).is_err());
    }
}
