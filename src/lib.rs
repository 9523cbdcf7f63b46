//! Compact, exact sets and maps over IPv4/IPv6 address space, backed by a
//! reduced ordered binary decision diagram.
//!
//! A [`cache::Cache`] owns every node ever built; a [`set::Set`] or
//! [`map::Map`] is just a root [`nid::NodeId`] into it plus a refcount.
//! There's no global cache and no background GC: nodes are reclaimed the
//! moment their last reference is dropped (see `cache::Cache::decref`).

#[macro_use]
extern crate log;

pub mod assign;
pub mod cache;
pub mod dot;
pub mod error;
pub mod format;
pub mod ip;
pub mod iter;
pub mod map;
pub mod nid;
pub mod set;
pub mod store;
pub mod textfmt;
pub mod unique;

pub use cache::{nodes_equal, Cache};
pub use error::{IpSetError, Result};
pub use ip::{CidrPolicy, Family};
pub use iter::CidrBlock;
pub use map::Map;
pub use nid::NodeId;
pub use set::Set;
