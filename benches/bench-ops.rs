//! Benchmarks for the hot paths of the ROBDD engine: building a set out
//! of many networks, membership queries, and set-algebra combinators.
//!
//! Grounded in the teacher crate's own `benches/bench-solve.rs` (same
//! `divan` harness, `harness = false` in Cargo.toml), adapted from a
//! factoring workload to the operations this crate actually exposes.

use std::net::Ipv4Addr;

use ipset::ip::CidrPolicy;
use ipset::{Cache, Set};

fn main() {
    divan::main();
}

fn build_class_b_set() -> (Cache, Set) {
    let mut cache = Cache::new();
    let mut set = Set::new();
    for third in 0u8..=255 {
        let addr = Ipv4Addr::new(172, 16, third, 0);
        set.add_network(&mut cache, addr.into(), 24, CidrPolicy::Strict).unwrap();
    }
    (cache, set)
}

#[divan::bench]
fn add_256_class_c_networks() {
    divan::black_box(build_class_b_set());
}

#[divan::bench]
fn contains_after_256_networks() {
    let (cache, set) = build_class_b_set();
    divan::black_box(set.contains(&cache, Ipv4Addr::new(172, 16, 128, 5).into()));
}

#[divan::bench]
fn union_of_two_256_network_sets() {
    let (mut cache, a) = build_class_b_set();
    let mut b = Set::new();
    for third in 0u8..=255 {
        let addr = Ipv4Addr::new(10, third, 0, 0);
        b.add_network(&mut cache, addr.into(), 24, CidrPolicy::Strict).unwrap();
    }
    divan::black_box(a.union(&b, &mut cache));
}

#[divan::bench]
fn summarize_to_cidr_blocks() {
    let (cache, set) = build_class_b_set();
    divan::black_box(set.networks(&cache));
}

#[divan::bench]
fn round_trip_through_binary_format() {
    let (cache, set) = build_class_b_set();
    let mut buf = Vec::new();
    ipset::format::write(&mut buf, &cache, set.root()).unwrap();
    divan::black_box(buf);
}
