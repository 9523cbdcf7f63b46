//! `ipset-cat`: read the compact binary encoding and print its contents,
//! either as the minimal list of CIDR blocks (the default) or as every
//! individual address.

use std::fs::File;
use std::io::{self, BufReader};
use std::process::exit;

use log::{error, LevelFilter};
use simplelog::{Config, TermLogger};

use ipset::Set;

struct Args {
    input: Option<String>,
    addresses: bool,
    verbose: bool,
}

fn usage() -> ! {
    eprintln!(
        "usage: ipset-cat [--addresses] [-v] [INPUT]\n\n\
         Reads a binary set and prints it as CIDR blocks, one\n\
         per line. Pass --addresses to expand every block into its\n\
         individual addresses instead. INPUT defaults to stdin."
    );
    exit(2);
}

fn parse_args() -> Args {
    let mut input = None;
    let mut addresses = false;
    let mut verbose = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--addresses" => addresses = true,
            "--networks" => addresses = false,
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => usage(),
            _ if input.is_none() => input = Some(arg),
            _ => usage(),
        }
    }
    Args { input, addresses, verbose }
}

fn main() {
    let args = parse_args();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = TermLogger::init(level, Config::default());

    let mut cache = ipset::Cache::new();
    let root = match &args.input {
        Some(path) => File::open(path)
            .map_err(ipset::IpSetError::from)
            .and_then(|f| ipset::format::read(&mut BufReader::new(f), &mut cache)),
        None => ipset::format::read(&mut io::stdin().lock(), &mut cache),
    };
    let root = match root {
        Ok(root) => root,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };
    let set = Set::from_root(root);

    if args.addresses {
        for addr in set.addresses(&cache) {
            println!("{addr}");
        }
    } else {
        for block in set.networks(&cache) {
            println!("{block}");
        }
    }
}
