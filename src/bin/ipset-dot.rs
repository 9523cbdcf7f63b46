//! `ipset-dot`: read the compact binary encoding and emit a GraphViz
//! `.dot` rendering of its diagram.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::process::exit;

use log::{error, LevelFilter};
use simplelog::{Config, TermLogger};

struct Args {
    input: Option<String>,
    output: Option<String>,
    verbose: bool,
}

fn usage() -> ! {
    eprintln!(
        "usage: ipset-dot [-o OUTPUT] [-v] [INPUT]\n\n\
         Reads a binary set and writes a GraphViz digraph of\n\
         its diagram. INPUT defaults to stdin, OUTPUT defaults to stdout."
    );
    exit(2);
}

fn parse_args() -> Args {
    let mut input = None;
    let mut output = None;
    let mut verbose = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => output = Some(args.next().unwrap_or_else(|| usage())),
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => usage(),
            _ if input.is_none() => input = Some(arg),
            _ => usage(),
        }
    }
    Args { input, output, verbose }
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

    let result = match &args.output {
        Some(path) => File::create(path)
            .map_err(ipset::IpSetError::from)
            .and_then(|f| ipset::dot::write(&mut BufWriter::new(f), &cache, root).map_err(Into::into)),
        None => ipset::dot::write(&mut io::stdout().lock(), &cache, root).map_err(Into::into),
    };

    if let Err(e) = result {
        error!("{e}");
        exit(1);
    }
}
