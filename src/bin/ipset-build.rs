//! `ipset-build`: read the line-oriented text format and write the
//! compact binary encoding.
//!
//! This is a thin wrapper over the public `ipset` API: all of the actual
//! work happens in `ipset::textfmt` and `ipset::format`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::process::exit;

use log::{error, warn, LevelFilter};
use simplelog::{Config, TermLogger};

use ipset::ip::CidrPolicy;
use ipset::textfmt::{self, ErrorPolicy, TextFormatOptions};
use ipset::{Cache, Set};

struct Args {
    input: Option<String>,
    output: Option<String>,
    lenient: bool,
    halt_on_error: bool,
    verbose: bool,
}

fn usage() -> ! {
    eprintln!(
        "usage: ipset-build [-o OUTPUT] [--lenient] [--halt-on-error] [-v] [INPUT]\n\n\
         Reads the line-oriented text format (one ADDR or ADDR/PREFIX per\n\
         line, '#' comments, a leading '!' marks a removal) and writes the\n\
         compact binary encoding. INPUT defaults to\n\
         stdin, OUTPUT defaults to stdout."
    );
    exit(2);
}

fn parse_args() -> Args {
    let mut input = None;
    let mut output = None;
    let mut lenient = false;
    let mut halt_on_error = false;
    let mut verbose = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => output = Some(args.next().unwrap_or_else(|| usage())),
            "--lenient" => lenient = true,
            "--halt-on-error" => halt_on_error = true,
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => usage(),
            _ if input.is_none() => input = Some(arg),
            _ => usage(),
        }
    }
    Args { input, output, lenient, halt_on_error, verbose }
}

fn main() {
    let args = parse_args();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = TermLogger::init(level, Config::default());

    let options = TextFormatOptions {
        cidr_policy: if args.lenient { CidrPolicy::Lenient } else { CidrPolicy::Strict },
        on_error: if args.halt_on_error { ErrorPolicy::Halt } else { ErrorPolicy::Continue },
    };

    let mut cache = Cache::new();
    let mut set = Set::new();

    let read_result = match &args.input {
        Some(path) => File::open(path)
            .map_err(ipset::IpSetError::from)
            .and_then(|f| textfmt::read_into(BufReader::new(f), &mut cache, &mut set, options)),
        None => textfmt::read_into(io::stdin().lock(), &mut cache, &mut set, options),
    };

    let errors = match read_result {
        Ok(errors) => errors,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };
    for line_error in &errors {
        warn!("line {}: {}", line_error.line_number, line_error.message);
    }

    let write_result = match &args.output {
        Some(path) => File::create(path)
            .map_err(ipset::IpSetError::from)
            .and_then(|f| ipset::format::write(&mut BufWriter::new(f), &cache, set.root())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            ipset::format::write(&mut handle, &cache, set.root())
                .and_then(|_| handle.flush().map_err(ipset::IpSetError::from))
        }
    };

    if let Err(e) = write_result {
        error!("{e}");
        exit(1);
    }
    if !errors.is_empty() {
        exit(1);
    }
}
