//! The line-oriented text format accepted by `ipset-build` and documented
//! for hand-written input files.
//!
//! Mirrors `libipset`'s `ipset_read_text_file`: blank lines and
//! `#`-comments are skipped, a leading `!` marks a
//! removal, `/` splits off a CIDR prefix, additions are applied as soon
//! as they're parsed but removals are collected and applied only after
//! the whole file has been read (so a file can add a supernet and then
//! carve a hole out of it regardless of line order). A malformed line is
//! never fatal to the rest of the file unless the caller opts into
//! halt-on-first-error.

use std::io::BufRead;
use std::net::IpAddr;

use crate::cache::Cache;
use crate::error::IpSetError;
use crate::ip::CidrPolicy;
use crate::set::Set;

/// What to do when a line can't be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Record the error and keep processing the rest of the file.
    #[default]
    Continue,
    /// Stop at the first malformed line.
    Halt,
}

/// A single line that failed to parse, when running under
/// [`ErrorPolicy::Continue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineError {
    pub line_number: usize,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TextFormatOptions {
    pub cidr_policy: CidrPolicy,
    pub on_error: ErrorPolicy,
}

fn parse_entry(text: &str) -> Result<(IpAddr, Option<u32>), IpSetError> {
    match text.split_once('/') {
        None => {
            let addr: IpAddr = text
                .parse()
                .map_err(|_| IpSetError::InvalidAddress(text.to_string()))?;
            Ok((addr, None))
        }
        Some((addr_part, prefix_part)) => {
            let addr: IpAddr = addr_part
                .parse()
                .map_err(|_| IpSetError::InvalidAddress(addr_part.to_string()))?;
            let prefix_len: u32 = prefix_part
                .parse()
                .map_err(|_| IpSetError::InvalidNetwork(format!("{text} (bad prefix)")))?;
            Ok((addr, Some(prefix_len)))
        }
    }
}

/// Read `reader` as the text format, applying additions and removals to
/// `set` against `cache`. Returns the per-line errors collected under
/// [`ErrorPolicy::Continue`] (empty if everything parsed), or the first
/// error encountered under [`ErrorPolicy::Halt`].
pub fn read_into<R: BufRead>(
    reader: R,
    cache: &mut Cache,
    set: &mut Set,
    options: TextFormatOptions,
) -> Result<Vec<LineError>, IpSetError> {
    let mut errors = Vec::new();
    let mut removals: Vec<(usize, IpAddr, Option<u32>)> = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line_number = number + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (is_removal, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        let outcome = parse_entry(body).and_then(|(addr, prefix)| {
            if is_removal {
                removals.push((line_number, addr, prefix));
                Ok(())
            } else {
                match prefix {
                    Some(p) => set.add_network(cache, addr, p, options.cidr_policy).map(|was_present| {
                        if was_present {
                            debug!("line {line_number}: {addr}/{p} was already fully covered");
                        }
                    }),
                    None => {
                        if set.add_address(cache, addr) {
                            debug!("line {line_number}: {addr} was already present");
                        }
                        Ok(())
                    }
                }
            }
        });

        if let Err(e) = outcome {
            match options.on_error {
                ErrorPolicy::Halt => return Err(e),
                ErrorPolicy::Continue => {
                    errors.push(LineError { line_number, message: e.to_string() })
                }
            }
        }
    }

    for (line_number, addr, prefix) in removals {
        let outcome = match prefix {
            Some(p) => set.remove_network(cache, addr, p, options.cidr_policy).map(|was_absent| {
                if was_absent {
                    debug!("line {line_number}: {addr}/{p} was already absent");
                }
            }),
            None => {
                if set.remove_address(cache, addr) {
                    debug!("line {line_number}: {addr} was already absent");
                }
                Ok(())
            }
        };
        if let Err(e) = outcome {
            match options.on_error {
                ErrorPolicy::Halt => return Err(e),
                ErrorPolicy::Continue => {
                    errors.push(LineError { line_number, message: e.to_string() })
                }
            }
        }
    }

    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        let input = "# comment\n\n   \n10.0.0.1\n";
        let errors = read_into(input.as_bytes(), &mut cache, &mut set, TextFormatOptions::default()).unwrap();
        assert!(errors.is_empty());
        assert!(set.contains(&cache, "10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn removal_after_addition_carves_a_hole_regardless_of_order() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        let input = "!10.0.0.128/25\n10.0.0.0/24\n";
        read_into(input.as_bytes(), &mut cache, &mut set, TextFormatOptions::default()).unwrap();
        assert!(set.contains(&cache, "10.0.0.1".parse().unwrap()));
        assert!(!set.contains(&cache, "10.0.0.200".parse().unwrap()));
    }

    #[test]
    fn malformed_line_is_reported_but_does_not_abort_continue_mode() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        let input = "not-an-address\n10.0.0.1\n";
        let errors = read_into(input.as_bytes(), &mut cache, &mut set, TextFormatOptions::default()).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number, 1);
        assert!(set.contains(&cache, "10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn malformed_line_aborts_in_halt_mode() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        let input = "not-an-address\n10.0.0.1\n";
        let options = TextFormatOptions { on_error: ErrorPolicy::Halt, ..Default::default() };
        let result = read_into(input.as_bytes(), &mut cache, &mut set, options);
        assert!(result.is_err());
        assert!(!set.contains(&cache, "10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn strict_policy_surfaces_network_errors_per_line() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        let input = "10.0.0.1/24\n";
        let errors = read_into(input.as_bytes(), &mut cache, &mut set, TextFormatOptions::default()).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn removal_error_reports_its_own_line_number_not_the_first_line() {
        let mut cache = Cache::new();
        let mut set = Set::new();
        let input = "10.0.0.0/24\n!192.168.0.1/24\n";
        let errors = read_into(input.as_bytes(), &mut cache, &mut set, TextFormatOptions::default()).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number, 2);
    }
}
