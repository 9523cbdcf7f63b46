//! Typed errors for the parts of the crate that can actually fail.
//!
//! The BDD engine itself is infallible (see `cache.rs`); only the
//! serializer and the IP/CIDR parsers can reject their input.

use std::fmt;

/// Every way a public operation in this crate can fail.
#[derive(Debug)]
pub enum IpSetError {
    /// A read or write against the underlying stream failed.
    Io(std::io::Error),
    /// The on-disk stream was present but malformed (bad magic,
    /// unsupported version, truncated data, length mismatch, or a
    /// back-reference to a node that hasn't been materialized yet).
    Parse(String),
    /// An IP literal could not be parsed.
    InvalidAddress(String),
    /// A CIDR prefix was out of range, or (in strict mode) the address had
    /// nonzero bits past the prefix length.
    InvalidNetwork(String),
}

impl fmt::Display for IpSetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IpSetError::Io(e) => write!(f, "i/o error: {e}"),
            IpSetError::Parse(msg) => write!(f, "parse error: {msg}"),
            IpSetError::InvalidAddress(s) => write!(f, "invalid address: {s}"),
            IpSetError::InvalidNetwork(s) => write!(f, "invalid network: {s}"),
        }
    }
}

impl std::error::Error for IpSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpSetError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IpSetError {
    fn from(e: std::io::Error) -> Self { IpSetError::Io(e) }
}

pub type Result<T> = std::result::Result<T, IpSetError>;
