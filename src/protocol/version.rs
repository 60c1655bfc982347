//! HTTP protocol version as an ordered (major, minor) pair.

use std::fmt;

use crate::protocol::ParseError;

/// An HTTP protocol version.
///
/// Versions order by major then minor, so `HTTP/1.0 < HTTP/1.1 < HTTP/2.0`.
/// The comparison is what drives both the `505` check (request major greater
/// than the server's) and the negotiated response version
/// (`min(request, server)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u8,
    minor: u8,
}

impl Version {
    /// HTTP/1.0
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };

    /// HTTP/1.1
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u8 {
        self.major
    }

    pub fn minor(&self) -> u8 {
        self.minor
    }

    /// Parses the protocol token of a start line, e.g. `HTTP/1.1`.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let rest = token
            .strip_prefix("HTTP/")
            .ok_or_else(|| ParseError::invalid_line(format!("invalid protocol: {token:?}")))?;

        let (major, minor) = rest
            .split_once('.')
            .ok_or_else(|| ParseError::invalid_line(format!("invalid protocol: {token:?}")))?;

        let parse_part = |s: &str| {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseError::invalid_line(format!("invalid protocol: {token:?}")));
            }
            s.parse::<u8>().map_err(|_| ParseError::invalid_line(format!("invalid protocol: {token:?}")))
        };

        Ok(Self { major: parse_part(major)?, minor: parse_part(minor)? })
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}
