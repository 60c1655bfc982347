//! `Host` header parsing and classification.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::protocol::ParseError;

/// What kind of name the `Host` header carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Ipv4,
    Ipv6,
    Fqdn,
}

/// A validated `Host` header value.
///
/// The value is lowercased, an optional port split off, and IPv6 literals
/// have their brackets stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    host: String,
    port: Option<u16>,
    kind: HostKind,
}

impl HostInfo {
    /// Parses and classifies a `Host` field value.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        let value = value.to_ascii_lowercase();
        let (mut host, port) = split_host_port(&value)?;

        if host.starts_with('[') && host.ends_with(']') {
            host = &host[1..host.len() - 1];
        }

        let kind = classify(host)
            .ok_or_else(|| ParseError::invalid_header(format!("invalid Host header: {value:?}")))?;

        Ok(Self { host: host.to_string(), port, kind })
    }

    /// The host name or address, lowercased and without brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn is_fqdn(&self) -> bool {
        self.kind == HostKind::Fqdn
    }
}

fn split_host_port(value: &str) -> Result<(&str, Option<u16>), ParseError> {
    if let Some((head, tail)) = value.rsplit_once(':') {
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            let port = tail
                .parse::<u16>()
                .map_err(|_| ParseError::invalid_header(format!("invalid Host port: {tail:?}")))?;
            return Ok((head, Some(port)));
        }
    }
    Ok((value, None))
}

fn classify(host: &str) -> Option<HostKind> {
    if host.parse::<Ipv4Addr>().is_ok() {
        return Some(HostKind::Ipv4);
    }
    if host.parse::<Ipv6Addr>().is_ok() {
        return Some(HostKind::Ipv6);
    }
    if !host.is_empty() && host.bytes().all(is_hostname_byte) {
        return Some(HostKind::Fqdn);
    }
    None
}

fn is_hostname_byte(b: u8) -> bool {
    !(b.is_ascii_control()
        || matches!(
            b,
            b'(' | b')'
                | b'^'
                | b'\''
                | b'"'
                | b'<'
                | b'>'
                | b'@'
                | b','
                | b';'
                | b':'
                | b'/'
                | b'['
                | b']'
                | b'='
                | b'{'
                | b'}'
                | b' '
                | b'\t'
                | b'\\'
        ))
}
