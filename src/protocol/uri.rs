//! Request-target parsing and normalization.
//!
//! A request-target arrives in one of three shapes: the asterisk form `*`,
//! an absolute path (`/where?q=1`), or an absolute URI
//! (`http://host:port/where`). [`Uri`] holds the decomposed form and
//! [`Uri::normalize`] computes the canonical path: unreserved
//! percent-escapes decoded, `.` and `..` segments collapsed, scheme and host
//! lowercased. The server layer compares the path before and after
//! normalization to decide whether to redirect.

use std::fmt;

use crate::protocol::ParseError;

/// A decomposed request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Default for Uri {
    fn default() -> Self {
        Self {
            scheme: String::new(),
            host: String::new(),
            port: None,
            path: "/".to_string(),
            query: None,
            fragment: None,
        }
    }
}

impl Uri {
    /// The asterisk-form target used by server-wide `OPTIONS` requests.
    pub fn asterisk() -> Self {
        Self { path: "*".to_string(), ..Default::default() }
    }

    /// Parses an absolute URI, e.g. `http://example.org:8090/a?b#c`.
    ///
    /// Only the `http` and `https` schemes are accepted for request URIs.
    pub fn parse(target: &str) -> Result<Self, ParseError> {
        let (scheme, rest) = target
            .split_once("://")
            .ok_or_else(|| ParseError::invalid_uri(format!("not an absolute uri: {target:?}")))?;

        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(ParseError::invalid_uri(format!("unsupported scheme: {scheme:?}")));
        }

        let (authority, rest) = match rest.find(['/', '?', '#']) {
            Some(at) => rest.split_at(at),
            None => (rest, "/"),
        };

        let (host, port) = split_authority(authority)?;
        if host.is_empty() {
            return Err(ParseError::invalid_uri(format!("missing host: {target:?}")));
        }

        let mut uri = Self::parse_origin(if rest.starts_with('/') { rest } else { "/" })?;
        if !rest.starts_with('/') {
            // target like "http://host?q" keeps its query on the root path
            let tail = Self::parse_tail(rest);
            uri.query = tail.0;
            uri.fragment = tail.1;
        }
        uri.scheme = scheme.to_string();
        uri.host = host.to_string();
        uri.port = port;
        Ok(uri)
    }

    /// Parses an origin-form target: an absolute path with optional query
    /// and fragment.
    pub fn parse_origin(target: &str) -> Result<Self, ParseError> {
        if !target.starts_with('/') {
            return Err(ParseError::invalid_uri(format!("path must be absolute: {target:?}")));
        }

        let (path, rest) = match target.find(['?', '#']) {
            Some(at) => target.split_at(at),
            None => (target, ""),
        };
        let (query, fragment) = Self::parse_tail(rest);

        Ok(Self { path: path.to_string(), query, fragment, ..Default::default() })
    }

    fn parse_tail(rest: &str) -> (Option<String>, Option<String>) {
        let (rest, fragment) = match rest.split_once('#') {
            Some((head, frag)) => (head, Some(frag.to_string())),
            None => (rest, None),
        };
        let query = rest.strip_prefix('?').map(str::to_string);
        (query, fragment)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn is_asterisk(&self) -> bool {
        self.path == "*"
    }

    /// Fills in the authority a relative target leaves open.
    pub fn set_authority(&mut self, scheme: &str, host: &str, port: Option<u16>) {
        self.scheme = scheme.to_string();
        self.host = host.to_string();
        self.port = port;
    }

    /// Rewrites the URI into its canonical form.
    ///
    /// Scheme and host are lowercased; unreserved percent-escapes in the
    /// path are decoded and `.`/`..` segments collapsed. The asterisk form
    /// is left alone.
    pub fn normalize(&mut self) {
        self.scheme.make_ascii_lowercase();
        self.host.make_ascii_lowercase();
        if self.path.starts_with('/') {
            self.path = remove_dot_segments(&decode_unreserved(&self.path));
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}://{}", self.scheme, self.host)?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

fn split_authority(authority: &str) -> Result<(&str, Option<u16>), ParseError> {
    // IPv6 literals keep their brackets so the port colon stays unambiguous
    let port_start = if let Some(close) = authority.rfind(']') {
        authority[close..].find(':').map(|at| close + at)
    } else {
        authority.rfind(':')
    };

    match port_start {
        Some(at) => {
            let port = &authority[at + 1..];
            if port.is_empty() {
                return Ok((&authority[..at], None));
            }
            let port = port
                .parse::<u16>()
                .map_err(|_| ParseError::invalid_uri(format!("invalid port: {port:?}")))?;
            Ok((&authority[..at], Some(port)))
        }
        None => Ok((authority, None)),
    }
}

/// Decodes `%XX` escapes whose octet is an unreserved character.
///
/// All other escapes are kept verbatim, including malformed ones.
fn decode_unreserved(path: &str) -> String {
    fn is_unreserved(b: u8) -> bool {
        b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
    }

    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        let octet = rest
            .as_bytes()
            .get(at + 1..at + 3)
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match octet {
            // a successful hex parse means the two bytes were ASCII, so
            // the slice below stays on a char boundary
            Some(octet) if is_unreserved(octet) => {
                out.push(octet as char);
                rest = &rest[at + 3..];
            }
            _ => {
                out.push('%');
                rest = &rest[at + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// RFC 3986 section 5.2.4 dot-segment removal.
fn remove_dot_segments(path: &str) -> String {
    let mut input = path.to_string();
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if input.starts_with("../") {
            input.drain(..3);
        } else if input.starts_with("./") {
            input.drain(..2);
        } else if input.starts_with("/./") {
            input.replace_range(..3, "/");
        } else if input == "/." {
            input.replace_range(.., "/");
        } else if input.starts_with("/../") {
            input.replace_range(..4, "/");
            output.truncate(output.rfind('/').unwrap_or(0));
        } else if input == "/.." {
            input.replace_range(.., "/");
            output.truncate(output.rfind('/').unwrap_or(0));
        } else if input == "." || input == ".." {
            input.clear();
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map(|at| at + start).unwrap_or(input.len());
            output.push_str(&input[..end]);
            input.drain(..end);
        }
    }
    output
}
