//! HTTP request message and request-line parsing.

use bytes::{Bytes, BytesMut};

use crate::ensure;
use crate::header::Headers;
use crate::protocol::{Body, Method, ParseError, Uri, Version};
use crate::utils::latin1_to_string;

/// A parsed HTTP request.
///
/// The message owns its headers and body exclusively; the state machine
/// fills them in phase by phase and hands the finished request out by value.
#[derive(Debug, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: Headers,
    body: Body,
}

impl Request {
    pub fn new() -> Self {
        Default::default()
    }

    /// Parses the request line and sets method, target and version.
    ///
    /// The line must consist of exactly three whitespace-separated tokens.
    /// The target may be the asterisk form (`OPTIONS` only), an absolute
    /// path, or an absolute `http`/`https` URI. A target starting with `//`
    /// is ambiguous with protocol-relative references and rejected.
    pub fn parse_request_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let line = latin1_to_string(line);
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        let [method, target, version] = tokens[..] else {
            return Err(ParseError::invalid_line(format!("invalid request line: {line:?}")));
        };

        self.version = Version::parse(version)?;
        self.method = Method::parse(method)?;

        self.uri = if target == "*" {
            ensure!(
                self.method == http::Method::OPTIONS,
                ParseError::invalid_uri("asterisk target is only valid for OPTIONS")
            );
            Uri::asterisk()
        } else if target.starts_with("//") {
            return Err(ParseError::invalid_uri(
                "target must be an absolute path or contain a scheme",
            ));
        } else if target.starts_with('/') {
            Uri::parse_origin(target)?
        } else {
            Uri::parse(target)?
        };

        Ok(())
    }

    /// Serializes the complete request: request line, headers, body.
    pub fn compose(&self) -> Bytes {
        let headers = self.headers.compose();
        let mut dst = BytesMut::with_capacity(64 + headers.len() + self.body.len());
        dst.extend_from_slice(format!("{} {} {}\r\n", self.method, self.uri, self.version).as_bytes());
        dst.extend_from_slice(&headers);
        dst.extend_from_slice(self.body.as_bytes());
        dst.freeze()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn uri_mut(&mut self) -> &mut Uri {
        &mut self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}
