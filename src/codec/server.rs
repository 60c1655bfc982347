//! Server-side protocol state machine.
//!
//! [`ServerStateMachine`] layers request-specific validation on top of the
//! incremental [`MessageParser`] and pairs every request with a freshly
//! prepared [`Response`]. The checks hang off the parser's phase boundaries:
//!
//! | after phase | check | failure |
//! |-------------|-------|---------|
//! | (during start line) | request line longer than the URI limit | `414` |
//! | start line | protocol major above the server's | `505` |
//! | start line | normalization changed the path | `301` + canonical path |
//! | start line | scheme other than http/https | `400` |
//! | headers | HTTP/1.1 without a `Host` header | `400` |
//! | body | leftover bytes without framing | `411` |
//! | body | safe method arriving with a body | `400` |
//! | body | h2c upgrade negotiation complete | `101` + typed successor |
//!
//! A failure surfaces as a [`StatusSignal`]; the transport catches it,
//! composes the reply (`Response::from_signal`) and usually drops the
//! connection. After a `101` the transport consults
//! [`ServerStateMachine::upgrade`] for the typed h2c successor state
//! instead of continuing to feed this machine.

use http::StatusCode;
use tracing::{debug, trace};

use crate::codec::message_parser::{MessageParser, Step};
use crate::protocol::{Request, Response, StatusSignal, Version};

/// The protocol this server speaks.
const SERVER_PROTOCOL: Version = Version::HTTP_11;

/// Default `Server` response header.
const SERVER_HEADER: &str = concat!("httpkit/", env!("CARGO_PKG_VERSION"));

/// Default cap on the request line, in bytes.
const DEFAULT_MAX_URI_LENGTH: usize = 8000;

/// The successor state after a successful h2c upgrade negotiation.
///
/// The state machine itself never speaks HTTP/2; once the `101` has been
/// signaled the transport hands the connection (and these settings) to an
/// HTTP/2 implementation.
#[derive(Debug)]
pub struct H2cUpgrade {
    settings: String,
}

impl H2cUpgrade {
    /// The client's base64url-encoded `HTTP2-Settings` payload.
    pub fn settings(&self) -> &str {
        &self.settings
    }
}

/// A per-connection request parser with server semantics.
#[derive(Debug)]
pub struct ServerStateMachine {
    parser: MessageParser,
    scheme: String,
    host: String,
    port: u16,
    max_uri_length: usize,
    response: Option<Response>,
    h2c: Option<H2cUpgrade>,
}

impl ServerStateMachine {
    /// Creates a state machine for a listener bound to
    /// `scheme://host:port`. Relative request targets are resolved against
    /// this authority.
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        Self {
            parser: MessageParser::new(),
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            max_uri_length: DEFAULT_MAX_URI_LENGTH,
            response: None,
            h2c: None,
        }
    }

    /// Caps the length of the request line.
    pub fn set_max_uri_length(&mut self, limit: usize) {
        self.max_uri_length = limit;
    }

    /// The typed successor state, present after a `101` has been signaled.
    pub fn upgrade(&self) -> Option<&H2cUpgrade> {
        self.h2c.as_ref()
    }

    /// Feeds bytes and drains completed request/response pairs.
    ///
    /// At most one pair is produced per call; residue stays buffered.
    /// Validation failures and the h2c `101` surface as [`StatusSignal`]
    /// errors.
    pub fn parse(&mut self, data: &[u8]) -> Result<Vec<(Request, Response)>, StatusSignal> {
        self.parser.feed(data);
        let mut pairs = Vec::new();

        loop {
            match self.parser.step()? {
                Step::NeedMore => {
                    self.check_uri_length()?;
                    break;
                }
                Step::StartLine => self.on_start_line()?,
                Step::Headers => self.on_headers()?,
                Step::Body => self.on_body()?,
                Step::Message(request) => {
                    trace!(target = %request.uri(), "request complete");
                    let response = self.response.take().unwrap_or_default();
                    pairs.push((request, response));
                    break;
                }
            }
        }

        Ok(pairs)
    }

    fn check_uri_length(&self) -> Result<(), StatusSignal> {
        if self.parser.is_parsing_start_line() && self.parser.buffered() > self.max_uri_length {
            debug!(buffered = self.parser.buffered(), "request line over limit");
            return Err(StatusSignal::new(
                StatusCode::URI_TOO_LONG,
                format!("The maximum length of the request line is {}", self.max_uri_length),
            ));
        }
        Ok(())
    }

    fn on_start_line(&mut self) -> Result<(), StatusSignal> {
        let version = self.parser.message().version();
        if version.major() > SERVER_PROTOCOL.major() {
            return Err(StatusSignal::new(
                StatusCode::HTTP_VERSION_NOT_SUPPORTED,
                "The server only supports HTTP/1.0 and HTTP/1.1.",
            ));
        }

        self.sanitize_uri()?;

        let mut response = Response::new();
        response.set_version(version.min(SERVER_PROTOCOL));
        response.headers_mut().set("server", SERVER_HEADER)?;
        self.response = Some(response);
        Ok(())
    }

    /// Canonicalizes the request target and fills in the listener authority
    /// for relative targets. A path changed by normalization is answered
    /// with a redirect to the canonical form.
    fn sanitize_uri(&mut self) -> Result<(), StatusSignal> {
        let message = self.parser.message_mut();

        let original = message.uri().path().to_string();
        message.uri_mut().normalize();
        if message.uri().path() != original {
            debug!(canonical = message.uri().path(), "path changed by normalization");
            return Err(StatusSignal::moved_permanently(message.uri().path()));
        }

        let scheme = message.uri().scheme().to_string();
        if scheme.is_empty() {
            let (scheme, host, port) = (self.scheme.clone(), self.host.clone(), self.port);
            self.parser.message_mut().uri_mut().set_authority(&scheme, &host, Some(port));
        } else if scheme != "http" && scheme != "https" {
            return Err(StatusSignal::bad_request("Invalid URL: wrong scheme"));
        }
        Ok(())
    }

    fn on_headers(&self) -> Result<(), StatusSignal> {
        let message = self.parser.message();
        if message.version() >= Version::HTTP_11 && !message.headers().contains("host") {
            return Err(StatusSignal::bad_request("Missing Host header"));
        }
        Ok(())
    }

    fn on_body(&mut self) -> Result<(), StatusSignal> {
        let message = self.parser.message();

        // data after the message without any framing to claim it
        if self.parser.buffered() > 0
            && !message.headers().contains("content-length")
            && !self.parser.is_chunked()
        {
            return Err(StatusSignal::new(
                StatusCode::LENGTH_REQUIRED,
                "Missing Content-Length header.",
            ));
        }

        if message.method().is_safe() && !message.body().is_empty() {
            return Err(StatusSignal::bad_request(format!(
                "A {} request is considered safe and MUST NOT contain a request body.",
                message.method()
            )));
        }

        self.check_h2c_upgrade()
    }

    /// RFC 7540 section 3.2: `Connection: Upgrade, HTTP2-Settings` plus
    /// `Upgrade: h2c` plus a non-empty `HTTP2-Settings` switches protocols.
    fn check_h2c_upgrade(&mut self) -> Result<(), StatusSignal> {
        let headers = self.parser.message().headers();

        let connection = headers.values("connection")?;
        let announces = |option: &str| connection.iter().any(|v| v.eq_ignore_ascii_case(option));
        if !announces("upgrade") || !announces("http2-settings") {
            return Ok(());
        }

        let Some(upgrade) = headers.element("upgrade")? else {
            return Ok(());
        };
        if !upgrade.value().eq_ignore_ascii_case("h2c") {
            return Ok(());
        }

        let settings = match headers.get("http2-settings") {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => return Ok(()),
        };

        debug!("switching connection to h2c");
        self.h2c = Some(H2cUpgrade { settings });
        if let Some(response) = self.response.as_mut() {
            response.headers_mut().set("upgrade", "h2c")?;
            response.headers_mut().set("connection", "Upgrade")?;
        }
        Err(StatusSignal::switching_protocols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ServerStateMachine {
        ServerStateMachine::new("http", "localhost", 8090)
    }

    fn parse_pair(input: &[u8]) -> (Request, Response) {
        let mut pairs = machine().parse(input).unwrap();
        assert_eq!(pairs.len(), 1);
        pairs.remove(0)
    }

    fn status_of(input: &[u8]) -> StatusCode {
        machine().parse(input).unwrap_err().status()
    }

    #[test]
    fn pairs_request_with_prepared_response() {
        let (request, response) = parse_pair(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n");
        assert_eq!(request.method(), &http::Method::GET);
        assert_eq!(request.uri().path(), "/");
        assert_eq!(request.version(), Version::HTTP_11);

        assert_eq!(response.version(), Version::HTTP_11);
        assert!(response.headers().get("server").unwrap().starts_with("httpkit/"));
    }

    #[test]
    fn response_protocol_is_negotiated_down() {
        let (_, response) = parse_pair(b"GET / HTTP/1.0\r\n\r\n");
        assert_eq!(response.version(), Version::HTTP_10);
    }

    #[test]
    fn relative_target_gets_listener_authority() {
        let (request, _) = parse_pair(b"GET /a HTTP/1.1\r\nHost: a\r\n\r\n");
        assert_eq!(request.uri().scheme(), "http");
        assert_eq!(request.uri().host(), "localhost");
        assert_eq!(request.uri().port(), Some(8090));
    }

    #[test]
    fn missing_host_on_http11_is_rejected() {
        assert_eq!(status_of(b"GET / HTTP/1.1\r\n\r\n"), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn http10_does_not_need_a_host() {
        let (request, _) = parse_pair(b"GET / HTTP/1.0\r\n\r\n");
        assert!(request.headers().get("host").is_none());
    }

    #[test]
    fn unsupported_major_version_is_rejected() {
        assert_eq!(
            status_of(b"GET / HTTP/2.0\r\nHost: a\r\n\r\n"),
            StatusCode::HTTP_VERSION_NOT_SUPPORTED
        );
    }

    #[test]
    fn non_canonical_path_redirects() {
        let signal = machine().parse(b"GET /a/../b HTTP/1.1\r\nHost: h\r\n\r\n").unwrap_err();
        assert_eq!(signal.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(signal.headers(), &[(http::header::LOCATION, "/b".to_string())]);
    }

    #[test]
    fn protocol_relative_target_is_rejected() {
        assert_eq!(status_of(b"GET // HTTP/1.1\r\nHost: h\r\n\r\n"), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn body_without_framing_requires_length() {
        assert_eq!(status_of(b"DELETE / HTTP/1.0\r\n\r\nHELLO"), StatusCode::LENGTH_REQUIRED);
    }

    #[test]
    fn safe_method_with_body_is_rejected() {
        assert_eq!(
            status_of(b"GET / HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nabc"),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unsafe_method_with_body_is_fine() {
        let (request, _) =
            parse_pair(b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nabc");
        assert_eq!(request.body().as_bytes(), b"abc");
    }

    #[test]
    fn over_long_request_line_is_rejected_while_incomplete() {
        let mut machine = machine();
        machine.set_max_uri_length(32);

        // no line terminator yet, so the parser is still in the start line
        let long = vec![b'a'; 64];
        let signal = machine.parse(&long).unwrap_err();
        assert_eq!(signal.status(), StatusCode::URI_TOO_LONG);
    }

    #[test]
    fn h2c_upgrade_switches_protocols() {
        let mut machine = machine();
        let signal = machine
            .parse(
                b"GET / HTTP/1.1\r\nHost: a\r\nConnection: Upgrade, HTTP2-Settings\r\nUpgrade: h2c\r\nHTTP2-Settings: AAMAAABkAAQAAP__\r\n\r\n",
            )
            .unwrap_err();

        assert_eq!(signal.status(), StatusCode::SWITCHING_PROTOCOLS);
        let upgrade = machine.upgrade().expect("typed successor state");
        assert_eq!(upgrade.settings(), "AAMAAABkAAQAAP__");
    }

    #[test]
    fn partial_h2c_negotiation_is_ignored() {
        // Upgrade header present but not announced in Connection
        let (request, _) =
            parse_pair(b"GET / HTTP/1.1\r\nHost: a\r\nUpgrade: h2c\r\nHTTP2-Settings: AAMA\r\n\r\n");
        assert_eq!(request.headers().get("upgrade"), Some("h2c"));
    }

    #[test]
    fn second_request_parses_after_the_first() {
        let mut machine = machine();
        let first = machine.parse(b"GET /1 HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        assert_eq!(first[0].0.uri().path(), "/1");

        let second = machine.parse(b"GET /2 HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        assert_eq!(second[0].0.uri().path(), "/2");
        // each request gets its own paired response
        assert!(second[0].1.headers().get("server").is_some());
    }
}
