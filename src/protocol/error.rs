//! Error types for HTTP protocol handling
//!
//! This module provides error types for handling various error conditions
//! that may occur during HTTP request parsing and response composition.
//!
//! # Error Types
//!
//! - [`HttpError`]: The top-level error type that wraps all other error types
//!   - [`ParseError`]: Errors that occur during request parsing
//!   - [`SendError`]: Errors that occur during response composition
//! - [`StatusSignal`]: The final HTTP status carried out of the state
//!   machine; the transport catches it and composes the reply
//!
//! Parse failures form a small closed taxonomy (bad start line, bad
//! request-target, bad header field, bad body framing, unimplemented
//! feature). The state machine converts them into a [`StatusSignal`] via the
//! `From` impl: unimplemented features map to `501 Not Implemented`,
//! everything else to `400 Bad Request`.

use std::io;

use http::{HeaderName, StatusCode};
use thiserror::Error;

/// The top-level error type for HTTP operations
#[derive(Debug, Error)]
pub enum HttpError {
    /// Errors that occur during request parsing
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    /// Errors that occur during response composition
    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    /// A final status raised by the state machine
    #[error("http status: {signal}")]
    Status {
        #[from]
        signal: StatusSignal,
    },
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        Self::RequestError { source: ParseError::io(e) }
    }
}

/// Errors that occur during HTTP request parsing
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed request line
    #[error("invalid line: {reason}")]
    InvalidLine { reason: String },

    /// Invalid request-target
    #[error("invalid uri: {reason}")]
    InvalidUri { reason: String },

    /// Invalid header field name, element syntax or parameter value
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    /// Invalid body framing
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    /// Feature the peer asked for but this implementation does not provide
    #[error("not implemented: {reason}")]
    NotImplemented { reason: String },

    /// I/O error during parsing
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    /// Creates a new InvalidLine error
    pub fn invalid_line<S: ToString>(reason: S) -> Self {
        Self::InvalidLine { reason: reason.to_string() }
    }

    /// Creates a new InvalidUri error
    pub fn invalid_uri<S: ToString>(reason: S) -> Self {
        Self::InvalidUri { reason: reason.to_string() }
    }

    /// Creates a new InvalidHeader error
    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    /// Creates a new InvalidBody error
    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    /// Creates a new NotImplemented error
    pub fn not_implemented<S: ToString>(reason: S) -> Self {
        Self::NotImplemented { reason: reason.to_string() }
    }

    /// Creates a new I/O error
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors that occur during HTTP response composition
#[derive(Error, Debug)]
pub enum SendError {
    /// A header failed validation at compose time
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl SendError {
    /// Creates a new InvalidHeader error
    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }
}

/// The final status of a request, thrown out of the state machine.
///
/// Parsing never produces a half-built message: any violation ends with a
/// `StatusSignal` naming the status the transport should answer with,
/// together with any headers that status requires (a `Location` for `301`,
/// the `Upgrade` pair for `101`).
#[derive(Debug, Error)]
#[error("{status} {reason}")]
pub struct StatusSignal {
    status: StatusCode,
    reason: String,
    headers: Vec<(HeaderName, String)>,
}

impl StatusSignal {
    /// Creates a signal for `status` with a human readable reason.
    pub fn new<S: ToString>(status: StatusCode, reason: S) -> Self {
        Self { status, reason: reason.to_string(), headers: Vec::new() }
    }

    /// Attaches a header the response for this status must carry.
    pub fn with_header<S: ToString>(mut self, name: HeaderName, value: S) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    /// Creates a `400 Bad Request` signal.
    pub fn bad_request<S: ToString>(reason: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, reason)
    }

    /// Creates a `501 Not Implemented` signal.
    pub fn not_implemented<S: ToString>(reason: S) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, reason)
    }

    /// Creates a `301 Moved Permanently` signal pointing at the canonical
    /// form of the requested path.
    pub fn moved_permanently(location: &str) -> Self {
        Self::new(StatusCode::MOVED_PERMANENTLY, "Moved Permanently")
            .with_header(http::header::LOCATION, location)
    }

    /// Creates a `101 Switching Protocols` signal for the h2c upgrade.
    pub fn switching_protocols() -> Self {
        Self::new(StatusCode::SWITCHING_PROTOCOLS, "Switching Protocols")
            .with_header(http::header::UPGRADE, "h2c")
            .with_header(http::header::CONNECTION, "Upgrade")
    }

    /// The status code to answer with.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Human readable description of what went wrong.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Headers the response must carry along with the status.
    pub fn headers(&self) -> &[(HeaderName, String)] {
        &self.headers
    }
}

impl From<ParseError> for StatusSignal {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::NotImplemented { .. } => Self::not_implemented(e),
            _ => Self::bad_request(e),
        }
    }
}
