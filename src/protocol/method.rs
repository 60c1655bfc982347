//! HTTP request method with the RFC 7231 classification properties.

use std::fmt;

use crate::protocol::ParseError;

/// An HTTP request method.
///
/// Wraps [`http::Method`] and adds the three properties the server state
/// machine keys its checks off: whether the method is *safe*, whether it is
/// *idempotent* and whether a request body is allowed at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Method(http::Method);

impl Method {
    pub const GET: Method = Method(http::Method::GET);
    pub const HEAD: Method = Method(http::Method::HEAD);
    pub const POST: Method = Method(http::Method::POST);
    pub const PUT: Method = Method(http::Method::PUT);
    pub const DELETE: Method = Method(http::Method::DELETE);
    pub const OPTIONS: Method = Method(http::Method::OPTIONS);
    pub const TRACE: Method = Method(http::Method::TRACE);

    /// Parses the method token of a request line.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        http::Method::from_bytes(token.as_bytes())
            .map(Method)
            .map_err(|_| ParseError::invalid_line(format!("invalid method: {token:?}")))
    }

    /// Safe methods have no side effects on the server.
    pub fn is_safe(&self) -> bool {
        matches!(self.0, http::Method::GET | http::Method::HEAD | http::Method::OPTIONS | http::Method::TRACE)
    }

    /// Idempotent methods can be repeated with the same effect as a single
    /// invocation.
    pub fn is_idempotent(&self) -> bool {
        self.is_safe() || matches!(self.0, http::Method::PUT | http::Method::DELETE)
    }

    /// Whether a request with this method may carry a body.
    pub fn allows_body(&self) -> bool {
        !matches!(
            self.0,
            http::Method::GET
                | http::Method::HEAD
                | http::Method::DELETE
                | http::Method::OPTIONS
                | http::Method::TRACE
                | http::Method::CONNECT
        )
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<http::Method> for Method {
    fn as_ref(&self) -> &http::Method {
        &self.0
    }
}

impl From<http::Method> for Method {
    fn from(method: http::Method) -> Self {
        Self(method)
    }
}

impl PartialEq<http::Method> for Method {
    fn eq(&self, other: &http::Method) -> bool {
        &self.0 == other
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
