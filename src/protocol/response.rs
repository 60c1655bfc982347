//! HTTP response message.

use http::StatusCode;

use crate::header::Headers;
use crate::protocol::{Body, StatusSignal, Version, status};

/// An HTTP response under construction.
///
/// The server state machine creates one alongside every request; the
/// transport fills it in and runs it through response preparation before
/// sending.
#[derive(Debug)]
pub struct Response {
    version: Version,
    status: StatusCode,
    headers: Headers,
    body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            version: Version::HTTP_11,
            status: StatusCode::OK,
            headers: Headers::new(),
            body: Body::new(),
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds the reply for a status the state machine signaled.
    ///
    /// Headers the signal requires (a `Location`, the upgrade pair) are
    /// copied over; statuses that permit one get the reason as a plain-text
    /// body.
    pub fn from_signal(signal: &StatusSignal) -> Self {
        let mut response = Self::new();
        response.status = signal.status();
        for (name, value) in signal.headers() {
            // signal headers carry pre-validated names
            let _ = response.headers.set(name.as_str(), value);
        }
        if status::allows_body(signal.status()) && !signal.reason().is_empty() {
            response.body.set(signal.reason());
            response.body.set_mimetype(Some(mime::TEXT_PLAIN));
        }
        response
    }

    /// The status line, terminated like every other line.
    pub fn status_line(&self) -> String {
        format!("{} {} {}\r\n", self.version, self.status.as_str(), status::reason_phrase(self.status))
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_carries_reason_phrase() {
        let mut response = Response::new();
        assert_eq!(response.status_line(), "HTTP/1.1 200 OK\r\n");

        response.set_status(StatusCode::NOT_FOUND);
        response.set_version(Version::HTTP_10);
        assert_eq!(response.status_line(), "HTTP/1.0 404 Not Found\r\n");
    }

    #[test]
    fn from_signal_copies_status_and_headers() {
        let response = Response::from_signal(&StatusSignal::moved_permanently("/b"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers().get("location"), Some("/b"));
    }

    #[test]
    fn from_signal_respects_bodiless_statuses() {
        let response = Response::from_signal(&StatusSignal::switching_protocols());
        assert!(response.body().is_empty());
        assert_eq!(response.headers().get("upgrade"), Some("h2c"));
        assert_eq!(response.headers().get("connection"), Some("Upgrade"));
    }
}
