//! Response preparation and serialization.
//!
//! [`ComposedResponse`] is the dual of the parser: it finalizes a response's
//! headers against the request it answers and serializes the whole message.
//! Finalization fills in what the status dictates (`Content-Length` unless
//! chunked, `Date` always, the `Allow` default for `405`), removes what the
//! status forbids, clears the body where none is permitted, and settles the
//! connection persistence header.

use std::io::Write;
use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use tracing::trace;

use crate::protocol::{Request, Response, SendError, Version, status};

/// A response coupled to the request it answers, ready for transmission.
#[derive(Debug)]
pub struct ComposedResponse<'a> {
    response: &'a mut Response,
    request: Option<&'a Request>,
    close: Option<bool>,
}

impl<'a> ComposedResponse<'a> {
    pub fn new(response: &'a mut Response, request: Option<&'a Request>) -> Self {
        Self { response, request, close: None }
    }

    /// Overrides the computed connection persistence.
    ///
    /// Without an override the connection is closed for `413`, for an
    /// explicit `Connection: close`, and for protocols before HTTP/1.1.
    /// Forcing persistence on an HTTP/1.0 response writes the
    /// `Connection: keep-alive` the older protocol needs.
    pub fn set_close(&mut self, close: bool) {
        self.close = Some(close);
    }

    /// Finalizes the headers and serializes the response.
    ///
    /// Header validation failures fail here, synchronously, before any byte
    /// is produced.
    pub fn prepare(mut self) -> Result<Bytes, SendError> {
        self.finalize()?;
        self.response.headers().validate().map_err(SendError::invalid_header)?;
        Ok(self.serialize())
    }

    fn finalize(&mut self) -> Result<(), SendError> {
        let status = self.response.status();

        if !status::allows_body(status) {
            self.response.body_mut().clear();
        }

        let chunked = is_chunked(self.response.headers().get("transfer-encoding"));
        if !chunked {
            let length = self.response.body().len().to_string();
            self.set_header("content-length", &length)?;
        }

        let date = httpdate::fmt_http_date(SystemTime::now());
        self.set_header("date", &date)?;

        for name in status::headers_to_remove(status) {
            self.response.headers_mut().remove(name);
        }

        if status == StatusCode::METHOD_NOT_ALLOWED && !self.response.headers().contains("allow") {
            self.set_header("allow", "GET, HEAD")?;
        }

        let close = self.close.unwrap_or_else(|| self.wants_close());
        self.apply_connection(close)?;

        let mimetype = self.response.body().mimetype().map(|m| m.to_string());
        if !self.response.headers().contains("content-type") && !self.response.body().is_empty() {
            if let Some(mimetype) = mimetype {
                self.set_header("content-type", &mimetype)?;
            }
        }

        // HEAD keeps the entity headers describing the body it elides
        if self.request.is_some_and(|r| r.method() == &http::Method::HEAD) {
            self.response.body_mut().clear();
        }

        Ok(())
    }

    fn wants_close(&self) -> bool {
        self.response.status() == StatusCode::PAYLOAD_TOO_LARGE
            || self.response.headers().get("connection") == Some("close")
            || self.response.version() < Version::HTTP_11
    }

    fn apply_connection(&mut self, close: bool) -> Result<(), SendError> {
        let persistent_protocol = self.response.version() >= Version::HTTP_11;
        if close && persistent_protocol {
            self.set_header("connection", "close")
        } else if !close && !persistent_protocol {
            self.set_header("connection", "keep-alive")
        } else {
            self.response.headers_mut().remove("connection");
            Ok(())
        }
    }

    fn serialize(&self) -> Bytes {
        let status_line = self.response.status_line();
        let headers = self.response.headers().compose();
        let body = self.response.body();

        let mut dst =
            BytesMut::with_capacity(status_line.len() + headers.len() + body.len() + 16);
        dst.extend_from_slice(status_line.as_bytes());
        dst.extend_from_slice(&headers);

        let suppress_body = !status::allows_body(self.response.status())
            || self.request.is_some_and(|r| r.method() == &http::Method::HEAD);
        if !suppress_body {
            if is_chunked(self.response.headers().get("transfer-encoding")) {
                if !body.is_empty() {
                    // size line, data, terminator, then the final zero chunk
                    let _ = write!(FastWrite(&mut dst), "{:X}\r\n", body.len());
                    dst.extend_from_slice(body.as_bytes());
                    dst.extend_from_slice(b"\r\n");
                }
                dst.extend_from_slice(b"0\r\n\r\n");
            } else {
                dst.extend_from_slice(body.as_bytes());
            }
        }

        trace!(len = dst.len(), "composed response");
        dst.freeze()
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), SendError> {
        self.response.headers_mut().set(name, value).map_err(SendError::invalid_header)
    }
}

/// True when the final transfer coding is `chunked`.
fn is_chunked(header_value: Option<&str>) -> bool {
    header_value
        .and_then(|value| value.rsplit(',').next())
        .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
}

/// Fast writer for formatting into a `BytesMut` without an intermediate
/// allocation.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
