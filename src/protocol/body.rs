//! Message body: a seekable byte sink with content metadata.
//!
//! The parser appends wire bytes as they arrive (already dechunked for
//! chunked messages) and rewinds the body once the message completes.
//! Decoding a content coding is deliberately left to consumers; the body
//! keeps the bytes exactly as received and records *how* they are encoded.

use std::io::{self, Read};

use bytes::{Bytes, BytesMut};
use mime::Mime;

use crate::coding::ContentCoding;
use crate::protocol::ParseError;

/// A request or response payload.
#[derive(Debug, Default)]
pub struct Body {
    data: BytesMut,
    pos: usize,
    content_encoding: Option<ContentCoding>,
    mimetype: Option<Mime>,
}

impl Body {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends bytes at the end, leaving the read position alone.
    pub fn write(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Replaces the content, rewinding to the start.
    pub fn set<B: AsRef<[u8]>>(&mut self, data: B) {
        self.data.clear();
        self.data.extend_from_slice(data.as_ref());
        self.pos = 0;
    }

    /// Total number of bytes written.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Moves the read position; clamped to the end of the data.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// The full content regardless of the read position.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Drops all content and metadata positions.
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    /// The coding the payload arrived in, resolved from `Content-Encoding`.
    pub fn content_encoding(&self) -> Option<ContentCoding> {
        self.content_encoding
    }

    pub fn set_content_encoding(&mut self, coding: Option<ContentCoding>) {
        self.content_encoding = coding;
    }

    /// The media type resolved from `Content-Type`, if it parsed.
    pub fn mimetype(&self) -> Option<&Mime> {
        self.mimetype.as_ref()
    }

    pub fn set_mimetype(&mut self, mimetype: Option<Mime>) {
        self.mimetype = mimetype;
    }

    /// The content with its content coding undone.
    ///
    /// Returns the raw bytes when no coding is recorded.
    pub fn decoded(&self) -> Result<Vec<u8>, ParseError> {
        match self.content_encoding {
            Some(coding) => coding.decode(&self.data),
            None => Ok(self.data.to_vec()),
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_rewind_then_read() {
        let mut body = Body::new();
        body.write(b"Wiki");
        body.write(b"pedia");
        assert_eq!(body.len(), 9);

        body.seek(0);
        let mut out = String::new();
        body.read_to_string(&mut out).unwrap();
        assert_eq!(out, "Wikipedia");

        // a second read picks up where the first stopped
        let mut out = Vec::new();
        body.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn seek_clamps_to_len() {
        let mut body = Body::new();
        body.write(b"abc");
        body.seek(100);
        assert_eq!(body.position(), 3);
    }

    #[test]
    fn decoded_applies_content_coding() {
        let packed = crate::coding::tests::gzipped(b"hello body");
        let mut body = Body::new();
        body.write(&packed);
        body.set_content_encoding(Some(ContentCoding::Gzip));
        assert_eq!(body.decoded().unwrap(), b"hello body");
    }

    #[test]
    fn decoded_without_coding_is_identity() {
        let mut body = Body::new();
        body.write(b"plain");
        assert_eq!(body.decoded().unwrap(), b"plain");
    }
}
