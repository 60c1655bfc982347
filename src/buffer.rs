//! Growable byte accumulator used by the incremental parser.
//!
//! The parser receives arbitrary slices of the request stream and needs to
//! carve delimited segments (lines, header blocks, chunk payloads) out of
//! whatever has arrived so far. [`ByteBuffer`] wraps a [`BytesMut`] with the
//! small set of operations the state machine needs, most importantly
//! [`ByteBuffer::split_once`], which distinguishes "delimiter not received
//! yet" from "delimiter found with an empty head".

use bytes::{Buf, Bytes, BytesMut};

/// An append-only byte buffer with split-on-delimiter.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    inner: BytesMut,
}

impl ByteBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Appends `data` to the end of the buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.inner.extend_from_slice(data);
    }

    /// Returns the buffered bytes without consuming them.
    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    /// Returns true if the buffered bytes start with `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.inner.starts_with(prefix)
    }

    /// Discards the first `n` buffered bytes.
    pub fn advance(&mut self, n: usize) {
        self.inner.advance(n);
    }

    /// Removes and returns the first `n` buffered bytes.
    pub fn take(&mut self, n: usize) -> Bytes {
        self.inner.split_to(n).freeze()
    }

    /// Returns the offset of the first occurrence of `delim`, if present.
    pub fn find(&self, delim: &[u8]) -> Option<usize> {
        find(&self.inner, delim)
    }

    /// Splits off everything up to the first occurrence of `delim`.
    ///
    /// The head is returned without the delimiter; the delimiter itself is
    /// consumed and the tail stays buffered. Returns `None` when the
    /// delimiter has not been received yet, which is distinct from
    /// `Some(empty)` for a delimiter at offset zero.
    pub fn split_once(&mut self, delim: &[u8]) -> Option<Bytes> {
        let at = self.find(delim)?;
        let head = self.inner.split_to(at).freeze();
        self.inner.advance(delim.len());
        Some(head)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_once_consumes_head_and_delimiter() {
        let mut buf = ByteBuffer::new();
        buf.extend(b"GET / HTTP/1.1\r\nHost: a\r\n");

        let head = buf.split_once(b"\r\n").unwrap();
        assert_eq!(&head[..], b"GET / HTTP/1.1");
        assert_eq!(buf.as_slice(), b"Host: a\r\n");
    }

    #[test]
    fn split_once_absent_leaves_buffer_untouched() {
        let mut buf = ByteBuffer::new();
        buf.extend(b"partial line without terminator");

        assert!(buf.split_once(b"\r\n").is_none());
        assert_eq!(buf.len(), 31);
    }

    #[test]
    fn split_once_empty_head_is_not_absent() {
        let mut buf = ByteBuffer::new();
        buf.extend(b"\r\nrest");

        let head = buf.split_once(b"\r\n").unwrap();
        assert!(head.is_empty());
        assert_eq!(buf.as_slice(), b"rest");
    }

    #[test]
    fn resumes_across_appends() {
        let mut buf = ByteBuffer::new();
        buf.extend(b"chunk\r");
        assert!(buf.split_once(b"\r\n").is_none());

        buf.extend(b"\ntail");
        assert_eq!(&buf.split_once(b"\r\n").unwrap()[..], b"chunk");
        assert_eq!(buf.as_slice(), b"tail");
    }
}
