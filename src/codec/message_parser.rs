//! Incremental HTTP request parser.
//!
//! This module provides the resumable state machine that turns an arbitrary
//! byte stream into validated [`Request`] messages. Bytes are fed in
//! whatever slices the transport produces; the parser buffers them and
//! drives phase transitions as far as the data allows.
//!
//! # Phases
//!
//! A message moves through `start line -> headers -> body -> trailers`
//! (the trailer phase only exists for chunked bodies). Each call to
//! [`MessageParser::step`] advances at most one phase and reports it as a
//! [`Step`], so callers can attach their own checks to phase boundaries.
//! [`Step::NeedMore`] means the current phase is still waiting for bytes
//! and the same call can be retried after feeding more.
//!
//! # Line terminator election
//!
//! The first line break in the stream fixes the terminator for the whole
//! message: `CRLF` when the first LF is preceded by CR, a bare `LF`
//! otherwise. Every later phase boundary uses the elected terminator only.
//!
//! # Body framing
//!
//! Per RFC 7230 section 3.3: a `Transfer-Encoding` whose final coding is
//! `chunked` (HTTP/1.1 and up) wins over `Content-Length`; any other
//! transfer coding is answered with `501`. A missing or empty
//! `Content-Length` means no body. Chunked bodies are de-framed into the
//! body sink, their trailers merged into the header section if the request
//! announced them in `Trailer`.
//!
//! Once the body completes, the parser rewinds the body, reconciles
//! `Content-Length` with the actual byte count, strips the final `chunked`
//! coding (and only that coding) from `Transfer-Encoding`, and resolves the
//! body's content coding and media type.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::buffer::ByteBuffer;
use crate::ensure;
use crate::header::fields::CodingResolution;
use crate::header::{FieldKind, Headers};
use crate::protocol::{HttpError, ParseError, Request, StatusSignal, Version};
use crate::utils::latin1_to_string;

const CRLF: &[u8] = b"\r\n";
const LF: &[u8] = b"\n";

/// The observable outcome of one parser step.
#[derive(Debug)]
pub enum Step {
    /// The current phase cannot progress without more bytes.
    NeedMore,
    /// The request line is parsed; method, target and version are set.
    StartLine,
    /// The header section is parsed.
    Headers,
    /// The body (and any trailers) is complete but not yet finalized.
    Body,
    /// The message is finalized and handed out; the parser has reset.
    Message(Request),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    StartLine,
    Headers,
    Body,
    Trailers,
    Finalize,
}

/// A resumable parser for one connection's request stream.
#[derive(Debug)]
pub struct MessageParser {
    buffer: ByteBuffer,
    line_end: &'static [u8],
    message: Request,
    phase: Phase,
    chunked: bool,
    remaining: Option<u64>,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self {
            buffer: ByteBuffer::new(),
            line_end: CRLF,
            message: Request::new(),
            phase: Phase::StartLine,
            chunked: false,
            remaining: None,
        }
    }
}

impl MessageParser {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a slice of the request stream to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Number of bytes buffered but not yet consumed by any phase.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True while the request line has not completed yet.
    pub fn is_parsing_start_line(&self) -> bool {
        self.phase == Phase::StartLine
    }

    /// True once chunked framing has been selected for the current message.
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// The message currently being parsed.
    pub fn message(&self) -> &Request {
        &self.message
    }

    /// Mutable access for layers that decorate the in-flight message.
    pub fn message_mut(&mut self) -> &mut Request {
        &mut self.message
    }

    /// Feeds `data` and drives the machine until it stalls or yields.
    ///
    /// At most one message is yielded per call; any residue stays buffered
    /// for the next call. Pipelined requests are therefore consumed
    /// sequentially, one `parse` call each.
    pub fn parse(&mut self, data: &[u8]) -> Result<Vec<Request>, StatusSignal> {
        self.feed(data);
        let mut messages = Vec::new();
        loop {
            match self.step()? {
                Step::NeedMore => break,
                Step::Message(message) => {
                    messages.push(message);
                    break;
                }
                _ => {}
            }
        }
        Ok(messages)
    }

    /// Advances the state machine by at most one phase.
    pub fn step(&mut self) -> Result<Step, StatusSignal> {
        match self.phase {
            Phase::StartLine => self.step_start_line(),
            Phase::Headers => self.step_headers(),
            Phase::Body => self.step_body(),
            Phase::Trailers => self.step_trailers(),
            Phase::Finalize => self.finalize(),
        }
    }

    fn step_start_line(&mut self) -> Result<Step, StatusSignal> {
        // the first line break elects the terminator for the whole message
        let Some(lf) = self.buffer.find(LF) else {
            return Ok(Step::NeedMore);
        };
        self.line_end = if lf > 0 && self.buffer.as_slice()[lf - 1] == b'\r' { CRLF } else { LF };

        let Some(line) = self.buffer.split_once(self.line_end) else {
            return Ok(Step::NeedMore);
        };
        self.message.parse_request_line(&line)?;

        trace!(method = %self.message.method(), target = %self.message.uri(), "parsed request line");
        self.phase = Phase::Headers;
        Ok(Step::StartLine)
    }

    fn step_headers(&mut self) -> Result<Step, StatusSignal> {
        if self.buffer.starts_with(self.line_end) {
            // empty header section
            self.buffer.advance(self.line_end.len());
        } else {
            let Some(blob) = self.buffer.split_once(self.header_end()) else {
                return Ok(Step::NeedMore);
            };
            let line_end = self.line_end;
            self.message.headers_mut().parse(&blob, line_end)?;
        }

        trace!(fields = self.message.headers().len(), "parsed header section");
        self.phase = Phase::Body;
        Ok(Step::Headers)
    }

    fn step_body(&mut self) -> Result<Step, StatusSignal> {
        if self.remaining.is_none() && !self.chunked {
            self.determine_message_length()?;
        }

        if self.chunked { self.step_chunked() } else { self.step_sized() }
    }

    /// RFC 7230 section 3.3 body framing.
    fn determine_message_length(&mut self) -> Result<(), StatusSignal> {
        let headers = self.message.headers();

        let te = headers.get("transfer-encoding");
        if let Some(value) = te
            && self.message.version() >= Version::HTTP_11
        {
            let final_coding = value.rsplit(',').next().map(str::trim).unwrap_or("");
            if final_coding.eq_ignore_ascii_case("chunked") {
                self.chunked = true;
                return Ok(());
            }
            return Err(StatusSignal::not_implemented(format!(
                "Unknown HTTP/1.1 Transfer-Encoding: {value}"
            )));
        }

        let raw = headers.get("content-length").unwrap_or("0").trim();
        let raw = if raw.is_empty() { "0" } else { raw };
        let length = if raw.bytes().all(|b| b.is_ascii_digit()) { raw.parse::<u64>().ok() } else { None };
        match length {
            Some(length) => {
                self.remaining = Some(length);
                Ok(())
            }
            None => Err(StatusSignal::bad_request("Invalid Content-Length header.")),
        }
    }

    fn step_sized(&mut self) -> Result<Step, StatusSignal> {
        let mut remaining = self.remaining.unwrap_or(0);

        if remaining > 0 {
            if self.buffer.is_empty() {
                return Ok(Step::NeedMore);
            }
            let n = remaining.min(self.buffer.len() as u64) as usize;
            let data = self.buffer.take(n);
            self.message.body_mut().write(&data);

            remaining -= n as u64;
            self.remaining = Some(remaining);
            if remaining > 0 {
                return Ok(Step::NeedMore);
            }
        }

        self.phase = Phase::Finalize;
        Ok(Step::Body)
    }

    fn step_chunked(&mut self) -> Result<Step, StatusSignal> {
        loop {
            let Some(line_at) = self.buffer.find(self.line_end) else {
                return Ok(Step::NeedMore);
            };
            let size = parse_chunk_size(&self.buffer.as_slice()[..line_at])?;

            let after_line = line_at + self.line_end.len();
            let available = (self.buffer.len() - after_line) as u64;
            if available < size.saturating_add(self.line_end.len() as u64) {
                // leave the size line buffered so the next call re-reads it
                return Ok(Step::NeedMore);
            }

            self.buffer.advance(after_line);

            if size == 0 {
                self.phase = Phase::Trailers;
                return self.step_trailers();
            }

            let data = self.buffer.take(size as usize);
            self.message.body_mut().write(&data);
            trace!(len = data.len(), "read chunk");

            if !self.buffer.starts_with(self.line_end) {
                let seen = &self.buffer.as_slice()[..self.line_end.len().min(self.buffer.len())];
                return Err(ParseError::invalid_body(format!(
                    "Invalid chunk terminator: {:?}",
                    latin1_to_string(seen)
                ))
                .into());
            }
            self.buffer.advance(self.line_end.len());
        }
    }

    fn step_trailers(&mut self) -> Result<Step, StatusSignal> {
        if self.buffer.starts_with(self.line_end) {
            // no trailers
            self.buffer.advance(self.line_end.len());
            self.phase = Phase::Finalize;
            return Ok(Step::Body);
        }

        let Some(blob) = self.buffer.split_once(self.header_end()) else {
            return Ok(Step::NeedMore);
        };

        let mut trailers = Headers::new();
        trailers
            .parse(&blob, self.line_end)
            .map_err(|e| StatusSignal::bad_request(format!("Invalid trailers: {e}")))?;
        self.merge_trailers(trailers)?;

        self.phase = Phase::Finalize;
        Ok(Step::Body)
    }

    /// Only trailer names announced in the `Trailer` header are admitted;
    /// admitted values append to the existing header section.
    fn merge_trailers(&mut self, mut trailers: Headers) -> Result<(), StatusSignal> {
        for name in self.message.headers().values("trailer")? {
            if let Some(value) = trailers.remove(&name) {
                self.message.headers_mut().append(&name, &value)?;
            }
        }

        if !trailers.is_empty() {
            let untold: Vec<&str> = trailers.names().map(|n| n.as_str()).collect();
            return Err(StatusSignal::bad_request(format!(
                "untold trailers: {:?}",
                untold.join(", ")
            )));
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<Step, StatusSignal> {
        self.message.body_mut().seek(0);

        let length = self.message.body().len().to_string();
        self.message.headers_mut().set("content-length", &length)?;

        if self.chunked {
            self.strip_chunked_coding()?;
        }
        self.resolve_content_encoding()?;
        self.resolve_content_type()?;

        let message = std::mem::take(&mut self.message);
        self.reset();
        trace!("message complete");
        Ok(Step::Message(message))
    }

    /// Removes the final `chunked` coding that framed this message while
    /// preserving any other transfer codings the sender applied.
    fn strip_chunked_coding(&mut self) -> Result<(), StatusSignal> {
        let Some(value) = self.message.headers().get("transfer-encoding") else {
            return Ok(());
        };

        let mut codings: Vec<&str> = value.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if codings.last().is_some_and(|c| c.eq_ignore_ascii_case("chunked")) {
            codings.pop();
        }

        if codings.is_empty() {
            self.message.headers_mut().remove("transfer-encoding");
        } else {
            let joined = codings.join(", ");
            self.message.headers_mut().set("transfer-encoding", &joined)?;
        }
        Ok(())
    }

    fn resolve_content_encoding(&mut self) -> Result<(), StatusSignal> {
        if !self.message.headers().contains("content-encoding") {
            return Ok(());
        }

        let element = self
            .message
            .headers()
            .element("content-encoding")
            .map_err(StatusSignal::not_implemented)?;
        let Some(element) = element else {
            return Ok(());
        };

        match FieldKind::ContentEncoding.coding(&element) {
            Some(CodingResolution::Implemented(coding)) => {
                self.message.body_mut().set_content_encoding(Some(coding));
                Ok(())
            }
            _ => Err(StatusSignal::not_implemented(format!(
                "Unsupported Content-Encoding: {:?}",
                element.value()
            ))),
        }
    }

    fn resolve_content_type(&mut self) -> Result<(), StatusSignal> {
        // element parsing enforces the boundary grammar; the media-type
        // lookup itself is soft
        if self.message.headers().element("content-type")?.is_some() {
            let mimetype =
                self.message.headers().get("content-type").and_then(|v| v.parse::<mime::Mime>().ok());
            self.message.body_mut().set_mimetype(mimetype);
        }
        Ok(())
    }

    fn header_end(&self) -> &'static [u8] {
        if self.line_end == CRLF { b"\r\n\r\n" } else { b"\n\n" }
    }

    fn reset(&mut self) {
        self.line_end = CRLF;
        self.phase = Phase::StartLine;
        self.chunked = false;
        self.remaining = None;
    }
}

/// Parses the hexadecimal chunk size, ignoring any `;`-separated extension.
fn parse_chunk_size(line: &[u8]) -> Result<u64, StatusSignal> {
    let line = latin1_to_string(line);
    let token = line.split(';').next().unwrap_or("").trim();

    ensure!(
        !token.is_empty(),
        StatusSignal::bad_request(format!("Invalid chunk size: {token:?}"))
    );

    let mut size: u64 = 0;
    for b in token.bytes() {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => return Err(StatusSignal::bad_request(format!("Invalid chunk size: {token:?}"))),
        };
        size = size
            .checked_mul(16)
            .and_then(|s| s.checked_add(u64::from(digit)))
            .ok_or_else(|| StatusSignal::bad_request(format!("Invalid chunk size: {token:?}")))?;
    }
    Ok(size)
}

/// Frame-oriented entry point: drains `src` and yields at most one request
/// per call, like any other [`Decoder`].
impl Decoder for MessageParser {
    type Item = Request;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let data = src.split_to(src.len());
            self.feed(&data);
        }

        loop {
            match self.step()? {
                Step::NeedMore => return Ok(None),
                Step::Message(message) => return Ok(Some(message)),
                _ => {}
            }
        }
    }
}
