//! Case-insensitive multi-valued header store and typed field access.
//!
//! [`Headers`] keeps fields in insertion order with their combined values.
//! Repeated fields are joined with `", "` on append, the way intermediaries
//! are allowed to combine them; `Set-Cookie` is the documented exception and
//! stays a list. Raw values are stored as received (decoded as ISO-8859-1),
//! canonicalization happens per field through the element kinds:
//!
//! - [`Headers::elements`] splits, parses, sanitizes and orders a field's
//!   elements through its registered [`fields::FieldKind`]
//! - [`Headers::element`] treats the whole value as a single element
//!
//! Parsing handles obs-fold continuation lines (a following line starting
//! with SP or HT belongs to the previous field, losing exactly one leading
//! whitespace byte) and rejects field names containing control bytes,
//! separators or bytes above 0x7F.

pub mod element;
pub mod fields;
pub mod host;

pub use element::HeaderElement;
pub use fields::FieldKind;
pub use host::{HostInfo, HostKind};

use bytes::{Bytes, BytesMut};
use http::HeaderName;
use http::header::SET_COOKIE;

use crate::ensure;
use crate::protocol::ParseError;
use crate::utils::{latin1_to_string, put_latin1};

/// An ordered, case-insensitive mapping from field name to field value.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    name: HeaderName,
    value: String,
}

impl Headers {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of distinct field lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a field with this name exists (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The combined value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).map(|at| self.entries[at].value.as_str())
    }

    /// All stored values for a field. Only `Set-Cookie` can have more than
    /// one; every other field is combined on insertion.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|e| e.name.as_str() == name)
            .map(|e| e.value.as_str())
            .collect()
    }

    /// Replaces the value of a field, inserting it if absent.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        let name = canonical(name)?;
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value.to_string(),
            None => self.entries.push(Entry { name, value: value.to_string() }),
        }
        Ok(())
    }

    /// Appends a value to a field, joining with `", "` when the field
    /// already has a non-empty value.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        let name = canonical(name)?;
        if name == SET_COOKIE {
            self.entries.push(Entry { name, value: value.to_string() });
            return Ok(());
        }
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) if !entry.value.is_empty() => {
                entry.value.push_str(", ");
                entry.value.push_str(value);
            }
            Some(entry) => entry.value = value.to_string(),
            None => self.entries.push(Entry { name, value: value.to_string() }),
        }
        Ok(())
    }

    /// Appends a value carrying `;name=value` parameters, formatted and
    /// quoted the same way elements print themselves.
    pub fn append_with_params(
        &mut self,
        name: &str,
        value: &str,
        params: &[(&str, Option<&str>)],
    ) -> Result<(), ParseError> {
        let mut combined = value.to_string();
        for (param, raw) in params {
            combined.push_str("; ");
            combined.push_str(&element::format_param(param, *raw));
        }
        self.append(name, &combined)
    }

    /// Removes a field, returning its (first) value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let at = self.find(name)?;
        Some(self.entries.remove(at).value)
    }

    /// The field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &HeaderName> {
        self.entries.iter().map(|e| &e.name)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &str)> {
        self.entries.iter().map(|e| (&e.name, e.value.as_str()))
    }

    /// The sorted, sanitized elements of a field.
    ///
    /// Returns an empty list for a missing or empty field. Ordering applies
    /// to the Accept family (weight descending, specificity as tiebreaker);
    /// other fields keep their wire order.
    pub fn elements(&self, name: &str) -> Result<Vec<HeaderElement>, ParseError> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        if value.is_empty() {
            return Ok(Vec::new());
        }

        let kind = fields::kind_of(&name.to_ascii_lowercase());
        let mut elements = Vec::new();
        for raw in element::split_elements(value) {
            elements.push(kind.parse(raw)?);
        }
        kind.sort(&mut elements);
        Ok(elements)
    }

    /// Parses a field as a single element, comma and all.
    pub fn element(&self, name: &str) -> Result<Option<HeaderElement>, ParseError> {
        match self.get(name) {
            Some(value) => {
                let kind = fields::kind_of(&name.to_ascii_lowercase());
                kind.parse(value).map(Some)
            }
            None => Ok(None),
        }
    }

    /// The element values of a field, in element order.
    pub fn values(&self, name: &str) -> Result<Vec<String>, ParseError> {
        Ok(self.elements(name)?.into_iter().map(|e| e.value().to_string()).collect())
    }

    /// Dry-runs element parsing on every field.
    pub fn validate(&self) -> Result<(), ParseError> {
        for entry in &self.entries {
            self.elements(entry.name.as_str())?;
        }
        Ok(())
    }

    /// Parses a header section.
    ///
    /// `blob` is the section without its trailing blank line; `line_end` is
    /// the terminator the enclosing message elected. Continuation lines are
    /// folded into the previous field value.
    pub fn parse(&mut self, blob: &[u8], line_end: &[u8]) -> Result<(), ParseError> {
        let mut pending: Option<(String, String)> = None;
        let mut parsed: Vec<(String, String)> = Vec::new();

        for line in split_lines(blob, line_end) {
            ensure!(
                !has_stray_line_break(line, line_end),
                ParseError::invalid_header("line break inside header line")
            );

            if line.first().is_some_and(|b| *b == b' ' || *b == b'\t') {
                // obs-fold: strip the fold byte, append the rest verbatim
                let Some(current) = pending.as_mut() else {
                    return Err(ParseError::invalid_header("continuation line without a header"));
                };
                current.1.push_str(&latin1_to_string(&line[1..]));
                continue;
            }

            if let Some(done) = pending.take() {
                parsed.push(done);
            }

            let line = latin1_to_string(line);
            let Some((name, value)) = line.split_once(':') else {
                return Err(ParseError::invalid_header(format!("Invalid header line: {line:?}")));
            };
            pending = Some((name.trim_end_matches([' ', '\t']).to_string(), value.trim_start().to_string()));
        }
        if let Some(done) = pending.take() {
            parsed.push(done);
        }

        for (name, value) in parsed {
            self.append(&name, value.trim_end())?;
        }
        Ok(())
    }

    /// Serializes the section as `name: value` lines plus the blank line.
    ///
    /// Values are encoded as ISO-8859-1; code points outside it are
    /// replaced.
    pub fn compose(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.entries.len() * 32 + 2);
        for entry in &self.entries {
            dst.extend_from_slice(entry.name.as_str().as_bytes());
            dst.extend_from_slice(b": ");
            put_latin1(&mut dst, &entry.value);
            dst.extend_from_slice(b"\r\n");
        }
        dst.extend_from_slice(b"\r\n");
        dst.freeze()
    }

    fn find(&self, name: &str) -> Option<usize> {
        let name = name.to_ascii_lowercase();
        self.entries.iter().position(|e| e.name.as_str() == name)
    }
}

fn canonical(name: &str) -> Result<HeaderName, ParseError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ParseError::invalid_header(format!("Invalid header name: {name:?}")))
}

fn split_lines<'a>(blob: &'a [u8], line_end: &[u8]) -> Vec<&'a [u8]> {
    let mut lines = Vec::new();
    let mut rest = blob;
    while let Some(at) = rest.windows(line_end.len()).position(|w| w == line_end) {
        lines.push(&rest[..at]);
        rest = &rest[at + line_end.len()..];
    }
    lines.push(rest);
    lines
}

/// A lone LF can never appear inside a line; a CR can only be line-break
/// residue when the message elected the bare-LF terminator.
fn has_stray_line_break(line: &[u8], line_end: &[u8]) -> bool {
    line.contains(&b'\n') || (line_end == b"\r\n" && line.contains(&b'\r'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRLF: &[u8] = b"\r\n";

    fn parsed(blob: &[u8]) -> Headers {
        let mut headers = Headers::new();
        headers.parse(blob, CRLF).unwrap();
        headers
    }

    #[test]
    fn get_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.append("X-Custom-Trace", "abc").unwrap();
        assert_eq!(headers.get("x-custom-trace"), Some("abc"));
        assert_eq!(headers.get("X-CUSTOM-TRACE"), Some("abc"));
        assert!(headers.contains("X-Custom-trace"));
    }

    #[test]
    fn repeated_fields_combine() {
        let headers = parsed(b"Via: a\r\nVia: b");
        assert_eq!(headers.get("via"), Some("a, b"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn set_cookie_stays_a_list() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1").unwrap();
        headers.append("Set-Cookie", "b=2").unwrap();
        assert_eq!(headers.get_all("set-cookie"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn continuation_lines_fold() {
        let headers = parsed(b"Foo: bar\r\n baz");
        assert_eq!(headers.get("foo"), Some("barbaz"));

        let headers = parsed(b"Foo2: bar\r\n\tbaz");
        assert_eq!(headers.get("foo2"), Some("barbaz"));

        let headers = parsed(b"Foo3: bar\r\n  baz");
        assert_eq!(headers.get("foo3"), Some("bar baz"));

        let headers = parsed(b"Foo4: bar\r\n\t baz");
        assert_eq!(headers.get("foo4"), Some("bar baz"));
    }

    #[test]
    fn continuation_without_header_is_rejected() {
        let mut headers = Headers::new();
        assert!(headers.parse(b" stray", CRLF).is_err());
    }

    #[test]
    fn invalid_name_bytes_are_rejected() {
        let mut bad: Vec<u8> = (0x00..=0x1F).collect();
        bad.extend(*b"\x7F()<>@,;\\\"/[]?={} \t");
        bad.extend([0x80, 0xA0, 0xFF]);

        for byte in bad {
            let mut line = b"F".to_vec();
            line.push(byte);
            line.extend_from_slice(b"oo: bar");
            let mut headers = Headers::new();
            assert!(headers.parse(&line, CRLF).is_err(), "byte {byte:#04x} must be rejected");
        }
    }

    #[test]
    fn line_without_colon_is_rejected() {
        let mut headers = Headers::new();
        assert!(headers.parse(b"Foo", CRLF).is_err());
    }

    #[test]
    fn empty_value_is_allowed() {
        let headers = parsed(b"X-Empty:");
        assert_eq!(headers.get("x-empty"), Some(""));
        assert!(headers.elements("x-empty").unwrap().is_empty());
    }

    #[test]
    fn lf_terminated_sections_parse() {
        let mut headers = Headers::new();
        headers.parse(b"Host: a\nAccept: */*", b"\n").unwrap();
        assert_eq!(headers.get("host"), Some("a"));
        assert_eq!(headers.get("accept"), Some("*/*"));
    }

    #[test]
    fn stray_line_breaks_are_rejected() {
        let mut headers = Headers::new();
        assert!(headers.parse(b"Host: a\nb", CRLF).is_err());
        let mut headers = Headers::new();
        assert!(headers.parse(b"Host: a\rb\r\nX: y", CRLF).is_err());
    }

    #[test]
    fn elements_split_and_sort() {
        let headers = parsed(b"Accept: text/*;q=0.3, text/html;q=0.7, */*;q=0.1");
        let elements = headers.elements("Accept").unwrap();
        let values: Vec<_> = elements.iter().map(|e| e.value()).collect();
        assert_eq!(values, vec!["text/html", "text/*", "*/*"]);
    }

    #[test]
    fn element_treats_value_as_single() {
        let headers = parsed(b"Content-Type: text/html; charset=UTF-8");
        let element = headers.element("content-type").unwrap().unwrap();
        assert_eq!(element.value(), "text/html");
        assert_eq!(element.param_value("charset"), Some("UTF-8"));
    }

    #[test]
    fn validate_surfaces_element_failures() {
        let headers = parsed(b"Accept: text/html;q=9");
        assert!(headers.validate().is_err());

        let headers = parsed(b"Accept: text/html;q=0.9");
        assert!(headers.validate().is_ok());
    }

    #[test]
    fn compose_emits_one_line_per_entry() {
        let mut headers = Headers::new();
        headers.set("Host", "example.org").unwrap();
        headers.set("Content-Length", "0").unwrap();
        assert_eq!(&headers.compose()[..], b"host: example.org\r\ncontent-length: 0\r\n\r\n");
    }

    #[test]
    fn compose_replaces_non_latin1() {
        let mut headers = Headers::new();
        headers.set("X-Note", "snow\u{2603}man").unwrap();
        assert_eq!(&headers.compose()[..], b"x-note: snow?man\r\n\r\n");
    }

    #[test]
    fn append_with_params_formats_and_quotes() {
        let mut headers = Headers::new();
        headers
            .append_with_params(
                "Content-Disposition",
                "attachment",
                &[("filename", Some("report 2024.pdf")), ("delivered", None)],
            )
            .unwrap();
        assert_eq!(
            headers.get("content-disposition"),
            Some(r#"attachment; filename="report 2024.pdf"; delivered"#)
        );
    }
}
