//! Header field elements.
//!
//! Most interesting header fields are lists: `Accept` carries several media
//! ranges, `Transfer-Encoding` several codings, `Authorization` a bag of
//! `name=value` parameters. An element is one entry of such a list, split on
//! commas that sit outside quoted strings, with its own semicolon-separated
//! parameters.
//!
//! This module holds the field-agnostic machinery (splitting, parameter
//! parsing, quoting). Field-specific validation and ordering live in
//! [`crate::header::fields`].

use std::fmt;

use crate::protocol::ParseError;

/// Characters that force a parameter value into a quoted string.
const QUOTE_TRIGGERS: &[u8] = b"\"(),/:;<=>?@[\\]{} \t";

/// One element of a header field value.
///
/// Parameters keep their insertion order; parameter names are
/// case-insensitive and stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderElement {
    value: String,
    params: Vec<(String, Option<String>)>,
}

impl HeaderElement {
    /// Creates an element from a bare value without parameters.
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self { value: value.into(), params: Vec::new() }
    }

    /// Parses one element: a value optionally followed by
    /// `;name=value` or `;name` parameters.
    pub fn parse(element: &str) -> Result<Self, ParseError> {
        let mut parts = split_outside_quotes(element, b';').into_iter();

        let value = parts
            .next()
            .map(str::trim)
            .ok_or_else(|| ParseError::invalid_header("empty header element"))?
            .to_string();

        let mut params = Vec::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((name, raw)) => {
                    params.push((name.trim().to_ascii_lowercase(), Some(unquote(raw.trim()))));
                }
                None => params.push((part.to_ascii_lowercase(), None)),
            }
        }

        Ok(Self { value, params })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn set_value<S: Into<String>>(&mut self, value: S) {
        self.value = value.into();
    }

    /// All parameters in insertion order.
    pub fn params(&self) -> &[(String, Option<String>)] {
        &self.params
    }

    /// Looks up a parameter by name. The outer `Option` is presence, the
    /// inner one distinguishes `;name=value` from a bare `;name`.
    pub fn param(&self, name: &str) -> Option<Option<&str>> {
        self.params
            .iter()
            .find(|(n, _)| n == &name.to_ascii_lowercase())
            .map(|(_, v)| v.as_deref())
    }

    /// The value of a parameter, if the parameter is present and has one.
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.param(name).flatten()
    }

    pub(crate) fn set_param<S: Into<String>>(&mut self, name: &str, value: S) {
        let name = name.to_ascii_lowercase();
        let value = Some(value.into());
        match self.params.iter_mut().find(|(n, _)| n == &name) {
            Some(entry) => entry.1 = value,
            None => self.params.push((name, value)),
        }
    }
}

impl fmt::Display for HeaderElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)?;
        for (name, value) in &self.params {
            write!(f, "; {}", format_param(name, value.as_deref()))?;
        }
        Ok(())
    }
}

impl PartialEq<str> for HeaderElement {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl PartialEq<&str> for HeaderElement {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

/// Splits a combined field value into elements on commas outside quoted
/// strings, dropping empty entries.
pub fn split_elements(value: &str) -> Vec<&str> {
    split_outside_quotes(value, b',').into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Re-emits one `name=value` parameter, quoting the value when it contains
/// separator characters.
pub fn format_param(name: &str, value: Option<&str>) -> String {
    match value {
        None => name.to_string(),
        Some(value) => {
            if value.is_empty() || value.bytes().any(|b| QUOTE_TRIGGERS.contains(&b)) {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("{name}=\"{escaped}\"")
            } else {
                format!("{name}={value}")
            }
        }
    }
}

/// Splits `s` on `sep`, ignoring separators inside double-quoted strings.
pub(crate) fn split_outside_quotes(s: &str, sep: u8) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            _ if b == sep && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Strips surrounding double quotes and resolves backslash escapes.
pub(crate) fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        let inner = &s[1..s.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    } else {
        s.to_string()
    }
}
