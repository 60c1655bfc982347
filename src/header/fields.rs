//! Field-specific element behavior.
//!
//! Every header field maps to a [`FieldKind`] that knows how to sanitize its
//! elements and, for the Accept family, how to order them. The registry is
//! the `match` in [`kind_of`]; fields without an entry get
//! [`FieldKind::Generic`]. This replaces per-field subclassing with a closed
//! set of kinds, so parsing stays a pure function from bytes to elements.

use std::cmp::Reverse;

use crate::coding::ContentCoding;
use crate::ensure;
use crate::header::element::HeaderElement;
use crate::header::host::HostInfo;
use crate::protocol::ParseError;

/// The behavior class of a header field, keyed by canonical field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Comma-split elements with `;`-separated parameters, no extra rules.
    Generic,
    /// `Accept`: media ranges with quality weights.
    Accept,
    /// Token-valued negotiation fields (`Accept-Encoding`, `TE`, ...).
    AcceptToken,
    /// `Content-Encoding`: applied codings, unknown tokens are errors.
    ContentEncoding,
    /// `Transfer-Encoding`: framing codings, unknown tokens are errors.
    TransferEncoding,
    /// `Content-Type`: media type with charset/boundary parameters.
    ContentType,
    /// `Content-Disposition`: `attachment` or `inline` plus a filename.
    ContentDisposition,
    /// `Host`: name or address literal with optional port.
    Host,
    /// `Trailer`: names announced for the trailer section.
    Trailer,
}

/// What a coding token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingResolution {
    /// A coding this crate can apply.
    Implemented(ContentCoding),
    /// Pure framing with no payload transformation (`chunked`).
    FramingOnly,
    /// Registered but not provided here; consuming it yields `501`.
    Unimplemented,
}

/// Looks up the element kind registered for a (lowercased) field name.
pub fn kind_of(name: &str) -> FieldKind {
    match name {
        "accept" => FieldKind::Accept,
        "accept-charset" | "accept-encoding" | "accept-language" | "accept-ranges" | "te" => {
            FieldKind::AcceptToken
        }
        "content-encoding" => FieldKind::ContentEncoding,
        "transfer-encoding" => FieldKind::TransferEncoding,
        "content-type" => FieldKind::ContentType,
        "content-disposition" => FieldKind::ContentDisposition,
        "host" | "x-forwarded-host" => FieldKind::Host,
        "trailer" => FieldKind::Trailer,
        _ => FieldKind::Generic,
    }
}

impl FieldKind {
    /// Parses one element of this field, applying the field's sanitization.
    pub fn parse(&self, element: &str) -> Result<HeaderElement, ParseError> {
        let mut parsed = HeaderElement::parse(element)?;
        self.sanitize(&mut parsed)?;
        Ok(parsed)
    }

    /// Orders parsed elements; a no-op outside the Accept family.
    pub fn sort(&self, elements: &mut [HeaderElement]) {
        if matches!(self, FieldKind::Accept | FieldKind::AcceptToken) {
            // sanitize already rejected malformed weights
            elements.sort_by_key(|e| (Reverse(quality(e).unwrap_or(1000)), self.specificity(e)));
        }
    }

    /// Resolves a coding element through the registry.
    ///
    /// `None` means the token is unknown. For `Content-Type` the lookup is
    /// soft: most media types simply have no coding attached.
    pub fn coding(&self, element: &HeaderElement) -> Option<CodingResolution> {
        let token = element.value().to_ascii_lowercase();
        match self {
            FieldKind::ContentEncoding => match token.as_str() {
                "gzip" => resolve_media_type("application/gzip"),
                "deflate" => resolve_media_type("application/zlib"),
                "compress" | "identity" | "exi" | "pack200-gzip" => {
                    Some(CodingResolution::Unimplemented)
                }
                _ => None,
            },
            FieldKind::TransferEncoding => match token.as_str() {
                "chunked" => Some(CodingResolution::FramingOnly),
                "gzip" => resolve_media_type("application/gzip"),
                "deflate" => resolve_media_type("application/zlib"),
                "compress" | "identity" => Some(CodingResolution::Unimplemented),
                _ => None,
            },
            FieldKind::ContentType => {
                ContentCoding::from_media_type(&token).map(CodingResolution::Implemented)
            }
            _ => None,
        }
    }

    fn sanitize(&self, element: &mut HeaderElement) -> Result<(), ParseError> {
        match self {
            FieldKind::Generic => Ok(()),

            FieldKind::Accept => {
                element.set_value(element.value().to_ascii_lowercase());
                if element.value() == "*" {
                    element.set_value("*/*");
                }
                quality(element).map(|_| ())
            }

            FieldKind::AcceptToken => quality(element).map(|_| ()),

            FieldKind::ContentEncoding => match self.coding(element) {
                Some(_) => Ok(()),
                None => Err(ParseError::invalid_header(format!(
                    "Unknown Content-Encoding: {:?}",
                    element.value()
                ))),
            },

            FieldKind::TransferEncoding => match self.coding(element) {
                Some(_) => Ok(()),
                None => Err(ParseError::invalid_header(format!(
                    "Unknown Transfer-Encoding: {:?}",
                    element.value()
                ))),
            },

            FieldKind::ContentType => {
                element.set_value(element.value().to_ascii_lowercase());
                if let Some(raw) = element.param("boundary") {
                    let boundary = raw.unwrap_or("").trim_matches('"').to_string();
                    ensure_valid_boundary(&boundary)?;
                    element.set_param("boundary", boundary);
                }
                Ok(())
            }

            FieldKind::ContentDisposition => {
                element.set_value(element.value().to_ascii_lowercase());
                match element.value() {
                    "attachment" if element.param("inline").is_some() => {
                        Err(ParseError::invalid_header("Mixed Content-Disposition"))
                    }
                    "inline" if element.param("attachment").is_some() => {
                        Err(ParseError::invalid_header("Mixed Content-Disposition"))
                    }
                    "attachment" | "inline" => Ok(()),
                    other => Err(ParseError::invalid_header(format!(
                        "Unknown Content-Disposition: {other:?}"
                    ))),
                }
            }

            FieldKind::Host => {
                element.set_value(element.value().to_ascii_lowercase());
                HostInfo::parse(element.value()).map(|_| ())
            }

            FieldKind::Trailer => {
                const FORBIDDEN: &[&str] = &["transfer-encoding", "content-length", "trailer"];
                let name = element.value().to_ascii_lowercase();
                ensure!(
                    !FORBIDDEN.contains(&name.as_str()),
                    ParseError::invalid_header(format!(
                        "A Trailer header MUST NOT contain a {:?} field",
                        element.value()
                    ))
                );
                Ok(())
            }
        }
    }

    /// Lower is more specific; used as the tiebreaker below equal weights.
    fn specificity(&self, element: &HeaderElement) -> u8 {
        match self {
            FieldKind::Accept => match element.value().split_once('/') {
                Some(("*", "*")) => 2,
                Some((_, "*")) => 1,
                _ => 0,
            },
            FieldKind::AcceptToken => u8::from(element.value() == "*"),
            _ => 0,
        }
    }
}

/// The quality weight of an element in thousandths, 0..=1000.
///
/// A missing `q` parameter means 1000. Anything that is not a decimal in
/// `[0, 1]` with at most three fraction digits is rejected.
pub fn quality(element: &HeaderElement) -> Result<u16, ParseError> {
    match element.param("q") {
        None => Ok(1000),
        Some(raw) => raw
            .and_then(parse_weight)
            .ok_or_else(|| {
                ParseError::invalid_header(format!("invalid quality value: {:?}", raw.unwrap_or("")))
            }),
    }
}

fn parse_weight(s: &str) -> Option<u16> {
    let mut chars = s.chars();
    match chars.next()? {
        '0' => {
            let rest = chars.as_str();
            if rest.is_empty() {
                return Some(0);
            }
            let digits = rest.strip_prefix('.')?;
            if digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let mut weight = 0u16;
            for b in digits.bytes() {
                weight = weight * 10 + u16::from(b - b'0');
            }
            Some(weight * 10u16.pow(3 - digits.len() as u32))
        }
        '1' => {
            let rest = chars.as_str();
            if rest.is_empty() {
                return Some(1000);
            }
            let digits = rest.strip_prefix('.')?;
            if digits.len() > 3 || !digits.bytes().all(|b| b == b'0') {
                return None;
            }
            Some(1000)
        }
        _ => None,
    }
}

fn resolve_media_type(media_type: &str) -> Option<CodingResolution> {
    Some(
        ContentCoding::from_media_type(media_type)
            .map(CodingResolution::Implemented)
            .unwrap_or(CodingResolution::Unimplemented),
    )
}

fn ensure_valid_boundary(boundary: &str) -> Result<(), ParseError> {
    let bytes = boundary.as_bytes();
    let valid = bytes.len() <= 201
        && bytes.iter().all(|b| (0x20..=0x7E).contains(b))
        && bytes.last().is_some_and(|b| (0x21..=0x7E).contains(b));
    ensure!(
        valid,
        ParseError::invalid_header(format!("Invalid boundary in multipart form: {boundary:?}"))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_sorted(kind: FieldKind, value: &str) -> Vec<HeaderElement> {
        let mut elements: Vec<_> = crate::header::element::split_elements(value)
            .into_iter()
            .map(|e| kind.parse(e).unwrap())
            .collect();
        kind.sort(&mut elements);
        elements
    }

    #[test]
    fn accept_sorts_by_weight() {
        let elements = parse_sorted(FieldKind::Accept, "text/*;q=0.3, text/html;q=0.7, */*;q=0.1");
        let values: Vec<_> = elements.iter().map(|e| e.value()).collect();
        assert_eq!(values, vec!["text/html", "text/*", "*/*"]);
    }

    #[test]
    fn accept_breaks_ties_by_specificity() {
        let elements = parse_sorted(FieldKind::Accept, "*/*, text/*, text/html");
        let values: Vec<_> = elements.iter().map(|e| e.value()).collect();
        assert_eq!(values, vec!["text/html", "text/*", "*/*"]);
    }

    #[test]
    fn bare_wildcard_becomes_full_range() {
        let element = FieldKind::Accept.parse("*").unwrap();
        assert_eq!(element.value(), "*/*");
    }

    #[test]
    fn zero_weight_is_kept_but_sorts_last() {
        let elements = parse_sorted(FieldKind::AcceptToken, "gzip;q=0, deflate;q=0.5");
        assert_eq!(elements[0].value(), "deflate");
        assert_eq!(elements[1].value(), "gzip");
        assert_eq!(quality(&elements[1]).unwrap(), 0);
    }

    #[test]
    fn out_of_range_weights_rejected() {
        for q in ["1.5", "2", "-1", "0.1234", "abc", ""] {
            let result = FieldKind::AcceptToken.parse(&format!("gzip;q={q}"));
            assert!(result.is_err(), "q={q} should be rejected");
        }
    }

    #[test]
    fn coding_resolution() {
        let gzip = FieldKind::ContentEncoding.parse("gzip").unwrap();
        assert_eq!(
            FieldKind::ContentEncoding.coding(&gzip),
            Some(CodingResolution::Implemented(ContentCoding::Gzip))
        );

        let chunked = FieldKind::TransferEncoding.parse("chunked").unwrap();
        assert_eq!(FieldKind::TransferEncoding.coding(&chunked), Some(CodingResolution::FramingOnly));

        let compress = FieldKind::ContentEncoding.parse("compress").unwrap();
        assert_eq!(FieldKind::ContentEncoding.coding(&compress), Some(CodingResolution::Unimplemented));
    }

    #[test]
    fn unknown_codings_are_hard_errors() {
        assert!(FieldKind::ContentEncoding.parse("br0tli").is_err());
        assert!(FieldKind::TransferEncoding.parse("sketchy").is_err());
    }

    #[test]
    fn boundary_validation() {
        assert!(FieldKind::ContentType.parse("multipart/form-data; boundary=ab-12").is_ok());
        assert!(FieldKind::ContentType.parse(r#"multipart/form-data; boundary="a b""#).is_ok());
        // trailing space is not allowed as the final byte
        assert!(FieldKind::ContentType.parse(r#"multipart/form-data; boundary="a b ""#).is_err());
        assert!(FieldKind::ContentType.parse("multipart/form-data; boundary=").is_err());
        let long = "a".repeat(202);
        assert!(FieldKind::ContentType.parse(&format!("multipart/form-data; boundary={long}")).is_err());
    }

    #[test]
    fn trailer_forbids_framing_fields() {
        assert!(FieldKind::Trailer.parse("X-Checksum").is_ok());
        for name in ["Transfer-Encoding", "content-length", "Trailer"] {
            assert!(FieldKind::Trailer.parse(name).is_err(), "{name} must be rejected");
        }
    }

    #[test]
    fn content_disposition_rules() {
        let element = FieldKind::ContentDisposition.parse(r#"attachment; filename="r.pdf""#).unwrap();
        assert_eq!(element.param_value("filename"), Some("r.pdf"));
        assert!(FieldKind::ContentDisposition.parse("attachment; inline").is_err());
        assert!(FieldKind::ContentDisposition.parse("sideways").is_err());
    }
}
