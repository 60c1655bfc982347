//! Status-code taxonomy used by response preparation.
//!
//! The interesting part of a status here is not its number but what it means
//! for the message around it: whether a body is permitted at all, and which
//! entity headers must not accompany it. Response preparation consults both
//! before serializing.

use http::StatusCode;

/// Whether a response with this status is allowed to carry a body.
///
/// Informational responses, `204 No Content`, `205 Reset Content` and
/// `304 Not Modified` are always bodiless.
pub fn allows_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::RESET_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Header fields that must not occur alongside this status.
///
/// Response preparation strips these after the automatic headers have been
/// filled in, so e.g. a `304` never leaks the `Content-Length: 0` the
/// bodiless composition would otherwise produce.
pub fn headers_to_remove(status: StatusCode) -> &'static [&'static str] {
    const ENTITY_HEADERS: &[&str] = &["content-length", "content-type", "transfer-encoding"];

    match status.as_u16() {
        // informational and bodiless statuses must not describe an entity
        100 | 101 | 204 | 205 | 304 => ENTITY_HEADERS,
        _ => &[],
    }
}

/// The reason phrase written on the status line.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodiless_statuses() {
        assert!(!allows_body(StatusCode::CONTINUE));
        assert!(!allows_body(StatusCode::SWITCHING_PROTOCOLS));
        assert!(!allows_body(StatusCode::NO_CONTENT));
        assert!(!allows_body(StatusCode::RESET_CONTENT));
        assert!(!allows_body(StatusCode::NOT_MODIFIED));
        assert!(allows_body(StatusCode::OK));
        assert!(allows_body(StatusCode::NOT_FOUND));
    }

    #[test]
    fn not_modified_strips_entity_headers() {
        let removed = headers_to_remove(StatusCode::NOT_MODIFIED);
        assert!(removed.contains(&"content-length"));
        assert!(removed.contains(&"content-type"));
        assert!(removed.contains(&"transfer-encoding"));
        assert!(headers_to_remove(StatusCode::OK).is_empty());
    }
}
