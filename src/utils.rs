//! Utility macros and helpers shared across the crate.

use bytes::{BufMut, BytesMut};

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of
/// panicking. It's useful for validation checks where you want to return
/// early with an error if some condition is not satisfied.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Decodes raw header bytes as ISO-8859-1.
///
/// Every byte maps to the Unicode code point of the same value, so the
/// conversion never fails and is reversible for the full 0x00..=0xFF range.
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encodes a string as ISO-8859-1 into `dst`.
///
/// Code points above U+00FF are not representable and are replaced with `?`.
pub(crate) fn put_latin1(dst: &mut BytesMut, s: &str) {
    for c in s.chars() {
        if (c as u32) <= 0xFF {
            dst.put_u8(c as u32 as u8);
        } else {
            dst.put_u8(b'?');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_round_trip() {
        let bytes: Vec<u8> = (0x20..=0xFF).collect();
        let s = latin1_to_string(&bytes);
        let mut out = BytesMut::new();
        put_latin1(&mut out, &s);
        assert_eq!(&out[..], &bytes[..]);
    }

    #[test]
    fn non_latin1_replaced() {
        let mut out = BytesMut::new();
        put_latin1(&mut out, "a\u{2603}b");
        assert_eq!(&out[..], b"a?b");
    }
}
