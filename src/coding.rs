//! Content codings and the media-type registry resolving them.
//!
//! `Content-Encoding` and `Transfer-Encoding` tokens resolve through a
//! process-wide table: the coding token maps to a media type
//! (`gzip` to `application/gzip`, `deflate` to `application/zlib`) and the
//! media type maps to an implementation here. Bodies are stored as wire
//! bytes; [`ContentCoding::decode`] is applied by consumers on demand.
//! Only the receive side is covered: bodies are never compressed for
//! transmission.

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

use crate::protocol::ParseError;

/// A content coding this crate can actually apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCoding {
    /// LZ77 with a gzip wrapper, registered as `application/gzip`.
    Gzip,
    /// The zlib data format, registered as `application/zlib`.
    Deflate,
}

impl ContentCoding {
    /// The coding token as it appears in header fields.
    pub fn token(&self) -> &'static str {
        match self {
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
        }
    }

    /// The media type the coding is registered under.
    pub fn media_type(&self) -> &'static str {
        match self {
            ContentCoding::Gzip => "application/gzip",
            ContentCoding::Deflate => "application/zlib",
        }
    }

    /// Looks a coding up by its registered media type.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "application/gzip" => Some(ContentCoding::Gzip),
            "application/zlib" => Some(ContentCoding::Deflate),
            _ => None,
        }
    }

    /// Decompresses received body bytes.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, ParseError> {
        let mut out = Vec::new();
        let result = match self {
            ContentCoding::Gzip => GzDecoder::new(data).read_to_end(&mut out),
            ContentCoding::Deflate => ZlibDecoder::new(data).read_to_end(&mut out),
        };
        result.map_err(|_| ParseError::invalid_body(format!("invalid {} data", self.token())))?;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};

    use super::*;

    pub(crate) fn gzipped(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlibbed(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn registry_round_trip() {
        assert_eq!(ContentCoding::from_media_type("application/gzip"), Some(ContentCoding::Gzip));
        assert_eq!(ContentCoding::from_media_type("application/zlib"), Some(ContentCoding::Deflate));
        assert_eq!(ContentCoding::from_media_type("application/x-unknown"), None);
        assert_eq!(ContentCoding::Gzip.media_type(), "application/gzip");
    }

    #[test]
    fn decodes_gzip() {
        let plain = b"Wikipedia in\r\n\r\nchunks.";
        let packed = gzipped(plain);
        assert_ne!(&packed[..], &plain[..]);
        assert_eq!(ContentCoding::Gzip.decode(&packed).unwrap(), plain);
    }

    #[test]
    fn decodes_deflate() {
        let plain = vec![b'z'; 4096];
        let packed = zlibbed(&plain);
        assert!(packed.len() < plain.len());
        assert_eq!(ContentCoding::Deflate.decode(&packed).unwrap(), plain);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(ContentCoding::Gzip.decode(b"definitely not gzip").is_err());
        assert!(ContentCoding::Deflate.decode(b"nor zlib").is_err());
    }
}
