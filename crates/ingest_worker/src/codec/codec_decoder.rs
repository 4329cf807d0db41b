//! Content decoding keyed by the configured encoding name.

use bytes::Bytes;
use common::domain::{ContentDecoder, IngestError, IngestResult};
use std::io::{Cursor, Read};
use std::str::FromStr;

/// Encodings the built-in decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Zstd,
    /// LZ4 frame format
    Lz4,
}

impl FromStr for ContentEncoding {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "identity" | "none" => Ok(ContentEncoding::Identity),
            "zstd" | "zst" => Ok(ContentEncoding::Zstd),
            "lz4" => Ok(ContentEncoding::Lz4),
            other => Err(IngestError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Decoder for identity, zstd and lz4 content
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecDecoder;

impl CodecDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ContentDecoder for CodecDecoder {
    fn supports(&self, encoding: &str) -> bool {
        encoding.parse::<ContentEncoding>().is_ok()
    }

    fn decode(&self, content: Bytes, encoding: &str) -> IngestResult<Bytes> {
        match encoding.parse::<ContentEncoding>()? {
            ContentEncoding::Identity => Ok(content),
            ContentEncoding::Zstd => zstd::decode_all(Cursor::new(&content[..]))
                .map(Bytes::from)
                .map_err(|e| IngestError::Decode(format!("zstd decompression failed: {}", e))),
            ContentEncoding::Lz4 => {
                let mut decoded = Vec::new();
                lz4_flex::frame::FrameDecoder::new(&content[..])
                    .read_to_end(&mut decoded)
                    .map_err(|e| IngestError::Decode(format!("lz4 decompression failed: {}", e)))?;
                Ok(Bytes::from(decoded))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PAYLOAD: &[u8] = br#"{"name":"cpu","fields":{"usage":12.5}}"#;

    #[test]
    fn test_encoding_names() {
        assert_eq!("".parse::<ContentEncoding>().unwrap(), ContentEncoding::Identity);
        assert_eq!("none".parse::<ContentEncoding>().unwrap(), ContentEncoding::Identity);
        assert_eq!("ZSTD".parse::<ContentEncoding>().unwrap(), ContentEncoding::Zstd);
        assert_eq!("lz4".parse::<ContentEncoding>().unwrap(), ContentEncoding::Lz4);
        assert!(matches!(
            "gzip".parse::<ContentEncoding>(),
            Err(IngestError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_supports() {
        let decoder = CodecDecoder::new();
        assert!(decoder.supports("identity"));
        assert!(decoder.supports("zstd"));
        assert!(!decoder.supports("gzip"));
    }

    #[test]
    fn test_identity_passes_content_through() {
        let decoded = CodecDecoder::new()
            .decode(Bytes::from_static(PAYLOAD), "identity")
            .unwrap();
        assert_eq!(&decoded[..], PAYLOAD);
    }

    #[test]
    fn test_decode_zstd() {
        let compressed = zstd::encode_all(Cursor::new(PAYLOAD), 1).unwrap();
        let decoded = CodecDecoder::new()
            .decode(Bytes::from(compressed), "zstd")
            .unwrap();
        assert_eq!(&decoded[..], PAYLOAD);
    }

    #[test]
    fn test_decode_lz4_frame() {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(PAYLOAD).unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = CodecDecoder::new()
            .decode(Bytes::from(compressed), "lz4")
            .unwrap();
        assert_eq!(&decoded[..], PAYLOAD);
    }

    #[test]
    fn test_corrupt_content_is_a_decode_error() {
        let result = CodecDecoder::new().decode(Bytes::from_static(b"not zstd"), "zstd");
        assert!(matches!(result, Err(IngestError::Decode(_))));
    }
}
