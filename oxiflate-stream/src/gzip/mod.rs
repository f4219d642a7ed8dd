//! GZIP format (RFC 1952) on top of the DEFLATE adapters.
//!
//! - [`header`]: member header model, serialization and incremental parsing
//! - [`format`]: writer/reader framing strategies (CRC-32, ISIZE, trailer)
//! - [`framed`]: inflater that strips and checks the framing
//! - [`stream`]: `GzipStream` / `AsyncGzipStream` facades

pub mod format;
pub mod framed;
pub mod header;
pub mod stream;

pub use format::{FOOTER_SIZE, GzipFormatReader, GzipFormatWriter};
pub use framed::FramedInflater;
pub use header::{CM_DEFLATE, GZIP_MAGIC, GzipHeader, MAX_FIELD_SIZE, flags};
pub use stream::{AsyncGzipStream, GzipStream};

use oxiflate_core::CompressionLevel;
use oxiflate_core::error::{OxiFlateError, Result};
use std::io::{Read, Write};

/// Compress `data` into a single GZIP member.
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut encoder = GzipStream::encoder(Vec::new(), level);
    encoder.write_all(data)?;
    encoder.into_inner()
}

/// Decompress a single GZIP member.
///
/// Unlike reading through [`GzipStream`], a member that ends before its
/// trailer is an error.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzipStream::decoder(data);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    if !decoder.is_finished() {
        return Err(OxiFlateError::unexpected_eof(FOOTER_SIZE));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_roundtrip() {
        let original = b"Hello, GZIP World! This is a test of GZIP compression.";
        let compressed = compress(original, CompressionLevel::DEFAULT).unwrap();
        assert_eq!(&compressed[..2], &GZIP_MAGIC);
        assert_eq!(decompress(&compressed).unwrap(), original);
    }

    #[test]
    fn test_gzip_empty_input_is_empty() {
        assert!(compress(b"", CompressionLevel::DEFAULT).unwrap().is_empty());
    }

    #[test]
    fn test_decompress_truncated() {
        let compressed = compress(b"truncated member", CompressionLevel::BEST).unwrap();
        assert!(matches!(
            decompress(&compressed[..compressed.len() - 4]),
            Err(OxiFlateError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_xfl_reflects_level() {
        let fast = compress(b"x", CompressionLevel::FAST).unwrap();
        let best = compress(b"x", CompressionLevel::BEST).unwrap();
        assert_eq!(fast[8], 4);
        assert_eq!(best[8], 2);
    }
}
