//! Core traits for block codecs and container format strategies.
//!
//! A stream adapter never touches compressed bits itself. It moves bytes
//! between the underlying stream and a block codec through the narrow
//! push/pull interface defined here, and lets an optional format strategy
//! add framing (header, checksum, footer) around the raw codec output.

use crate::error::{OxiFlateError, Result};
use std::fmt;
use std::str::FromStr;

/// Direction of a compression stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMode {
    /// Read compressed bytes from the underlying stream, hand out plain bytes.
    Decompress,
    /// Accept plain bytes, write compressed bytes to the underlying stream.
    Compress,
}

impl CompressionMode {
    /// Name used in messages and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decompress => "decompress",
            Self::Compress => "compress",
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for CompressionMode {
    type Error = OxiFlateError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Decompress),
            1 => Ok(Self::Compress),
            other => Err(OxiFlateError::invalid_argument(format!(
                "compression mode {other} is neither Compress nor Decompress"
            ))),
        }
    }
}

impl FromStr for CompressionMode {
    type Err = OxiFlateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "decompress" => Ok(Self::Decompress),
            "compress" => Ok(Self::Compress),
            other => Err(OxiFlateError::invalid_argument(format!(
                "unknown compression mode '{other}'"
            ))),
        }
    }
}

/// A streaming decompressor (inflater).
///
/// Input is pushed with [`set_input`](Self::set_input); output is pulled with
/// [`inflate`](Self::inflate). An implementation must hand out every byte it
/// can produce before it reports [`is_finished`](Self::is_finished).
pub trait InflateCodec: Send {
    /// Whether all pushed input has been consumed.
    fn needs_input(&self) -> bool;

    /// Push more compressed input. Unconsumed input from earlier calls is kept.
    fn set_input(&mut self, input: &[u8]);

    /// Inflate into `output`, returning the number of bytes written.
    ///
    /// Returns 0 when more input is needed or the stream has ended.
    fn inflate(&mut self, output: &mut [u8]) -> Result<usize>;

    /// Whether the end of the compressed stream has been reached and all
    /// output has been handed out.
    fn is_finished(&self) -> bool;

    /// Input bytes that were pushed but lie beyond the end of the compressed
    /// stream. Empty until [`is_finished`](Self::is_finished) is true.
    fn unconsumed_input(&self) -> &[u8];
}

/// A streaming compressor (deflater).
pub trait DeflateCodec: Send {
    /// Whether all pushed input has been consumed.
    fn needs_input(&self) -> bool;

    /// Push more plain input.
    fn set_input(&mut self, input: &[u8]);

    /// Compress pending input into `output`, returning the number of bytes
    /// written. Output may be empty while the codec buffers internally.
    fn deflate_output(&mut self, output: &mut [u8]) -> Result<usize>;

    /// Terminate the stream. Returns `(done, bytes_written)`; must be called
    /// again while `done` is false.
    fn finish(&mut self, output: &mut [u8]) -> Result<(bool, usize)>;
}

/// Writer side of a container format (header, running checksum, footer).
pub trait FormatWriter: Send {
    /// Bytes emitted before the first compressed byte.
    fn header(&mut self) -> Vec<u8>;

    /// Account for plain bytes about to be compressed.
    fn update_with_bytes_read(&mut self, data: &[u8]);

    /// Bytes emitted after the last compressed byte.
    fn footer(&mut self) -> Vec<u8>;
}

/// Reader side of a container format.
pub trait FormatReader: Send {
    /// Try to parse the header from the start of `input`.
    ///
    /// Returns the number of header bytes, or `None` if `input` does not yet
    /// hold the complete header.
    fn read_header(&mut self, input: &[u8]) -> Result<Option<usize>>;

    /// Account for plain bytes produced by the codec.
    fn update_with_bytes_read(&mut self, data: &[u8]);

    /// Try to parse the footer from the start of `input`, with the same
    /// contract as [`read_header`](Self::read_header).
    fn read_footer(&mut self, input: &[u8]) -> Result<Option<usize>>;

    /// Check the parsed footer against the accounted data.
    fn validate(&self) -> Result<()>;
}

/// Compression level for codecs that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (store only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a custom compression level (0-9).
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_level() {
        assert_eq!(CompressionLevel::NONE.level(), 0);
        assert_eq!(CompressionLevel::FAST.level(), 1);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
        assert_eq!(CompressionLevel::BEST.level(), 9);

        // Clamped
        assert_eq!(CompressionLevel::new(100).level(), 9);
    }

    #[test]
    fn test_mode_from_int() {
        assert_eq!(
            CompressionMode::try_from(0).unwrap(),
            CompressionMode::Decompress
        );
        assert_eq!(
            CompressionMode::try_from(1).unwrap(),
            CompressionMode::Compress
        );
        assert!(matches!(
            CompressionMode::try_from(7),
            Err(OxiFlateError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "Compress".parse::<CompressionMode>().unwrap(),
            CompressionMode::Compress
        );
        assert_eq!(CompressionMode::Decompress.to_string(), "decompress");
        assert!("sideways".parse::<CompressionMode>().is_err());
    }
}
