//! DEFLATE compression.
//!
//! [`Deflater`] drives `flate2`'s raw compressor behind the [`DeflateCodec`]
//! interface: input is pushed, compressed output is pulled in chunks that fit
//! the caller's buffer, and [`DeflateCodec::finish`] is called repeatedly
//! until the final block has been emitted.

use flate2::{Compress, Compression, FlushCompress, Status};
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressionLevel, DeflateCodec};
use tracing::trace;

/// Streaming DEFLATE compressor.
pub struct Deflater {
    raw: Compress,
    level: CompressionLevel,
    input: Vec<u8>,
    position: usize,
    finished: bool,
}

impl Deflater {
    /// Create a raw DEFLATE compressor with the given level.
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            raw: Compress::new(Compression::new(u32::from(level.level())), false),
            level,
            input: Vec::new(),
            position: 0,
            finished: false,
        }
    }

    /// Configured compression level.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Plain bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.raw.total_in()
    }

    /// Compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.raw.total_out()
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.raw.reset();
        self.input.clear();
        self.position = 0;
        self.finished = false;
    }

    fn step(&mut self, output: &mut [u8], flush: FlushCompress) -> Result<(usize, usize, Status)> {
        let before_in = self.raw.total_in();
        let before_out = self.raw.total_out();

        let status = self
            .raw
            .compress(&self.input[self.position..], output, flush)
            .map_err(|err| OxiFlateError::invalid_operation(format!("deflate failed: {err}")))?;

        let consumed = (self.raw.total_in() - before_in) as usize;
        let produced = (self.raw.total_out() - before_out) as usize;
        self.position += consumed;
        Ok((consumed, produced, status))
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT)
    }
}

impl std::fmt::Debug for Deflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deflater")
            .field("level", &self.level)
            .field("total_in", &self.raw.total_in())
            .field("total_out", &self.raw.total_out())
            .field("finished", &self.finished)
            .finish()
    }
}

impl DeflateCodec for Deflater {
    fn needs_input(&self) -> bool {
        self.position >= self.input.len()
    }

    fn set_input(&mut self, input: &[u8]) {
        if self.position > 0 {
            self.input.drain(..self.position);
            self.position = 0;
        }
        self.input.extend_from_slice(input);
    }

    fn deflate_output(&mut self, output: &mut [u8]) -> Result<usize> {
        let mut written = 0;

        while written < output.len() && !self.needs_input() {
            let (consumed, produced, _) = self.step(&mut output[written..], FlushCompress::None)?;
            written += produced;
            if consumed == 0 && produced == 0 {
                break;
            }
        }

        Ok(written)
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<(bool, usize)> {
        if self.finished {
            return Ok((true, 0));
        }

        let (_, produced, status) = self.step(output, FlushCompress::Finish)?;
        if status == Status::StreamEnd {
            self.finished = true;
            trace!(
                total_in = self.raw.total_in(),
                total_out = self.raw.total_out(),
                "deflate stream finished"
            );
        }
        Ok((self.finished, produced))
    }
}

/// Compress `data` into a complete raw DEFLATE stream.
pub fn deflate(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(level);
    let mut output = Vec::new();
    let mut buffer = vec![0u8; 16 * 1024];

    deflater.set_input(data);
    while !deflater.needs_input() {
        let produced = deflater.deflate_output(&mut buffer)?;
        output.extend_from_slice(&buffer[..produced]);
    }

    loop {
        let (done, produced) = deflater.finish(&mut buffer)?;
        output.extend_from_slice(&buffer[..produced]);
        if done {
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate;

    #[test]
    fn test_deflate_roundtrip() {
        let original = b"Hello, World! Hello, World! Hello, World!";
        let compressed = deflate(original, CompressionLevel::DEFAULT).unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(inflate(&compressed).unwrap(), original);
    }

    #[test]
    fn test_deflate_stored_level() {
        let original = b"stored";
        let compressed = deflate(original, CompressionLevel::NONE).unwrap();
        // Stored blocks carry the data verbatim plus framing.
        assert!(compressed.len() > original.len());
        assert_eq!(inflate(&compressed).unwrap(), original);
    }

    #[test]
    fn test_deflate_empty() {
        let compressed = deflate(b"", CompressionLevel::DEFAULT).unwrap();
        assert!(!compressed.is_empty());
        assert!(inflate(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_small_output_chunks() {
        let original: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut deflater = Deflater::new(CompressionLevel::FAST);
        let mut compressed = Vec::new();
        let mut chunk = [0u8; 7];

        deflater.set_input(&original);
        while !deflater.needs_input() {
            let n = deflater.deflate_output(&mut chunk).unwrap();
            compressed.extend_from_slice(&chunk[..n]);
        }
        loop {
            let (done, n) = deflater.finish(&mut chunk).unwrap();
            compressed.extend_from_slice(&chunk[..n]);
            if done {
                break;
            }
        }

        assert_eq!(deflater.total_in(), original.len() as u64);
        assert_eq!(inflate(&compressed).unwrap(), original);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut deflater = Deflater::default();
        let mut buffer = [0u8; 64];
        let mut done = false;
        while !done {
            done = deflater.finish(&mut buffer).unwrap().0;
        }
        assert_eq!(deflater.finish(&mut buffer).unwrap(), (true, 0));
    }
}
