//! DEFLATE decompression (inflate).
//!
//! [`Inflater`] drives `flate2`'s raw (headerless) decompressor behind the
//! [`InflateCodec`] push/pull interface. Pushed input is kept until the
//! decompressor has consumed it; whatever lies beyond the end of the DEFLATE
//! stream stays available through [`InflateCodec::unconsumed_input`].

use flate2::{Decompress, FlushDecompress, Status};
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::InflateCodec;
use tracing::trace;

/// Maximum back-reference distance of DEFLATE (32KB).
pub const MAX_DICTIONARY_SIZE: usize = 32768;

/// Streaming DEFLATE decompressor.
pub struct Inflater {
    raw: Decompress,
    /// Pushed input; `position` marks the first unconsumed byte.
    input: Vec<u8>,
    position: usize,
    finished: bool,
}

impl Inflater {
    /// Create a decompressor for a raw DEFLATE stream.
    pub fn new() -> Self {
        Self {
            raw: Decompress::new(false),
            input: Vec::new(),
            position: 0,
            finished: false,
        }
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.raw.total_in()
    }

    /// Plain bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.raw.total_out()
    }

    /// Reset to the initial state, dropping pending input.
    pub fn reset(&mut self) {
        self.raw.reset(false);
        self.input.clear();
        self.position = 0;
        self.finished = false;
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Inflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inflater")
            .field("total_in", &self.raw.total_in())
            .field("total_out", &self.raw.total_out())
            .field("pending_input", &(self.input.len() - self.position))
            .field("finished", &self.finished)
            .finish()
    }
}

impl InflateCodec for Inflater {
    fn needs_input(&self) -> bool {
        !self.finished && self.position >= self.input.len()
    }

    fn set_input(&mut self, input: &[u8]) {
        if self.position > 0 {
            self.input.drain(..self.position);
            self.position = 0;
        }
        self.input.extend_from_slice(input);
    }

    fn inflate(&mut self, output: &mut [u8]) -> Result<usize> {
        let mut written = 0;

        while !self.finished && written < output.len() {
            let before_in = self.raw.total_in();
            let before_out = self.raw.total_out();

            let status = self
                .raw
                .decompress(
                    &self.input[self.position..],
                    &mut output[written..],
                    FlushDecompress::None,
                )
                .map_err(|err| OxiFlateError::corrupted(self.raw.total_in(), err.to_string()))?;

            let consumed = (self.raw.total_in() - before_in) as usize;
            let produced = (self.raw.total_out() - before_out) as usize;
            self.position += consumed;
            written += produced;

            if status == Status::StreamEnd {
                self.finished = true;
                trace!(
                    total_in = self.raw.total_in(),
                    total_out = self.raw.total_out(),
                    "end of deflate stream"
                );
                break;
            }
            if consumed == 0 && produced == 0 {
                break;
            }
        }

        Ok(written)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn unconsumed_input(&self) -> &[u8] {
        if self.finished {
            &self.input[self.position..]
        } else {
            &[]
        }
    }
}

/// Decompress a complete raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::new();
    inflater.set_input(data);

    let mut output = Vec::new();
    let mut buffer = vec![0u8; MAX_DICTIONARY_SIZE];
    loop {
        let produced = inflater.inflate(&mut buffer)?;
        output.extend_from_slice(&buffer[..produced]);

        if inflater.is_finished() {
            return Ok(output);
        }
        if produced == 0 {
            return Err(OxiFlateError::unexpected_eof(1));
        }
    }
}
