//! I/O-free core shared by the synchronous and asynchronous adapters.
//!
//! The engine owns the codec, the optional format writer and the fixed
//! intermediary buffer. Adapters move bytes between the underlying stream and
//! the engine; they never touch the codec directly.

use crate::gzip::{FramedInflater, GzipFormatReader, GzipFormatWriter, GzipHeader};
use crate::options::StreamOptions;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressionMode, DeflateCodec, FormatWriter, InflateCodec};
use tracing::{debug, trace};

/// Container around the raw DEFLATE stream.
#[derive(Debug, Clone, Default)]
pub(crate) enum Framing {
    /// Bare RFC 1951 stream.
    #[default]
    Raw,
    /// One GZIP member with the given header (used when compressing).
    Gzip(GzipHeader),
}

enum Codec {
    Inflate(Box<dyn InflateCodec>),
    Deflate(Box<dyn DeflateCodec>),
}

pub(crate) struct StreamEngine {
    mode: CompressionMode,
    /// `None` once released.
    codec: Option<Codec>,
    format_writer: Option<Box<dyn FormatWriter>>,
    wrote_header: bool,
    wrote_bytes: bool,
    buffer: Box<[u8]>,
}

impl StreamEngine {
    pub(crate) fn new(mode: CompressionMode, options: &StreamOptions, framing: &Framing) -> Self {
        let codecs = options.codecs();
        let (codec, format_writer): (Codec, Option<Box<dyn FormatWriter>>) = match (mode, framing)
        {
            (CompressionMode::Decompress, Framing::Raw) => (Codec::Inflate(codecs.inflater()), None),
            (CompressionMode::Decompress, Framing::Gzip(_)) => (
                Codec::Inflate(Box::new(FramedInflater::new(
                    codecs.inflater(),
                    Box::new(GzipFormatReader::new()),
                ))),
                None,
            ),
            (CompressionMode::Compress, Framing::Raw) => {
                (Codec::Deflate(codecs.deflater(options.level())), None)
            }
            (CompressionMode::Compress, Framing::Gzip(header)) => (
                Codec::Deflate(codecs.deflater(options.level())),
                Some(Box::new(GzipFormatWriter::new(header.clone())) as Box<dyn FormatWriter>),
            ),
        };

        debug!(
            %mode,
            backend = codecs.name(),
            buffer_size = options.buffer_size(),
            gzip = matches!(framing, Framing::Gzip(_)),
            "stream engine created"
        );

        Self {
            mode,
            codec: Some(codec),
            format_writer,
            wrote_header: false,
            wrote_bytes: false,
            buffer: vec![0u8; options.buffer_size()].into_boxed_slice(),
        }
    }

    pub(crate) fn mode(&self) -> CompressionMode {
        self.mode
    }

    pub(crate) fn is_released(&self) -> bool {
        self.codec.is_none()
    }

    fn inflate_parts(&mut self) -> Result<(&mut Box<dyn InflateCodec>, &mut [u8])> {
        match &mut self.codec {
            Some(Codec::Inflate(codec)) => Ok((codec, &mut self.buffer[..])),
            Some(Codec::Deflate(_)) => Err(OxiFlateError::invalid_operation(
                "a compressing stream has no inflater",
            )),
            None => Err(OxiFlateError::ObjectDisposed),
        }
    }

    fn deflate_parts(&mut self) -> Result<(&mut Box<dyn DeflateCodec>, &mut [u8])> {
        match &mut self.codec {
            Some(Codec::Deflate(codec)) => Ok((codec, &mut self.buffer[..])),
            Some(Codec::Inflate(_)) => Err(OxiFlateError::invalid_operation(
                "a decompressing stream has no deflater",
            )),
            None => Err(OxiFlateError::ObjectDisposed),
        }
    }

    // Read side

    /// Inflate pending codec output into `output`.
    pub(crate) fn inflate(&mut self, output: &mut [u8]) -> Result<usize> {
        let (codec, _) = self.inflate_parts()?;
        codec.inflate(output)
    }

    pub(crate) fn is_finished(&self) -> bool {
        matches!(&self.codec, Some(Codec::Inflate(codec)) if codec.is_finished())
    }

    /// The intermediary buffer, to be filled from the underlying stream.
    pub(crate) fn input_buffer(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Hand the first `len` bytes of the intermediary buffer to the codec.
    pub(crate) fn supply_input(&mut self, len: usize) -> Result<()> {
        let (codec, buffer) = self.inflate_parts()?;
        trace!(len, "compressed input supplied");
        codec.set_input(&buffer[..len]);
        Ok(())
    }

    // Write side

    /// Record a write of `data`. Returns the header bytes on the first
    /// non-empty write of a framed stream.
    pub(crate) fn begin_write(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        self.deflate_parts()?;
        if data.is_empty() {
            return Ok(None);
        }

        self.wrote_bytes = true;
        let Some(format) = self.format_writer.as_mut() else {
            return Ok(None);
        };
        let header = if self.wrote_header {
            None
        } else {
            self.wrote_header = true;
            Some(format.header())
        };
        format.update_with_bytes_read(data);
        Ok(header)
    }

    /// Compress pending input into the intermediary buffer.
    ///
    /// Returns the number of bytes ready in [`output`](Self::output), or
    /// `None` once the codec needs more input.
    pub(crate) fn next_output(&mut self) -> Result<Option<usize>> {
        let (codec, buffer) = self.deflate_parts()?;
        if codec.needs_input() {
            return Ok(None);
        }
        let n = codec.deflate_output(buffer)?;
        if n > 0 {
            trace!(len = n, "compressed chunk ready");
            return Ok(Some(n));
        }
        if codec.needs_input() {
            return Ok(None);
        }
        Err(OxiFlateError::invalid_operation(
            "deflater made no progress with pending input",
        ))
    }

    pub(crate) fn set_input(&mut self, data: &[u8]) -> Result<()> {
        let (codec, _) = self.deflate_parts()?;
        codec.set_input(data);
        Ok(())
    }

    /// Whether close has to terminate the compressed stream.
    pub(crate) fn needs_finish(&self) -> bool {
        self.wrote_bytes && matches!(self.codec, Some(Codec::Deflate(_)))
    }

    /// Emit the next piece of the end of the stream into the intermediary
    /// buffer. Returns `None` once the codec is done.
    pub(crate) fn next_finish_output(&mut self) -> Result<Option<usize>> {
        let (codec, buffer) = self.deflate_parts()?;
        match codec.finish(buffer)? {
            (_, n) if n > 0 => Ok(Some(n)),
            (true, _) => Ok(None),
            (false, _) => Err(OxiFlateError::invalid_operation(
                "deflater made no progress while finishing",
            )),
        }
    }

    /// Footer bytes, if a header was written.
    pub(crate) fn footer(&mut self) -> Option<Vec<u8>> {
        if !self.wrote_header {
            return None;
        }
        self.format_writer.as_mut().map(|format| format.footer())
    }

    /// Bytes produced by the last successful output call.
    pub(crate) fn output(&self, len: usize) -> &[u8] {
        &self.buffer[..len]
    }

    /// Drop the codec and the format writer. Idempotent.
    pub(crate) fn release(&mut self) {
        if self.codec.take().is_some() {
            self.format_writer = None;
            debug!(mode = %self.mode, "codec released");
        }
    }
}

impl std::fmt::Debug for StreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEngine")
            .field("mode", &self.mode)
            .field("released", &self.codec.is_none())
            .field("wrote_header", &self.wrote_header)
            .field("wrote_bytes", &self.wrote_bytes)
            .field("buffer_size", &self.buffer.len())
            .finish()
    }
}
