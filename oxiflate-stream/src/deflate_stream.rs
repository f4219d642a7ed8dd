//! Synchronous DEFLATE stream adapter.
//!
//! [`DeflateStream`] wraps one underlying stream in one direction:
//!
//! - **Decompress**: compressed bytes are pulled from a [`Read`] stream on
//!   demand and plain bytes are handed out through [`DeflateStream::read_range`]
//!   and [`Read`].
//! - **Compress**: plain bytes are accepted through
//!   [`DeflateStream::write_range`] and [`Write`], compressed bytes are pushed
//!   to a [`Write`] stream as they become available, and the stream is
//!   terminated on [`DeflateStream::close`].
//!
//! # Example
//!
//! ```rust
//! use oxiflate_core::CompressionLevel;
//! use oxiflate_stream::DeflateStream;
//! use std::io::{Read, Write};
//!
//! let mut encoder = DeflateStream::encoder(Vec::new(), CompressionLevel::DEFAULT);
//! encoder.write_all(b"Hello, World!").unwrap();
//! let compressed = encoder.into_inner().unwrap();
//!
//! let mut decoder = DeflateStream::decoder(&compressed[..]);
//! let mut text = String::new();
//! decoder.read_to_string(&mut text).unwrap();
//! assert_eq!(text, "Hello, World!");
//! ```

use crate::engine::{Framing, StreamEngine};
use crate::options::StreamOptions;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressionLevel, CompressionMode};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, trace, warn};

type CloseFn<S> = fn(&mut DeflateStream<S>) -> Result<()>;

/// DEFLATE compressing or decompressing adapter over a synchronous stream.
pub struct DeflateStream<S> {
    engine: StreamEngine,
    /// `None` once the stream was closed or handed back.
    stream: Option<S>,
    leave_open: bool,
    closed: bool,
    /// Picked at construction, where the stream's capabilities are known.
    close_with: CloseFn<S>,
}

/// Check that `offset..offset + count` lies inside a buffer of `len` bytes.
pub(crate) fn validate_range(len: usize, offset: usize, count: usize) -> Result<()> {
    match offset.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(OxiFlateError::out_of_range(
            "count",
            format!("offset {offset} + count {count} exceeds buffer length {len}"),
        )),
    }
}

pub(crate) fn ensure_mode(actual: CompressionMode, expected: CompressionMode) -> Result<()> {
    if actual == expected {
        return Ok(());
    }
    Err(OxiFlateError::invalid_operation(match expected {
        CompressionMode::Decompress => "reading requires a decompressing stream",
        CompressionMode::Compress => "writing requires a compressing stream",
    }))
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Write every compressed chunk the codec can produce right now.
fn drain<W: Write>(engine: &mut StreamEngine, sink: &mut W) -> Result<()> {
    while let Some(n) = engine.next_output()? {
        sink.write_all(engine.output(n))?;
    }
    Ok(())
}

/// Terminate the compressed stream: pending output, final block, footer.
fn finish<W: Write>(engine: &mut StreamEngine, sink: &mut W) -> Result<()> {
    if !engine.needs_finish() {
        return Ok(());
    }
    drain(engine, sink)?;
    while let Some(n) = engine.next_finish_output()? {
        sink.write_all(engine.output(n))?;
    }
    if let Some(footer) = engine.footer() {
        sink.write_all(&footer)?;
    }
    Ok(())
}

impl<S> DeflateStream<S> {
    fn build(
        stream: S,
        mode: CompressionMode,
        options: StreamOptions,
        framing: Framing,
        close_with: CloseFn<S>,
    ) -> Self {
        Self {
            engine: StreamEngine::new(mode, &options, &framing),
            stream: Some(stream),
            leave_open: options.leave_open(),
            closed: false,
            close_with,
        }
    }

    /// Direction of this adapter.
    pub fn mode(&self) -> CompressionMode {
        self.engine.mode()
    }

    /// Whether reading is possible.
    pub fn can_read(&self) -> bool {
        !self.closed && self.engine.mode() == CompressionMode::Decompress
    }

    /// Whether writing is possible.
    pub fn can_write(&self) -> bool {
        !self.closed && self.engine.mode() == CompressionMode::Compress
    }

    /// Always false.
    pub fn can_seek(&self) -> bool {
        false
    }

    /// Whether a decompressing adapter reached the end of the compressed
    /// stream. Reading stops silently at the end of a truncated stream, so
    /// this is how callers tell the two apart.
    pub fn is_finished(&self) -> bool {
        self.engine.is_finished()
    }

    /// Reference to the underlying stream, while the adapter holds it.
    pub fn get_ref(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// Mutable reference to the underlying stream, while the adapter holds it.
    ///
    /// Reading from or writing to it directly corrupts the compressed stream.
    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    /// Close the adapter.
    ///
    /// In compress mode the compressed stream (and footer) is completed
    /// first. The codec is released and, unless `leave_open` was set, the
    /// underlying stream is flushed and dropped, even when completing the
    /// stream failed; the first error is returned. Later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        (self.close_with)(self)
    }

    /// Close the adapter and return the underlying stream regardless of
    /// `leave_open`.
    pub fn into_inner(mut self) -> Result<S> {
        self.leave_open = true;
        self.close()?;
        self.stream.take().ok_or(OxiFlateError::ObjectDisposed)
    }

    /// Fails with `ObjectDisposed` after close; otherwise does nothing.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_not_closed()
    }

    /// Not supported.
    pub fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(OxiFlateError::not_supported("seek"))
    }

    /// Not supported.
    pub fn set_length(&mut self, _len: u64) -> Result<()> {
        Err(OxiFlateError::not_supported("set_length"))
    }

    /// Not supported.
    pub fn length(&self) -> Result<u64> {
        Err(OxiFlateError::not_supported("length"))
    }

    /// Not supported.
    pub fn position(&self) -> Result<u64> {
        Err(OxiFlateError::not_supported("position"))
    }

    /// Not supported.
    pub fn set_position(&mut self, _position: u64) -> Result<()> {
        Err(OxiFlateError::not_supported("set_position"))
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed || self.engine.is_released() {
            return Err(OxiFlateError::ObjectDisposed);
        }
        Ok(())
    }

    fn close_reader(&mut self) -> Result<()> {
        self.engine.release();
        if !self.leave_open && self.stream.take().is_some() {
            debug!("underlying stream closed");
        }
        Ok(())
    }
}

impl<S: Read> DeflateStream<S> {
    /// Decompressing adapter with default options.
    pub fn decoder(reader: S) -> Self {
        Self::decoder_with_options(reader, StreamOptions::new())
    }

    /// Decompressing adapter.
    pub fn decoder_with_options(reader: S, options: StreamOptions) -> Self {
        Self::decoder_framed(reader, options, Framing::Raw)
    }

    pub(crate) fn decoder_framed(reader: S, options: StreamOptions, framing: Framing) -> Self {
        Self::build(
            reader,
            CompressionMode::Decompress,
            options,
            framing,
            Self::close_reader,
        )
    }

    /// Read up to `count` decompressed bytes into `buffer[offset..]`.
    ///
    /// Returns the number of bytes placed, which is less than `count` only
    /// at the end of the compressed stream (or of the underlying stream).
    pub fn read_range(&mut self, buffer: &mut [u8], offset: usize, count: usize) -> Result<usize> {
        ensure_mode(self.engine.mode(), CompressionMode::Decompress)?;
        validate_range(buffer.len(), offset, count)?;
        self.ensure_not_closed()?;

        let target = &mut buffer[offset..offset + count];
        let reader = self.stream.as_mut().ok_or(OxiFlateError::ObjectDisposed)?;
        let mut filled = 0;

        loop {
            filled += self.engine.inflate(&mut target[filled..])?;
            if filled == target.len() || self.engine.is_finished() {
                break;
            }

            let n = read_some(reader, self.engine.input_buffer())?;
            if n == 0 {
                trace!(filled, "underlying stream exhausted");
                break;
            }
            self.engine.supply_input(n)?;
        }

        Ok(filled)
    }
}

impl<S: Write> DeflateStream<S> {
    /// Compressing adapter with default options at `level`.
    pub fn encoder(writer: S, level: CompressionLevel) -> Self {
        Self::encoder_with_options(writer, StreamOptions::new().with_level(level))
    }

    /// Compressing adapter.
    pub fn encoder_with_options(writer: S, options: StreamOptions) -> Self {
        Self::encoder_framed(writer, options, Framing::Raw)
    }

    pub(crate) fn encoder_framed(writer: S, options: StreamOptions, framing: Framing) -> Self {
        Self::build(
            writer,
            CompressionMode::Compress,
            options,
            framing,
            Self::close_writer,
        )
    }

    /// Compress `buffer[offset..offset + count]`.
    ///
    /// Compressed output the codec produces along the way is written to the
    /// underlying stream before this returns.
    pub fn write_range(&mut self, buffer: &[u8], offset: usize, count: usize) -> Result<()> {
        ensure_mode(self.engine.mode(), CompressionMode::Compress)?;
        validate_range(buffer.len(), offset, count)?;
        self.ensure_not_closed()?;

        let data = &buffer[offset..offset + count];
        let sink = self.stream.as_mut().ok_or(OxiFlateError::ObjectDisposed)?;

        if let Some(header) = self.engine.begin_write(data)? {
            sink.write_all(&header)?;
        }
        drain(&mut self.engine, sink)?;
        self.engine.set_input(data)?;
        drain(&mut self.engine, sink)
    }

    fn close_writer(&mut self) -> Result<()> {
        let mut result = match self.stream.as_mut() {
            Some(sink) => finish(&mut self.engine, sink),
            None => Ok(()),
        };
        self.engine.release();

        if !self.leave_open {
            if let Some(mut sink) = self.stream.take() {
                let flushed = sink.flush();
                drop(sink);
                debug!("underlying stream closed");
                if result.is_ok() {
                    result = flushed.map_err(OxiFlateError::from);
                }
            }
        }
        result
    }
}

impl<S: Read + Write> DeflateStream<S> {
    /// Adapter over a bidirectional stream with default options.
    pub fn new(stream: S, mode: CompressionMode) -> Self {
        Self::with_options(stream, mode, StreamOptions::new())
    }

    /// Adapter over a bidirectional stream.
    pub fn with_options(stream: S, mode: CompressionMode, options: StreamOptions) -> Self {
        match mode {
            CompressionMode::Decompress => Self::decoder_with_options(stream, options),
            CompressionMode::Compress => Self::encoder_with_options(stream, options),
        }
    }
}

impl<S> Drop for DeflateStream<S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close deflate stream on drop");
        }
    }
}

impl<S> std::fmt::Debug for DeflateStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateStream")
            .field("engine", &self.engine)
            .field("has_stream", &self.stream.is_some())
            .field("leave_open", &self.leave_open)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<S: Read> Read for DeflateStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(self.read_range(buf, 0, len)?)
    }
}

impl<S: Write> Write for DeflateStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_range(buf, 0, buf.len())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(DeflateStream::flush(self)?)
    }
}

impl<S> Seek for DeflateStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(DeflateStream::seek(self, pos)?)
    }
}
