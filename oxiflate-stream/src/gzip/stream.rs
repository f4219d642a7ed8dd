//! GZIP stream facades.
//!
//! [`GzipStream`] and [`AsyncGzipStream`] are the DEFLATE adapters with the
//! GZIP framing installed. Compressing adapters write one member (header,
//! body, CRC-32 and size trailer) as soon as the first byte is written;
//! decompressing adapters check the header and the trailer of one member.

use super::header::GzipHeader;
use crate::async_stream::AsyncDeflateStream;
use crate::deflate_stream::DeflateStream;
use crate::engine::Framing;
use crate::options::StreamOptions;
use oxiflate_core::async_result::{AsyncCallback, AsyncResult, AsyncState};
use oxiflate_core::error::Result;
use oxiflate_core::traits::{CompressionLevel, CompressionMode};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;

fn default_framing(options: &StreamOptions) -> Framing {
    Framing::Gzip(GzipHeader::new().for_level(options.level()))
}

/// GZIP compressing or decompressing adapter over a synchronous stream.
#[derive(Debug)]
pub struct GzipStream<S> {
    inner: DeflateStream<S>,
}

impl<S: Read> GzipStream<S> {
    /// Decompressing adapter with default options.
    pub fn decoder(reader: S) -> Self {
        Self::decoder_with_options(reader, StreamOptions::new())
    }

    /// Decompressing adapter.
    pub fn decoder_with_options(reader: S, options: StreamOptions) -> Self {
        let framing = default_framing(&options);
        Self {
            inner: DeflateStream::decoder_framed(reader, options, framing),
        }
    }

    /// See [`DeflateStream::read_range`].
    pub fn read_range(&mut self, buffer: &mut [u8], offset: usize, count: usize) -> Result<usize> {
        self.inner.read_range(buffer, offset, count)
    }
}

impl<S: Write> GzipStream<S> {
    /// Compressing adapter with default options at `level`.
    pub fn encoder(writer: S, level: CompressionLevel) -> Self {
        Self::encoder_with_options(writer, StreamOptions::new().with_level(level))
    }

    /// Compressing adapter writing the default header.
    pub fn encoder_with_options(writer: S, options: StreamOptions) -> Self {
        let framing = default_framing(&options);
        Self {
            inner: DeflateStream::encoder_framed(writer, options, framing),
        }
    }

    /// Compressing adapter writing `header`.
    pub fn with_header(writer: S, header: GzipHeader, options: StreamOptions) -> Self {
        Self {
            inner: DeflateStream::encoder_framed(writer, options, Framing::Gzip(header)),
        }
    }

    /// See [`DeflateStream::write_range`].
    pub fn write_range(&mut self, buffer: &[u8], offset: usize, count: usize) -> Result<()> {
        self.inner.write_range(buffer, offset, count)
    }
}

impl<S: Read + Write> GzipStream<S> {
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

impl<S> GzipStream<S> {
    /// The underlying DEFLATE adapter.
    pub fn as_deflate_stream(&self) -> &DeflateStream<S> {
        &self.inner
    }

    /// The underlying DEFLATE adapter, mutably.
    pub fn as_deflate_stream_mut(&mut self) -> &mut DeflateStream<S> {
        &mut self.inner
    }

    /// Direction of this adapter.
    pub fn mode(&self) -> CompressionMode {
        self.inner.mode()
    }

    /// Whether the end of the member was reached and its trailer matched.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Reference to the underlying stream, while the adapter holds it.
    pub fn get_ref(&self) -> Option<&S> {
        self.inner.get_ref()
    }

    /// Mutable reference to the underlying stream, while the adapter holds it.
    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.inner.get_mut()
    }

    /// See [`DeflateStream::close`].
    pub fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    /// See [`DeflateStream::into_inner`].
    pub fn into_inner(self) -> Result<S> {
        self.inner.into_inner()
    }
}

impl<S: Read> Read for GzipStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Write> Write for GzipStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.inner, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.inner)
    }
}

impl<S> Seek for GzipStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Seek::seek(&mut self.inner, pos)
    }
}

/// GZIP compressing or decompressing adapter over a Tokio stream.
#[derive(Debug)]
pub struct AsyncGzipStream<S> {
    inner: AsyncDeflateStream<S>,
}

impl<S: AsyncRead + Unpin + Send + 'static> AsyncGzipStream<S> {
    /// Decompressing adapter with default options.
    pub fn decoder(reader: S, handle: Handle) -> Self {
        Self::decoder_with_options(reader, StreamOptions::new(), handle)
    }

    /// Decompressing adapter.
    pub fn decoder_with_options(reader: S, options: StreamOptions, handle: Handle) -> Self {
        let framing = default_framing(&options);
        Self {
            inner: AsyncDeflateStream::decoder_framed(reader, options, framing, handle),
        }
    }

    /// See [`AsyncDeflateStream::begin_read`].
    pub fn begin_read(
        &self,
        count: usize,
        callback: Option<AsyncCallback<Vec<u8>>>,
        state: Option<AsyncState>,
    ) -> Result<AsyncResult<Vec<u8>>> {
        self.inner.begin_read(count, callback, state)
    }

    /// See [`AsyncDeflateStream::end_read`].
    pub fn end_read(&self, token: &AsyncResult<Vec<u8>>) -> Result<Vec<u8>> {
        self.inner.end_read(token)
    }
}

impl<S: AsyncWrite + Unpin + Send + 'static> AsyncGzipStream<S> {
    /// Compressing adapter with default options at `level`.
    pub fn encoder(writer: S, level: CompressionLevel, handle: Handle) -> Self {
        Self::encoder_with_options(writer, StreamOptions::new().with_level(level), handle)
    }

    /// Compressing adapter writing the default header.
    pub fn encoder_with_options(writer: S, options: StreamOptions, handle: Handle) -> Self {
        let framing = default_framing(&options);
        Self {
            inner: AsyncDeflateStream::encoder_framed(writer, options, framing, handle),
        }
    }

    /// Compressing adapter writing `header`.
    pub fn with_header(
        writer: S,
        header: GzipHeader,
        options: StreamOptions,
        handle: Handle,
    ) -> Self {
        Self {
            inner: AsyncDeflateStream::encoder_framed(
                writer,
                options,
                Framing::Gzip(header),
                handle,
            ),
        }
    }

    /// See [`AsyncDeflateStream::begin_write`].
    pub fn begin_write(
        &self,
        data: impl Into<Vec<u8>>,
        callback: Option<AsyncCallback<()>>,
        state: Option<AsyncState>,
    ) -> Result<AsyncResult<()>> {
        self.inner.begin_write(data, callback, state)
    }

    /// See [`AsyncDeflateStream::end_write`].
    pub fn end_write(&self, token: &AsyncResult<()>) -> Result<()> {
        self.inner.end_write(token)
    }
}

impl<S: Send + 'static> AsyncGzipStream<S> {
    /// The underlying DEFLATE adapter.
    pub fn as_deflate_stream(&self) -> &AsyncDeflateStream<S> {
        &self.inner
    }

    /// Direction of this adapter.
    pub fn mode(&self) -> CompressionMode {
        self.inner.mode()
    }

    /// See [`AsyncDeflateStream::close`].
    pub async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    /// See [`AsyncDeflateStream::into_inner`].
    pub async fn into_inner(self) -> Result<S> {
        self.inner.into_inner().await
    }
}
