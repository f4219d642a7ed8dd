//! Asynchronous DEFLATE stream adapter with Begin/End operations.
//!
//! [`AsyncDeflateStream`] runs its reads and writes on a Tokio runtime and
//! reports them through [`AsyncResult`] completion tokens. At most one
//! operation may be outstanding; the next Begin is accepted only after the
//! previous token was ended.
//!
//! ```rust
//! use oxiflate_core::CompressionLevel;
//! use oxiflate_stream::AsyncDeflateStream;
//!
//! let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
//!
//! let encoder = AsyncDeflateStream::encoder(Vec::new(), CompressionLevel::DEFAULT, runtime.handle().clone());
//! let token = encoder.begin_write(b"Hello, World!".to_vec(), None, None).unwrap();
//! encoder.end_write(&token).unwrap();
//! let compressed = runtime.block_on(encoder.into_inner()).unwrap();
//!
//! let decoder = AsyncDeflateStream::decoder(std::io::Cursor::new(compressed), runtime.handle().clone());
//! let token = decoder.begin_read(256, None, None).unwrap();
//! assert_eq!(decoder.end_read(&token).unwrap(), b"Hello, World!");
//! ```

use crate::deflate_stream::ensure_mode;
use crate::engine::{Framing, StreamEngine};
use crate::options::StreamOptions;
use oxiflate_core::async_result::{AsyncCallback, AsyncResult, AsyncState, OperationTag};
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressionLevel, CompressionMode};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Tag of tokens returned by [`AsyncDeflateStream::begin_read`].
pub const READ: OperationTag = OperationTag::new("deflate-read");

/// Tag of tokens returned by [`AsyncDeflateStream::begin_write`].
pub const WRITE: OperationTag = OperationTag::new("deflate-write");

type CloseFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
type CloseFn<S> = for<'a> fn(&'a mut Core<S>, bool) -> CloseFuture<'a>;

struct Core<S> {
    engine: StreamEngine,
    stream: Option<S>,
}

/// Token of the latest Begin call.
enum Issued {
    Read(AsyncResult<Vec<u8>>),
    Write(AsyncResult<()>),
}

impl Issued {
    /// Abort the operation if its caller already gave up on it.
    fn abort_if_abandoned(&self) {
        match self {
            Issued::Read(token) if token.is_ended() => token.abort(),
            Issued::Write(token) if token.is_ended() => token.abort(),
            _ => {}
        }
    }
}

struct Inner<S> {
    mode: CompressionMode,
    leave_open: bool,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    issued: std::sync::Mutex<Option<Issued>>,
    close_with: CloseFn<S>,
    core: Mutex<Core<S>>,
}

/// DEFLATE compressing or decompressing adapter over a Tokio stream.
pub struct AsyncDeflateStream<S> {
    inner: Arc<Inner<S>>,
    handle: Handle,
    timeout: Option<Duration>,
    close_on_drop: fn(&AsyncDeflateStream<S>),
}

async fn drain<W: AsyncWrite + Unpin>(engine: &mut StreamEngine, sink: &mut W) -> Result<()> {
    while let Some(n) = engine.next_output()? {
        sink.write_all(engine.output(n)).await?;
    }
    Ok(())
}

impl<S> Core<S> {
    fn close_reader(&mut self, leave_open: bool) -> CloseFuture<'_> {
        self.engine.release();
        if !leave_open && self.stream.take().is_some() {
            debug!("underlying stream closed");
        }
        Box::pin(std::future::ready(Ok(())))
    }
}

impl<S: AsyncRead + Unpin> Core<S> {
    async fn read(&mut self, count: usize) -> Result<Vec<u8>> {
        let reader = self.stream.as_mut().ok_or(OxiFlateError::ObjectDisposed)?;
        let mut out = vec![0u8; count];

        // Ends at the first output, the end of the compressed stream or the
        // end of the underlying stream.
        loop {
            let n = self.engine.inflate(&mut out)?;
            if n > 0 || count == 0 || self.engine.is_finished() {
                out.truncate(n);
                return Ok(out);
            }

            let read = reader.read(self.engine.input_buffer()).await?;
            if read == 0 {
                trace!("underlying stream exhausted");
                out.clear();
                return Ok(out);
            }
            self.engine.supply_input(read)?;
        }
    }
}

impl<S: AsyncWrite + Unpin + Send> Core<S> {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let sink = self.stream.as_mut().ok_or(OxiFlateError::ObjectDisposed)?;

        if let Some(header) = self.engine.begin_write(data)? {
            sink.write_all(&header).await?;
        }
        drain(&mut self.engine, sink).await?;
        self.engine.set_input(data)?;
        drain(&mut self.engine, sink).await
    }

    async fn finish(&mut self) -> Result<()> {
        let Some(sink) = self.stream.as_mut() else {
            return Ok(());
        };
        if !self.engine.needs_finish() {
            return Ok(());
        }
        drain(&mut self.engine, sink).await?;
        while let Some(n) = self.engine.next_finish_output()? {
            sink.write_all(self.engine.output(n)).await?;
        }
        if let Some(footer) = self.engine.footer() {
            sink.write_all(&footer).await?;
        }
        Ok(())
    }

    fn close_writer(&mut self, leave_open: bool) -> CloseFuture<'_> {
        Box::pin(async move {
            let mut result = self.finish().await;
            self.engine.release();

            if !leave_open {
                if let Some(mut sink) = self.stream.take() {
                    let shutdown = sink.shutdown().await;
                    drop(sink);
                    debug!("underlying stream closed");
                    if result.is_ok() {
                        result = shutdown.map_err(OxiFlateError::from);
                    }
                }
            }
            result
        })
    }
}

impl<S: Send + 'static> AsyncDeflateStream<S> {
    fn build(
        stream: S,
        mode: CompressionMode,
        options: StreamOptions,
        framing: Framing,
        handle: Handle,
        close_with: CloseFn<S>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                mode,
                leave_open: options.leave_open(),
                closed: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                issued: std::sync::Mutex::new(None),
                close_with,
                core: Mutex::new(Core {
                    engine: StreamEngine::new(mode, &options, &framing),
                    stream: Some(stream),
                }),
            }),
            handle,
            timeout: None,
            close_on_drop: Self::close_detached,
        }
    }

    /// Give every later operation a timeout.
    ///
    /// A timed-out operation keeps running in the background; the next one
    /// waits for it before touching the codec. Closing the adapter aborts it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Direction of this adapter.
    pub fn mode(&self) -> CompressionMode {
        self.inner.mode
    }

    /// Whether reading is possible.
    pub fn can_read(&self) -> bool {
        !self.is_closed() && self.inner.mode == CompressionMode::Decompress
    }

    /// Whether writing is possible.
    pub fn can_write(&self) -> bool {
        !self.is_closed() && self.inner.mode == CompressionMode::Compress
    }

    /// Always false.
    pub fn can_seek(&self) -> bool {
        false
    }

    /// Not supported.
    pub fn seek(&self, _pos: std::io::SeekFrom) -> Result<u64> {
        Err(OxiFlateError::not_supported("seek"))
    }

    /// Not supported.
    pub fn set_length(&self, _len: u64) -> Result<()> {
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
    pub fn set_position(&self, _position: u64) -> Result<()> {
        Err(OxiFlateError::not_supported("set_position"))
    }

    /// Number of outstanding operations (0 or 1).
    pub fn pending_operations(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.is_closed() {
            return Err(OxiFlateError::ObjectDisposed);
        }
        Ok(())
    }

    fn acquire(&self) -> Result<()> {
        self.inner
            .in_flight
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| OxiFlateError::InvalidBeginCall)
    }

    fn release(&self) {
        self.inner.in_flight.store(0, Ordering::Release);
    }

    fn issued(&self) -> std::sync::MutexGuard<'_, Option<Issued>> {
        self.inner
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Tokens of other adapters are rejected unless already ended, in which
    /// case End reports the repeated call.
    fn ensure_issued(&self, ended: bool, is_ours: impl FnOnce(&Issued) -> bool) -> Result<()> {
        if ended || self.issued().as_ref().is_some_and(is_ours) {
            return Ok(());
        }
        Err(OxiFlateError::invalid_argument(
            "completion token was not issued by this stream",
        ))
    }

    /// Stop an operation whose token timed out, so it no longer holds the
    /// codec.
    fn abort_abandoned(&self) {
        if let Some(issued) = self.issued().as_ref() {
            issued.abort_if_abandoned();
        }
    }

    fn close_detached(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.abort_abandoned();

        let inner = Arc::clone(&self.inner);
        self.handle.spawn(async move {
            let mut core = inner.core.lock().await;
            match (inner.close_with)(&mut *core, inner.leave_open).await {
                Ok(()) => debug!("async deflate stream closed on drop"),
                Err(e) => warn!(error = %e, "failed to close dropped async deflate stream"),
            }
        });
    }

    /// Close the adapter.
    ///
    /// Waits for an outstanding operation, completes the compressed stream in
    /// compress mode, releases the codec and, unless `leave_open` was set,
    /// shuts the underlying stream down. An operation that timed out is
    /// aborted instead of awaited. The first error is returned; the stream is
    /// closed regardless. Later calls do nothing.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.abort_abandoned();
        let mut core = self.inner.core.lock().await;
        (self.inner.close_with)(&mut *core, self.inner.leave_open).await
    }

    /// Close the adapter and return the underlying stream regardless of
    /// `leave_open`.
    pub async fn into_inner(self) -> Result<S> {
        self.abort_abandoned();
        let mut core = self.inner.core.lock().await;
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            (self.inner.close_with)(&mut *core, true).await?;
        }
        core.stream.take().ok_or(OxiFlateError::ObjectDisposed)
    }
}

impl<S: AsyncRead + Unpin + Send + 'static> AsyncDeflateStream<S> {
    /// Decompressing adapter with default options.
    pub fn decoder(reader: S, handle: Handle) -> Self {
        Self::decoder_with_options(reader, StreamOptions::new(), handle)
    }

    /// Decompressing adapter.
    pub fn decoder_with_options(reader: S, options: StreamOptions, handle: Handle) -> Self {
        Self::decoder_framed(reader, options, Framing::Raw, handle)
    }

    pub(crate) fn decoder_framed(
        reader: S,
        options: StreamOptions,
        framing: Framing,
        handle: Handle,
    ) -> Self {
        Self::build(
            reader,
            CompressionMode::Decompress,
            options,
            framing,
            handle,
            Core::close_reader,
        )
    }

    /// Start reading up to `count` decompressed bytes.
    ///
    /// Wrong direction, a closed adapter and an outstanding operation fail
    /// here. Everything else, including decoding errors, is reported by
    /// [`end_read`](Self::end_read). The operation completes synchronously
    /// when buffered input already yields output.
    pub fn begin_read(
        &self,
        count: usize,
        callback: Option<AsyncCallback<Vec<u8>>>,
        state: Option<AsyncState>,
    ) -> Result<AsyncResult<Vec<u8>>> {
        ensure_mode(self.inner.mode, CompressionMode::Decompress)?;
        self.ensure_not_closed()?;
        self.acquire()?;

        let inner = Arc::clone(&self.inner);
        let operation = async move { inner.core.lock().await.read(count).await };
        let token = AsyncResult::begin(
            &self.handle,
            callback,
            state,
            operation,
            READ,
            self.timeout,
        );
        *self.issued() = Some(Issued::Read(token.clone()));
        Ok(token)
    }

    /// Wait for a read started by [`begin_read`](Self::begin_read) and
    /// return the bytes read. An empty result means end of stream.
    pub fn end_read(&self, token: &AsyncResult<Vec<u8>>) -> Result<Vec<u8>> {
        self.ensure_issued(token.is_ended(), |issued| {
            matches!(issued, Issued::Read(ours) if ours.ptr_eq(token))
        })?;
        token.end_with(READ, || self.release())
    }
}

impl<S: AsyncWrite + Unpin + Send + 'static> AsyncDeflateStream<S> {
    /// Compressing adapter with default options at `level`.
    pub fn encoder(writer: S, level: CompressionLevel, handle: Handle) -> Self {
        Self::encoder_with_options(writer, StreamOptions::new().with_level(level), handle)
    }

    /// Compressing adapter.
    pub fn encoder_with_options(writer: S, options: StreamOptions, handle: Handle) -> Self {
        Self::encoder_framed(writer, options, Framing::Raw, handle)
    }

    pub(crate) fn encoder_framed(
        writer: S,
        options: StreamOptions,
        framing: Framing,
        handle: Handle,
    ) -> Self {
        Self::build(
            writer,
            CompressionMode::Compress,
            options,
            framing,
            handle,
            Core::close_writer,
        )
    }

    /// Start compressing `data`.
    ///
    /// Usage faults fail here; I/O and codec errors are reported by
    /// [`end_write`](Self::end_write).
    pub fn begin_write(
        &self,
        data: impl Into<Vec<u8>>,
        callback: Option<AsyncCallback<()>>,
        state: Option<AsyncState>,
    ) -> Result<AsyncResult<()>> {
        ensure_mode(self.inner.mode, CompressionMode::Compress)?;
        self.ensure_not_closed()?;
        self.acquire()?;

        let data = data.into();
        let inner = Arc::clone(&self.inner);
        let operation = async move { inner.core.lock().await.write(&data).await };
        let token = AsyncResult::begin(
            &self.handle,
            callback,
            state,
            operation,
            WRITE,
            self.timeout,
        );
        *self.issued() = Some(Issued::Write(token.clone()));
        Ok(token)
    }

    /// Wait for a write started by [`begin_write`](Self::begin_write).
    pub fn end_write(&self, token: &AsyncResult<()>) -> Result<()> {
        self.ensure_issued(token.is_ended(), |issued| {
            matches!(issued, Issued::Write(ours) if ours.ptr_eq(token))
        })?;
        token.end_with(WRITE, || self.release())
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send + 'static> AsyncDeflateStream<S> {
    /// Adapter over a bidirectional stream with default options.
    pub fn new(stream: S, mode: CompressionMode, handle: Handle) -> Self {
        Self::with_options(stream, mode, StreamOptions::new(), handle)
    }

    /// Adapter over a bidirectional stream.
    pub fn with_options(
        stream: S,
        mode: CompressionMode,
        options: StreamOptions,
        handle: Handle,
    ) -> Self {
        match mode {
            CompressionMode::Decompress => Self::decoder_with_options(stream, options, handle),
            CompressionMode::Compress => Self::encoder_with_options(stream, options, handle),
        }
    }
}

impl<S> Drop for AsyncDeflateStream<S> {
    fn drop(&mut self) {
        (self.close_on_drop)(self);
    }
}

impl<S> Drop for Inner<S> {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        if !*self.closed.get_mut() && core.engine.needs_finish() {
            warn!("async deflate stream dropped without close, compressed output is incomplete");
        }
    }
}

impl<S> std::fmt::Debug for AsyncDeflateStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDeflateStream")
            .field("mode", &self.inner.mode)
            .field("leave_open", &self.inner.leave_open)
            .field("closed", &self.inner.closed.load(Ordering::Acquire))
            .field("in_flight", &self.inner.in_flight.load(Ordering::Acquire))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::runtime::{Builder, Runtime};

    fn runtime() -> Runtime {
        Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_wrong_family_is_immediate() {
        let rt = runtime();
        let decoder = AsyncDeflateStream::new(
            Cursor::new(Vec::new()),
            CompressionMode::Decompress,
            rt.handle().clone(),
        );
        assert!(matches!(
            decoder.begin_write(b"x".to_vec(), None, None),
            Err(OxiFlateError::InvalidOperation { .. })
        ));
        assert_eq!(decoder.pending_operations(), 0);
    }

    #[test]
    fn test_begin_after_close() {
        let rt = runtime();
        let encoder = AsyncDeflateStream::encoder(Vec::new(), CompressionLevel::FAST, rt.handle().clone());
        rt.block_on(encoder.close()).unwrap();
        rt.block_on(encoder.close()).unwrap();
        assert!(!encoder.can_write());
        assert!(matches!(
            encoder.begin_write(b"late".to_vec(), None, None),
            Err(OxiFlateError::ObjectDisposed)
        ));
    }

    #[test]
    fn test_counter_released_by_end() {
        let rt = runtime();
        let encoder = AsyncDeflateStream::encoder(Vec::new(), CompressionLevel::FAST, rt.handle().clone());
        let token = encoder.begin_write(b"one".to_vec(), None, None).unwrap();
        assert_eq!(encoder.pending_operations(), 1);
        encoder.end_write(&token).unwrap();
        assert_eq!(encoder.pending_operations(), 0);
        assert!(encoder.end_write(&token).is_err());
    }

    #[test]
    fn test_unsupported_operations() {
        let rt = runtime();
        let decoder = AsyncDeflateStream::decoder(Cursor::new(Vec::new()), rt.handle().clone());
        assert!(!decoder.can_seek());
        assert!(matches!(
            decoder.seek(std::io::SeekFrom::Start(0)),
            Err(OxiFlateError::NotSupported { .. })
        ));
        assert!(decoder.length().is_err());
        assert!(decoder.position().is_err());
        assert!(decoder.set_length(1).is_err());
        assert!(matches!(
            decoder.set_position(0),
            Err(OxiFlateError::NotSupported { .. })
        ));
    }
}
