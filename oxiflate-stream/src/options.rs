//! Adapter configuration.

use oxiflate_core::CompressionLevel;
use oxiflate_deflate::{CodecFactory, default_factory};
use std::sync::Arc;

/// Default size of the intermediary buffer between the underlying stream and
/// the codec.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Smallest accepted intermediary buffer.
pub const MIN_BUFFER_SIZE: usize = 64;

/// Options for building a stream adapter.
///
/// ```rust
/// use oxiflate_core::CompressionLevel;
/// use oxiflate_stream::StreamOptions;
///
/// let options = StreamOptions::new()
///     .with_level(CompressionLevel::BEST)
///     .with_buffer_size(4096)
///     .with_leave_open(true);
/// assert_eq!(options.buffer_size(), 4096);
/// ```
#[derive(Debug, Clone)]
pub struct StreamOptions {
    buffer_size: usize,
    leave_open: bool,
    level: CompressionLevel,
    codecs: Arc<dyn CodecFactory>,
}

impl StreamOptions {
    /// Default options: 8KB buffer, close the stream on close, level 6,
    /// codecs from [`default_factory`].
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            leave_open: false,
            level: CompressionLevel::DEFAULT,
            codecs: default_factory(),
        }
    }

    /// Set the intermediary buffer size (raised to [`MIN_BUFFER_SIZE`]).
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(MIN_BUFFER_SIZE);
        self
    }

    /// Keep the underlying stream open when the adapter is closed.
    pub fn with_leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }

    /// Compression level used in compress mode.
    pub fn with_level(mut self, level: impl Into<CompressionLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// Codec strategy.
    pub fn with_codecs(mut self, codecs: Arc<dyn CodecFactory>) -> Self {
        self.codecs = codecs;
        self
    }

    /// Intermediary buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Whether the underlying stream survives close.
    pub fn leave_open(&self) -> bool {
        self.leave_open
    }

    /// Compression level.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Codec strategy.
    pub fn codecs(&self) -> &Arc<dyn CodecFactory> {
        &self.codecs
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}
