//! Codec selection.
//!
//! Stream adapters never pick a codec implementation themselves; they ask
//! the [`CodecFactory`] handed to them at construction. The embedding
//! application chooses the factory once (usually [`default_factory`]) and
//! passes it down explicitly.

use crate::deflate::Deflater;
use crate::inflate::Inflater;
use oxiflate_core::traits::{CompressionLevel, DeflateCodec, InflateCodec};
use std::fmt;
use std::sync::Arc;

/// Creates block codecs for stream adapters.
pub trait CodecFactory: Send + Sync + fmt::Debug {
    /// Short name of the backend, for diagnostics.
    fn name(&self) -> &'static str;

    /// A fresh decompressor.
    fn inflater(&self) -> Box<dyn InflateCodec>;

    /// A fresh compressor at `level`.
    fn deflater(&self, level: CompressionLevel) -> Box<dyn DeflateCodec>;
}

/// Codecs backed by `flate2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flate2Codecs;

impl CodecFactory for Flate2Codecs {
    fn name(&self) -> &'static str {
        "flate2"
    }

    fn inflater(&self) -> Box<dyn InflateCodec> {
        Box::new(Inflater::new())
    }

    fn deflater(&self, level: CompressionLevel) -> Box<dyn DeflateCodec> {
        Box::new(Deflater::new(level))
    }
}

/// The factory used when none is configured.
pub fn default_factory() -> Arc<dyn CodecFactory> {
    Arc::new(Flate2Codecs)
}
