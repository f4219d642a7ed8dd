//! # OxiFlate Deflate
//!
//! Block codecs for the OxiFlate stream adapters.
//!
//! The bit-level DEFLATE work (RFC 1951) is done by `flate2`; this crate
//! wraps its raw compressor and decompressor in the push/pull interface of
//! [`oxiflate_core::traits::InflateCodec`] and
//! [`oxiflate_core::traits::DeflateCodec`], and provides the
//! [`CodecFactory`] strategy the adapters use to obtain codecs.
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::CompressionLevel;
//! use oxiflate_deflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, CompressionLevel::DEFAULT).unwrap();
//!
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Fast compression
//! - Level 4-6: Balanced (default is 6)
//! - Level 7-9: Best compression (slower)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod factory;
pub mod inflate;

// Re-exports
pub use deflate::{Deflater, deflate};
pub use factory::{CodecFactory, Flate2Codecs, default_factory};
pub use inflate::{Inflater, inflate};
