//! # OxiFlate Core
//!
//! Core components shared by the OxiFlate crates:
//!
//! - [`traits`]: Block codec and container format traits, compression mode and level
//! - [`crc`]: CRC-32 for container trailers
//! - [`error`]: Error types
//! - [`async_result`]: Begin/End completion tokens (feature `async-io`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Stream adapters                                     │
//! │     DeflateStream, GzipStream, Begin/End async ops      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Format strategy                                     │
//! │     GZIP header / CRC / footer                          │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Block codec                                         │
//! │     Inflater / Deflater (flate2)                        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L0: Core (this crate)                                   │
//! │     traits, CRC-32, errors, completion tokens           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::crc::Crc32;
//! use oxiflate_core::traits::CompressionMode;
//!
//! let mode: CompressionMode = "compress".parse().unwrap();
//! assert_eq!(mode, CompressionMode::Compress);
//!
//! let crc = Crc32::compute(b"Hello, World!");
//! assert_eq!(crc, 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "async-io")]
pub mod async_result;
pub mod crc;
pub mod error;
pub mod traits;

// Re-exports for convenience
#[cfg(feature = "async-io")]
pub use async_result::{AsyncCallback, AsyncResult, AsyncState, OperationTag, SingleEntryGate};
pub use crc::Crc32;
pub use error::{OxiFlateError, Result};
pub use traits::{
    CompressionLevel, CompressionMode, DeflateCodec, FormatReader, FormatWriter, InflateCodec,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::crc::Crc32;
    pub use crate::error::{OxiFlateError, Result};
    pub use crate::traits::{
        CompressionLevel, CompressionMode, DeflateCodec, FormatReader, FormatWriter, InflateCodec,
    };
}
