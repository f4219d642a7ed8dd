//! # OxiFlate Stream
//!
//! DEFLATE (RFC 1951) and GZIP (RFC 1952) stream adapters.
//!
//! An adapter wraps one underlying stream in one direction:
//!
//! | Adapter | Underlying stream | Operations |
//! |---------|-------------------|------------|
//! | [`DeflateStream`] / [`GzipStream`] | `std::io::Read` / `Write` | `read_range`, `write_range`, `Read`, `Write`, `close` |
//! | [`AsyncDeflateStream`] / [`AsyncGzipStream`] | `tokio::io::AsyncRead` / `AsyncWrite` | `begin_read` / `end_read`, `begin_write` / `end_write`, `close` |
//!
//! Decompressing adapters pull compressed bytes from the underlying stream
//! on demand; compressing adapters push compressed bytes as the codec
//! produces them and terminate the stream on close. Writing nothing produces
//! nothing, not even a GZIP header. Seeking, length and position are never
//! supported.
//!
//! The block codec comes from the [`CodecFactory`](oxiflate_deflate::CodecFactory)
//! in [`StreamOptions`].
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::CompressionLevel;
//! use oxiflate_stream::GzipStream;
//! use std::io::{Read, Write};
//!
//! let mut encoder = GzipStream::encoder(Vec::new(), CompressionLevel::BEST);
//! encoder.write_all(b"Hello, World!").unwrap();
//! let member = encoder.into_inner().unwrap();
//!
//! let mut decoder = GzipStream::decoder(&member[..]);
//! let mut buffer = [0u8; 256];
//! let n = decoder.read(&mut buffer).unwrap();
//! assert_eq!(&buffer[..n], b"Hello, World!");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod async_stream;
pub mod deflate_stream;
mod engine;
pub mod gzip;
pub mod options;

pub use async_stream::AsyncDeflateStream;
pub use deflate_stream::DeflateStream;
pub use gzip::{AsyncGzipStream, GzipHeader, GzipStream};
pub use options::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE, StreamOptions};
