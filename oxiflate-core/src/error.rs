//! Error types for OxiFlate operations.
//!
//! A single error enum covers usage faults (bad arguments, wrong stream
//! direction, misuse of completion tokens), unsupported stream operations,
//! timeouts, and failures propagated from the codec, the container format or
//! the underlying I/O.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum OxiFlateError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// An argument has an invalid value.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// An offset or count lies outside the bounds of the supplied buffer.
    #[error("Argument out of range: {name} ({message})")]
    ArgumentOutOfRange {
        /// Name of the offending argument.
        name: &'static str,
        /// Description of the violated bound.
        message: String,
    },

    /// The operation is not valid in the current state.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the problem.
        message: String,
    },

    /// An asynchronous operation was started while another one is outstanding.
    #[error("Invalid begin call: only one asynchronous operation may be outstanding")]
    InvalidBeginCall,

    /// The stream has already been closed.
    #[error("Cannot access a closed stream")]
    ObjectDisposed,

    /// The operation is never supported by this stream type.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// An asynchronous operation did not complete within its timeout.
    #[error("Operation timed out after {after:?}")]
    Timeout {
        /// The configured timeout.
        after: Duration,
    },

    /// Invalid magic number in a container header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// Unsupported compression method.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: String,
    },

    /// CRC checksum mismatch.
    #[error("CRC mismatch: expected {expected:#x}, computed {computed:#x}")]
    CrcMismatch {
        /// Expected CRC value from the stream.
        expected: u32,
        /// Computed CRC value from data.
        computed: u32,
    },

    /// Corrupted compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid header format.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of file: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiFlateError>;

impl OxiFlateError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an argument out of range error.
    pub fn out_of_range(name: &'static str, message: impl Into<String>) -> Self {
        Self::ArgumentOutOfRange {
            name,
            message: message.into(),
        }
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a not supported error.
    pub fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    /// Create a timeout error.
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }

    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::CrcMismatch { expected, computed }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Whether this error is a programming error on the caller's side rather
    /// than a failure of the data or the I/O.
    pub fn is_usage_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::ArgumentOutOfRange { .. }
                | Self::InvalidOperation { .. }
                | Self::InvalidBeginCall
                | Self::ObjectDisposed
        )
    }

    /// The `std::io` error kind this error maps to.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Io(err) => err.kind(),
            Self::InvalidArgument { .. } | Self::ArgumentOutOfRange { .. } => {
                io::ErrorKind::InvalidInput
            }
            Self::InvalidOperation { .. } | Self::InvalidBeginCall | Self::ObjectDisposed => {
                io::ErrorKind::Other
            }
            Self::NotSupported { .. } => io::ErrorKind::Unsupported,
            Self::Timeout { .. } => io::ErrorKind::TimedOut,
            Self::UnexpectedEof { .. } => io::ErrorKind::UnexpectedEof,
            Self::InvalidMagic { .. }
            | Self::UnsupportedMethod { .. }
            | Self::CrcMismatch { .. }
            | Self::CorruptedData { .. }
            | Self::InvalidHeader { .. } => io::ErrorKind::InvalidData,
        }
    }
}

impl From<io::Error> for OxiFlateError {
    fn from(err: io::Error) -> Self {
        // Errors that went through a std::io trait come back unchanged.
        if !err
            .get_ref()
            .is_some_and(|inner| inner.is::<OxiFlateError>())
        {
            return Self::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<OxiFlateError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Self::Io(io::Error::other(other)),
            None => Self::invalid_operation("I/O error without payload"),
        }
    }
}

impl From<OxiFlateError> for io::Error {
    fn from(err: OxiFlateError) -> Self {
        match err {
            OxiFlateError::Io(inner) => inner,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxiFlateError::invalid_magic(vec![0x1F, 0x8B], vec![0x50, 0x4B]);
        assert!(err.to_string().contains("Invalid magic"));

        let err = OxiFlateError::crc_mismatch(0x12345678, 0xDEADBEEF);
        assert!(err.to_string().contains("CRC mismatch"));

        let err = OxiFlateError::not_supported("seek");
        assert!(err.to_string().contains("seek"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: OxiFlateError = io_err.into();
        assert!(matches!(err, OxiFlateError::Io(_)));

        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_io_roundtrip_keeps_variant() {
        let err: io::Error = OxiFlateError::crc_mismatch(1, 2).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let back: OxiFlateError = err.into();
        assert!(matches!(
            back,
            OxiFlateError::CrcMismatch {
                expected: 1,
                computed: 2
            }
        ));
    }

    #[test]
    fn test_io_kind_mapping() {
        let err: io::Error = OxiFlateError::not_supported("seek").into();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);

        let err: io::Error = OxiFlateError::corrupted(3, "bad block").into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err: io::Error = OxiFlateError::timeout(Duration::from_millis(5)).into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_usage_fault_classification() {
        assert!(OxiFlateError::InvalidBeginCall.is_usage_fault());
        assert!(OxiFlateError::ObjectDisposed.is_usage_fault());
        assert!(OxiFlateError::out_of_range("offset", "past end").is_usage_fault());
        assert!(!OxiFlateError::timeout(Duration::ZERO).is_usage_fault());
        assert!(!OxiFlateError::crc_mismatch(1, 2).is_usage_fault());
    }
}
