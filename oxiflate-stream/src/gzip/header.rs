//! GZIP member header (RFC 1952).

use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::{CompressionLevel, Crc32};
use std::time::{SystemTime, UNIX_EPOCH};

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// Size of the fixed part of the header.
pub const FIXED_HEADER_SIZE: usize = 10;

/// Longest accepted FNAME or FCOMMENT field, terminator excluded.
pub const MAX_FIELD_SIZE: usize = 64 * 1024;

/// GZIP header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
    /// Bits that must be zero.
    pub const RESERVED: u8 = 0xE0;
}

/// GZIP file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// Compression method (should be 8 for DEFLATE).
    pub method: u8,
    /// Flags.
    pub flags: u8,
    /// Modification time (Unix timestamp).
    pub mtime: u32,
    /// Extra flags.
    pub xfl: u8,
    /// Operating system.
    pub os: u8,
    /// Extra field payload (if FEXTRA flag set).
    pub extra: Option<Vec<u8>>,
    /// Original filename (if FNAME flag set).
    pub filename: Option<String>,
    /// Comment (if FCOMMENT flag set).
    pub comment: Option<String>,
    /// Header CRC16 (if FHCRC flag set).
    pub header_crc: Option<u16>,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            method: CM_DEFLATE,
            flags: 0,
            mtime: 0,
            xfl: 0,
            os: 255, // Unknown OS
            extra: None,
            filename: None,
            comment: None,
            header_crc: None,
        }
    }
}

impl GzipHeader {
    /// Create a new GZIP header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the original filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.flags |= flags::FNAME;
        self.filename = Some(filename.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.flags |= flags::FCOMMENT;
        self.comment = Some(comment.into());
        self
    }

    /// Set the extra field payload.
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Self {
        self.flags |= flags::FEXTRA;
        self.extra = Some(extra.into());
        self
    }

    /// Protect the header with a CRC16.
    pub fn with_header_crc(mut self) -> Self {
        self.flags |= flags::FHCRC;
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set the modification time to now.
    pub fn with_mtime_now(mut self) -> Self {
        self.mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        self
    }

    /// Derive the XFL byte from the compression level.
    pub fn for_level(mut self, level: CompressionLevel) -> Self {
        self.xfl = match level.level() {
            0..=1 => 4, // Fastest
            9 => 2,     // Maximum compression
            _ => 0,
        };
        self
    }

    /// Serialize the header.
    ///
    /// Optional fields are written according to `flags`; a flagged field
    /// without a value is written empty.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_HEADER_SIZE);
        out.extend_from_slice(&GZIP_MAGIC);
        out.push(self.method);
        out.push(self.flags);
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(self.xfl);
        out.push(self.os);

        if self.flags & flags::FEXTRA != 0 {
            let extra = self.extra.as_deref().unwrap_or_default();
            let len = extra.len().min(u16::MAX as usize);
            out.extend_from_slice(&(len as u16).to_le_bytes());
            out.extend_from_slice(&extra[..len]);
        }

        if self.flags & flags::FNAME != 0 {
            out.extend_from_slice(self.filename.as_deref().unwrap_or_default().as_bytes());
            out.push(0); // Null terminator
        }

        if self.flags & flags::FCOMMENT != 0 {
            out.extend_from_slice(self.comment.as_deref().unwrap_or_default().as_bytes());
            out.push(0); // Null terminator
        }

        if self.flags & flags::FHCRC != 0 {
            let crc = Crc32::compute(&out) as u16;
            out.extend_from_slice(&crc.to_le_bytes());
        }

        out
    }

    /// Parse a header from the start of `input`.
    ///
    /// Returns the header and its length, or `None` if `input` ends before
    /// the header does. Malformed bytes fail as soon as they are seen, and a
    /// name or comment longer than [`MAX_FIELD_SIZE`] fails with
    /// `InvalidHeader`.
    pub fn parse(input: &[u8]) -> Result<Option<(Self, usize)>> {
        // Check the magic bytes that are already available.
        let seen = input.len().min(GZIP_MAGIC.len());
        if input[..seen] != GZIP_MAGIC[..seen] {
            return Err(OxiFlateError::invalid_magic(
                GZIP_MAGIC.to_vec(),
                input[..seen].to_vec(),
            ));
        }
        if input.len() < FIXED_HEADER_SIZE {
            return Ok(None);
        }

        let method = input[2];
        if method != CM_DEFLATE {
            return Err(OxiFlateError::unsupported_method(format!(
                "GZIP method {}",
                method
            )));
        }

        let flag_bits = input[3];
        if flag_bits & flags::RESERVED != 0 {
            return Err(OxiFlateError::invalid_header(format!(
                "reserved flag bits set: {:#04x}",
                flag_bits
            )));
        }

        let mut header = Self {
            method,
            flags: flag_bits,
            mtime: u32::from_le_bytes([input[4], input[5], input[6], input[7]]),
            xfl: input[8],
            os: input[9],
            ..Self::default()
        };
        let mut pos = FIXED_HEADER_SIZE;

        if flag_bits & flags::FEXTRA != 0 {
            let Some(len) = input.get(pos..pos + 2) else {
                return Ok(None);
            };
            let len = u16::from_le_bytes([len[0], len[1]]) as usize;
            let Some(extra) = input.get(pos + 2..pos + 2 + len) else {
                return Ok(None);
            };
            header.extra = Some(extra.to_vec());
            pos += 2 + len;
        }

        if flag_bits & flags::FNAME != 0 {
            let Some((filename, next)) = zero_terminated(input, pos, "file name")? else {
                return Ok(None);
            };
            header.filename = Some(filename);
            pos = next;
        }

        if flag_bits & flags::FCOMMENT != 0 {
            let Some((comment, next)) = zero_terminated(input, pos, "comment")? else {
                return Ok(None);
            };
            header.comment = Some(comment);
            pos = next;
        }

        if flag_bits & flags::FHCRC != 0 {
            let Some(stored) = input.get(pos..pos + 2) else {
                return Ok(None);
            };
            let stored = u16::from_le_bytes([stored[0], stored[1]]);
            let computed = Crc32::compute(&input[..pos]) as u16;
            if stored != computed {
                return Err(OxiFlateError::crc_mismatch(
                    u32::from(stored),
                    u32::from(computed),
                ));
            }
            header.header_crc = Some(stored);
            pos += 2;
        }

        Ok(Some((header, pos)))
    }
}

/// Latin-1/UTF-8 lossy string ending at the next NUL, and the offset after it.
fn zero_terminated(input: &[u8], start: usize, field: &str) -> Result<Option<(String, usize)>> {
    let rest = input.get(start..).unwrap_or_default();
    match rest.iter().take(MAX_FIELD_SIZE + 1).position(|&b| b == 0) {
        Some(end) => Ok(Some((
            String::from_utf8_lossy(&rest[..end]).into_owned(),
            start + end + 1,
        ))),
        None if rest.len() > MAX_FIELD_SIZE => Err(OxiFlateError::invalid_header(format!(
            "{} longer than {} bytes",
            field, MAX_FIELD_SIZE
        ))),
        None => Ok(None),
    }
}
