//! GZIP framing strategies: header, CRC-32/ISIZE accounting and trailer.

use super::header::GzipHeader;
use oxiflate_core::Crc32;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{FormatReader, FormatWriter};

/// Size of the member trailer (CRC-32 and ISIZE, little endian).
pub const FOOTER_SIZE: usize = 8;

/// Writes the GZIP framing around a raw DEFLATE body.
#[derive(Debug, Clone)]
pub struct GzipFormatWriter {
    header: GzipHeader,
    crc: Crc32,
    size: u32,
}

impl GzipFormatWriter {
    /// Writer emitting `header`.
    pub fn new(header: GzipHeader) -> Self {
        Self {
            header,
            crc: Crc32::new(),
            size: 0,
        }
    }
}

impl Default for GzipFormatWriter {
    fn default() -> Self {
        Self::new(GzipHeader::default())
    }
}

impl FormatWriter for GzipFormatWriter {
    fn header(&mut self) -> Vec<u8> {
        self.header.to_bytes()
    }

    fn update_with_bytes_read(&mut self, data: &[u8]) {
        self.crc.update(data);
        // ISIZE is the input size modulo 2^32.
        self.size = self.size.wrapping_add(data.len() as u32);
    }

    fn footer(&mut self) -> Vec<u8> {
        let mut footer = Vec::with_capacity(FOOTER_SIZE);
        footer.extend_from_slice(&self.crc.value().to_le_bytes());
        footer.extend_from_slice(&self.size.to_le_bytes());
        footer
    }
}

/// Parses and checks the GZIP framing around a raw DEFLATE body.
#[derive(Debug, Clone, Default)]
pub struct GzipFormatReader {
    header: Option<GzipHeader>,
    crc: Crc32,
    size: u32,
    trailer: Option<(u32, u32)>,
}

impl GzipFormatReader {
    /// Reader awaiting a header.
    pub fn new() -> Self {
        Self::default()
    }

    /// The parsed header, once available.
    pub fn header(&self) -> Option<&GzipHeader> {
        self.header.as_ref()
    }
}

impl FormatReader for GzipFormatReader {
    fn read_header(&mut self, input: &[u8]) -> Result<Option<usize>> {
        Ok(GzipHeader::parse(input)?.map(|(header, len)| {
            self.header = Some(header);
            len
        }))
    }

    fn update_with_bytes_read(&mut self, data: &[u8]) {
        self.crc.update(data);
        self.size = self.size.wrapping_add(data.len() as u32);
    }

    fn read_footer(&mut self, input: &[u8]) -> Result<Option<usize>> {
        if input.len() < FOOTER_SIZE {
            return Ok(None);
        }
        let crc = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
        let size = u32::from_le_bytes([input[4], input[5], input[6], input[7]]);
        self.trailer = Some((crc, size));
        Ok(Some(FOOTER_SIZE))
    }

    fn validate(&self) -> Result<()> {
        let Some((expected_crc, expected_size)) = self.trailer else {
            return Err(OxiFlateError::unexpected_eof(FOOTER_SIZE));
        };

        let computed = self.crc.value();
        if expected_crc != computed {
            return Err(OxiFlateError::crc_mismatch(expected_crc, computed));
        }
        if expected_size != self.size {
            return Err(OxiFlateError::corrupted(
                0,
                format!(
                    "size mismatch: trailer says {}, decompressed {}",
                    expected_size, self.size
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_footer() {
        let mut writer = GzipFormatWriter::default();
        writer.update_with_bytes_read(b"Hello, ");
        writer.update_with_bytes_read(b"World!");
        let footer = writer.footer();
        assert_eq!(&footer[..4], &0xEC4AC3D0u32.to_le_bytes());
        assert_eq!(&footer[4..], &13u32.to_le_bytes());
    }

    #[test]
    fn test_reader_validates_trailer() {
        let mut writer = GzipFormatWriter::default();
        writer.update_with_bytes_read(b"payload");
        let footer = writer.footer();

        let mut reader = GzipFormatReader::new();
        reader.update_with_bytes_read(b"payload");
        assert_eq!(reader.read_footer(&footer[..5]).unwrap(), None);
        assert_eq!(reader.read_footer(&footer).unwrap(), Some(FOOTER_SIZE));
        reader.validate().unwrap();
    }

    #[test]
    fn test_reader_detects_mismatch() {
        let mut reader = GzipFormatReader::new();
        assert!(matches!(
            reader.validate(),
            Err(OxiFlateError::UnexpectedEof { .. })
        ));

        reader.update_with_bytes_read(b"abc");
        let mut footer = Crc32::compute(b"abd").to_le_bytes().to_vec();
        footer.extend_from_slice(&3u32.to_le_bytes());
        reader.read_footer(&footer).unwrap();
        assert!(matches!(
            reader.validate(),
            Err(OxiFlateError::CrcMismatch { .. })
        ));

        let mut reader = GzipFormatReader::new();
        reader.update_with_bytes_read(b"abc");
        let mut footer = Crc32::compute(b"abc").to_le_bytes().to_vec();
        footer.extend_from_slice(&4u32.to_le_bytes());
        reader.read_footer(&footer).unwrap();
        assert!(matches!(
            reader.validate(),
            Err(OxiFlateError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_reader_keeps_header() {
        let bytes = GzipHeader::new().with_filename("x.bin").to_bytes();
        let mut reader = GzipFormatReader::new();
        assert_eq!(reader.read_header(&bytes).unwrap(), Some(bytes.len()));
        assert_eq!(
            reader.header().and_then(|h| h.filename.as_deref()),
            Some("x.bin")
        );
    }
}
