//! Inflater with container framing.
//!
//! [`FramedInflater`] lets the stream adapter stay unaware of containers: it
//! consumes header bytes without producing output, hands the body to the
//! inner codec, collects whatever the inner codec left over as trailer input
//! and reports finished only after the trailer has been validated.

use oxiflate_core::error::Result;
use oxiflate_core::traits::{FormatReader, InflateCodec};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
    Footer,
    Done,
}

/// An [`InflateCodec`] that strips and checks a container around its inner
/// codec's stream.
pub struct FramedInflater {
    inner: Box<dyn InflateCodec>,
    reader: Box<dyn FormatReader>,
    /// Header or trailer bytes not parsed yet; bytes past the trailer once done.
    pending: Vec<u8>,
    phase: Phase,
    starved: bool,
}

impl FramedInflater {
    /// Wrap `inner` with the framing parsed by `reader`.
    pub fn new(inner: Box<dyn InflateCodec>, reader: Box<dyn FormatReader>) -> Self {
        Self {
            inner,
            reader,
            pending: Vec::new(),
            phase: Phase::Header,
            starved: true,
        }
    }
}

impl std::fmt::Debug for FramedInflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedInflater")
            .field("phase", &self.phase)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl InflateCodec for FramedInflater {
    fn needs_input(&self) -> bool {
        match self.phase {
            Phase::Header | Phase::Footer => self.starved,
            Phase::Body => self.inner.needs_input(),
            Phase::Done => false,
        }
    }

    fn set_input(&mut self, input: &[u8]) {
        match self.phase {
            Phase::Body => self.inner.set_input(input),
            Phase::Header | Phase::Footer | Phase::Done => {
                self.pending.extend_from_slice(input);
                self.starved = false;
            }
        }
    }

    fn inflate(&mut self, output: &mut [u8]) -> Result<usize> {
        let mut produced = 0;

        loop {
            match self.phase {
                Phase::Header => match self.reader.read_header(&self.pending)? {
                    Some(len) => {
                        trace!(len, "container header parsed");
                        let body = self.pending.split_off(len);
                        self.pending.clear();
                        self.phase = Phase::Body;
                        if !body.is_empty() {
                            self.inner.set_input(&body);
                        }
                    }
                    None => {
                        self.starved = true;
                        return Ok(0);
                    }
                },
                Phase::Body => {
                    produced = self.inner.inflate(output)?;
                    self.reader.update_with_bytes_read(&output[..produced]);
                    if !self.inner.is_finished() {
                        return Ok(produced);
                    }
                    self.pending = self.inner.unconsumed_input().to_vec();
                    self.starved = self.pending.is_empty();
                    self.phase = Phase::Footer;
                }
                Phase::Footer => match self.reader.read_footer(&self.pending)? {
                    Some(len) => {
                        self.reader.validate()?;
                        self.pending.drain(..len);
                        self.phase = Phase::Done;
                        trace!(trailing = self.pending.len(), "container trailer validated");
                        return Ok(produced);
                    }
                    None => {
                        self.starved = true;
                        return Ok(produced);
                    }
                },
                Phase::Done => return Ok(produced),
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    fn unconsumed_input(&self) -> &[u8] {
        if self.phase == Phase::Done {
            &self.pending
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gzip::format::{GzipFormatReader, GzipFormatWriter};
    use crate::gzip::header::{FIXED_HEADER_SIZE, GzipHeader, MAX_FIELD_SIZE};
    use oxiflate_core::CompressionLevel;
    use oxiflate_core::error::OxiFlateError;
    use oxiflate_core::traits::FormatWriter;
    use oxiflate_deflate::{Inflater, deflate};

    fn member(data: &[u8], header: GzipHeader) -> Vec<u8> {
        let mut writer = GzipFormatWriter::new(header);
        let mut out = writer.header();
        writer.update_with_bytes_read(data);
        out.extend(deflate(data, CompressionLevel::DEFAULT).unwrap());
        out.extend(writer.footer());
        out
    }

    fn framed() -> FramedInflater {
        FramedInflater::new(Box::new(Inflater::new()), Box::new(GzipFormatReader::new()))
    }

    fn drain(inflater: &mut FramedInflater, input: &[u8], step: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buffer = [0u8; 17];
        let mut chunks = input.chunks(step.max(1));
        while !inflater.is_finished() {
            let n = inflater.inflate(&mut buffer)?;
            out.extend_from_slice(&buffer[..n]);
            if n == 0 && !inflater.is_finished() {
                match chunks.next() {
                    Some(chunk) => inflater.set_input(chunk),
                    None => break,
                }
            }
        }
        Ok(out)
    }

    #[test]
    fn test_whole_member() {
        let data = b"framed inflater test data, framed inflater test data";
        let bytes = member(data, GzipHeader::new().with_filename("f.txt"));
        let mut inflater = framed();
        assert_eq!(drain(&mut inflater, &bytes, bytes.len()).unwrap(), data);
        assert!(inflater.is_finished());
        assert!(inflater.unconsumed_input().is_empty());
    }

    #[test]
    fn test_byte_at_a_time() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 256) as u8).collect();
        let bytes = member(&data, GzipHeader::new().with_comment("slow").with_header_crc());
        let mut inflater = framed();
        assert_eq!(drain(&mut inflater, &bytes, 1).unwrap(), data);
        assert!(inflater.is_finished());
    }

    #[test]
    fn test_trailing_bytes_kept() {
        let mut bytes = member(b"abc", GzipHeader::new());
        bytes.extend_from_slice(b"tail");
        let mut inflater = framed();
        assert_eq!(drain(&mut inflater, &bytes, bytes.len()).unwrap(), b"abc");
        assert_eq!(inflater.unconsumed_input(), b"tail");
    }

    #[test]
    fn test_corrupt_trailer() {
        let mut bytes = member(b"checked", GzipHeader::new());
        let crc_at = bytes.len() - 8;
        bytes[crc_at] ^= 0x01;
        let mut inflater = framed();
        assert!(matches!(
            drain(&mut inflater, &bytes, 5),
            Err(OxiFlateError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_trailer_never_finishes() {
        let mut bytes = member(b"short", GzipHeader::new());
        bytes.truncate(bytes.len() - 3);
        let mut inflater = framed();
        assert_eq!(drain(&mut inflater, &bytes, 4).unwrap(), b"short");
        assert!(!inflater.is_finished());
    }

    #[test]
    fn test_unterminated_name_is_rejected() {
        let mut bytes = GzipHeader::new().with_filename("").to_bytes();
        bytes.pop();
        bytes.extend(std::iter::repeat_n(b'n', 8 << 20));

        let mut inflater = framed();
        assert!(matches!(
            drain(&mut inflater, &bytes, 4096),
            Err(OxiFlateError::InvalidHeader { .. })
        ));
        assert!(inflater.pending.len() <= FIXED_HEADER_SIZE + MAX_FIELD_SIZE + 4096);
    }
}
