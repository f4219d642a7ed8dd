//! Edge case tests for the DEFLATE block codecs.

use oxiflate_core::CompressionLevel;
use oxiflate_core::traits::{DeflateCodec, InflateCodec};
use oxiflate_deflate::{Deflater, Inflater, deflate, inflate};
use proptest::prelude::*;

fn roundtrip(input: &[u8], level: u8) -> Vec<u8> {
    let compressed = deflate(input, CompressionLevel::new(level)).unwrap();
    inflate(&compressed).unwrap()
}

#[test]
fn test_empty_input() {
    assert!(roundtrip(b"", 6).is_empty());
}

#[test]
fn test_single_byte() {
    assert_eq!(roundtrip(b"A", 6), b"A");
}

#[test]
fn test_all_zeros() {
    let input = vec![0u8; 1000];
    let compressed = deflate(&input, CompressionLevel::DEFAULT).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), input);
    // All zeros should compress very well
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_compression_levels() {
    let input = b"Hello, world! This is a test of DEFLATE compression with various levels.";

    for level in 0..=9 {
        assert_eq!(roundtrip(input, level), input, "Level {} failed", level);
    }
}

#[test]
fn test_large_input() {
    let mut input = Vec::with_capacity(1024 * 1024);
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    while input.len() < 1024 * 1024 {
        input.extend_from_slice(pattern);
    }
    input.truncate(1024 * 1024);

    assert_eq!(roundtrip(&input, 5), input);
}

#[test]
fn test_long_distance_match() {
    let mut input = vec![0u8; 32768];
    let pattern = b"PATTERN_TO_MATCH";
    input[0..pattern.len()].copy_from_slice(pattern);
    input[32768 - pattern.len()..32768].copy_from_slice(pattern);

    assert_eq!(roundtrip(&input, 1), input);
}

#[test]
fn test_inflater_output_never_lost_before_finish() {
    let input: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let compressed = deflate(&input, CompressionLevel::BEST).unwrap();

    let mut inflater = Inflater::new();
    inflater.set_input(&compressed);

    // Tiny output buffer: the codec must hand out every byte before it
    // reports the end of the stream.
    let mut out = Vec::new();
    let mut buffer = [0u8; 3];
    while !inflater.is_finished() {
        let n = inflater.inflate(&mut buffer).unwrap();
        assert!(n > 0 || inflater.is_finished());
        out.extend_from_slice(&buffer[..n]);
    }
    assert_eq!(out, input);
}

#[test]
fn test_interleaved_set_input_and_drain() {
    let mut deflater = Deflater::new(CompressionLevel::DEFAULT);
    let mut compressed = Vec::new();
    let mut buffer = [0u8; 64];

    for piece in [&b"first "[..], b"second ", b"", b"third"] {
        while !deflater.needs_input() {
            let n = deflater.deflate_output(&mut buffer).unwrap();
            compressed.extend_from_slice(&buffer[..n]);
        }
        deflater.set_input(piece);
        while !deflater.needs_input() {
            let n = deflater.deflate_output(&mut buffer).unwrap();
            compressed.extend_from_slice(&buffer[..n]);
        }
    }
    loop {
        let (done, n) = deflater.finish(&mut buffer).unwrap();
        compressed.extend_from_slice(&buffer[..n]);
        if done {
            break;
        }
    }

    assert_eq!(inflate(&compressed).unwrap(), b"first second third");
}

proptest! {
    #[test]
    fn deflate_inflate_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096), level in 0u8..=9) {
        prop_assert_eq!(roundtrip(&data, level), data);
    }
}
