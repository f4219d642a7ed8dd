use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxiflate_core::CompressionLevel;
use oxiflate_stream::{DeflateStream, GzipStream, StreamOptions};
use std::hint::black_box;
use std::io::{Read, Write};

fn text(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    pattern.iter().copied().cycle().take(size).collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_encode");

    for size in [1_000, 100_000, 1_000_000] {
        let data = text(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("deflate", size), &data, |b, data| {
            b.iter(|| {
                let mut encoder = DeflateStream::encoder(Vec::new(), CompressionLevel::DEFAULT);
                encoder.write_all(data).expect("write failed");
                black_box(encoder.into_inner().expect("close failed"));
            });
        });

        group.bench_with_input(BenchmarkId::new("gzip", size), &data, |b, data| {
            b.iter(|| {
                let mut encoder = GzipStream::encoder(Vec::new(), CompressionLevel::DEFAULT);
                encoder.write_all(data).expect("write failed");
                black_box(encoder.into_inner().expect("close failed"));
            });
        });
    }

    group.finish();
}

fn bench_decode_buffer_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_decode");
    let data = text(1_000_000);
    let mut encoder = DeflateStream::encoder(Vec::new(), CompressionLevel::DEFAULT);
    encoder.write_all(&data).expect("write failed");
    let compressed = encoder.into_inner().expect("close failed");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for buffer_size in [64, 8192, 65536] {
        group.bench_with_input(
            BenchmarkId::new("buffer", buffer_size),
            &compressed,
            |b, compressed| {
                b.iter(|| {
                    let options = StreamOptions::new().with_buffer_size(buffer_size);
                    let mut decoder = DeflateStream::decoder_with_options(&compressed[..], options);
                    let mut out = Vec::with_capacity(1_000_000);
                    decoder.read_to_end(&mut out).expect("read failed");
                    black_box(out);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_buffer_sizes);
criterion_main!(benches);
