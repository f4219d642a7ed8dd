//! Compress command implementation.

use super::ASYNC_CHUNK;
use crate::utils::{CompressionLevel, compressed_path, format_size, ratio, runtime};
use oxiflate_stream::{
    AsyncDeflateStream, AsyncGzipStream, DeflateStream, GzipHeader, GzipStream, StreamOptions,
};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Compress `input` into a GZIP member, or a raw DEFLATE stream with `raw`.
pub fn cmd_compress(
    input: &Path,
    output: Option<&Path>,
    raw: bool,
    level: CompressionLevel,
    name: bool,
    use_async: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map_or_else(|| compressed_path(input, raw), Path::to_path_buf);
    if output == input {
        return Err("output would overwrite the input file".into());
    }

    let level: oxiflate_core::CompressionLevel = level.into();
    let options = StreamOptions::new().with_level(level);
    let header = gzip_header(input, level, name)?;
    debug!(input = %input.display(), output = %output.display(), raw, use_async, "compressing");

    if use_async {
        compress_async(input, &output, raw, options, header)?;
    } else {
        compress_sync(input, &output, raw, options, header)?;
    }

    let original = fs::metadata(input)?.len();
    let compressed = fs::metadata(&output)?.len();
    info!(original, compressed, "compression finished");
    println!(
        "{} -> {} ({} -> {}, {:.1}%)",
        input.display(),
        output.display(),
        format_size(original),
        format_size(compressed),
        ratio(original, compressed)
    );
    Ok(())
}

fn gzip_header(
    input: &Path,
    level: oxiflate_core::CompressionLevel,
    name: bool,
) -> io::Result<GzipHeader> {
    let header = GzipHeader::new().for_level(level);
    if !name {
        return Ok(header);
    }

    let header = match input.file_name() {
        Some(file_name) => header.with_filename(file_name.to_string_lossy()),
        None => header,
    };
    let mtime = fs::metadata(input)?
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|since| u32::try_from(since.as_secs()).unwrap_or(0))
        .unwrap_or(0);
    Ok(header.with_mtime(mtime))
}

fn compress_sync(
    input: &Path,
    output: &Path,
    raw: bool,
    options: StreamOptions,
    header: GzipHeader,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(output)?);

    if raw {
        let mut encoder = DeflateStream::encoder_with_options(writer, options);
        io::copy(&mut reader, &mut encoder)?;
        encoder.close()?;
    } else {
        let mut encoder = GzipStream::with_header(writer, header, options);
        io::copy(&mut reader, &mut encoder)?;
        encoder.close()?;
    }
    Ok(())
}

fn compress_async(
    input: &Path,
    output: &Path,
    raw: bool,
    options: StreamOptions,
    header: GzipHeader,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = runtime()?;
    let mut reader = rt.block_on(tokio::fs::File::open(input))?;
    let writer = rt.block_on(tokio::fs::File::create(output))?;
    let mut chunk = vec![0u8; ASYNC_CHUNK];

    if raw {
        let encoder = AsyncDeflateStream::encoder_with_options(writer, options, rt.handle().clone());
        loop {
            let n = rt.block_on(reader.read(&mut chunk))?;
            if n == 0 {
                break;
            }
            let token = encoder.begin_write(&chunk[..n], None, None)?;
            encoder.end_write(&token)?;
        }
        rt.block_on(encoder.close())?;
    } else {
        let encoder = AsyncGzipStream::with_header(writer, header, options, rt.handle().clone());
        loop {
            let n = rt.block_on(reader.read(&mut chunk))?;
            if n == 0 {
                break;
            }
            let token = encoder.begin_write(&chunk[..n], None, None)?;
            encoder.end_write(&token)?;
        }
        rt.block_on(encoder.close())?;
    }
    Ok(())
}
