//! Decompress command implementation.

use super::ASYNC_CHUNK;
use crate::utils::{decompressed_path, format_size, runtime};
use oxiflate_stream::{AsyncDeflateStream, AsyncGzipStream, DeflateStream, GzipStream};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Decompress a GZIP member, or a raw DEFLATE stream with `raw`.
pub fn cmd_decompress(
    input: &Path,
    output: Option<&Path>,
    raw: bool,
    use_async: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map_or_else(|| decompressed_path(input, raw), Path::to_path_buf);
    if output == input {
        return Err("output would overwrite the input file".into());
    }
    debug!(input = %input.display(), output = %output.display(), raw, use_async, "decompressing");

    let written = if use_async {
        decompress_async(input, &output, raw)?
    } else {
        decompress_sync(input, &output, raw)?
    };

    info!(written, "decompression finished");
    println!(
        "{} -> {} ({})",
        input.display(),
        output.display(),
        format_size(written)
    );
    Ok(())
}

fn decompress_sync(
    input: &Path,
    output: &Path,
    raw: bool,
) -> Result<u64, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);

    let (written, finished) = if raw {
        let mut decoder = DeflateStream::decoder(reader);
        let written = io::copy(&mut decoder, &mut writer)?;
        (written, decoder.is_finished())
    } else {
        let mut decoder = GzipStream::decoder(reader);
        let written = io::copy(&mut decoder, &mut writer)?;
        (written, decoder.is_finished())
    };
    writer.flush()?;

    if !finished {
        warn!(input = %input.display(), "input ended before the end of the compressed stream");
    }
    Ok(written)
}

fn decompress_async(
    input: &Path,
    output: &Path,
    raw: bool,
) -> Result<u64, Box<dyn std::error::Error>> {
    let rt = runtime()?;
    let reader = rt.block_on(tokio::fs::File::open(input))?;
    let mut writer = rt.block_on(tokio::fs::File::create(output))?;
    let mut written = 0u64;

    if raw {
        let decoder = AsyncDeflateStream::decoder(reader, rt.handle().clone());
        loop {
            let token = decoder.begin_read(ASYNC_CHUNK, None, None)?;
            let chunk = decoder.end_read(&token)?;
            if chunk.is_empty() {
                break;
            }
            rt.block_on(writer.write_all(&chunk))?;
            written += chunk.len() as u64;
        }
        rt.block_on(decoder.close())?;
    } else {
        let decoder = AsyncGzipStream::decoder(reader, rt.handle().clone());
        loop {
            let token = decoder.begin_read(ASYNC_CHUNK, None, None)?;
            let chunk = decoder.end_read(&token)?;
            if chunk.is_empty() {
                break;
            }
            rt.block_on(writer.write_all(&chunk))?;
            written += chunk.len() as u64;
        }
        rt.block_on(decoder.close())?;
    }

    rt.block_on(writer.flush())?;
    Ok(written)
}
