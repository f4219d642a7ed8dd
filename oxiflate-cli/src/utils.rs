//! Shared helpers for the CLI commands.

use clap::ValueEnum;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::runtime::{Builder, Runtime};

/// Compression level as accepted on the command line.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CompressionLevel {
    /// No compression (stored blocks)
    Store,
    /// Fast compression
    Fast,
    /// Normal compression (default)
    #[default]
    Normal,
    /// Best compression
    Best,
}

impl From<CompressionLevel> for oxiflate_core::CompressionLevel {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Store => Self::NONE,
            CompressionLevel::Fast => Self::FAST,
            CompressionLevel::Normal => Self::DEFAULT,
            CompressionLevel::Best => Self::BEST,
        }
    }
}

/// Extension appended when compressing.
pub fn extension(raw: bool) -> &'static str {
    if raw { "deflate" } else { "gz" }
}

/// Default output path for `compress`: the input with `.gz` or `.deflate`
/// appended.
pub fn compressed_path(input: &Path, raw: bool) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".");
    name.push(extension(raw));
    PathBuf::from(name)
}

/// Default output path for `decompress`: the input without its extension,
/// or with `.out` appended when the extension does not match.
pub fn decompressed_path(input: &Path, raw: bool) -> PathBuf {
    let matches = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension(raw)));
    if matches {
        input.with_extension("")
    } else {
        let mut name = OsString::from(input.as_os_str());
        name.push(".out");
        PathBuf::from(name)
    }
}

/// Runtime driving the Begin/End operations of `--async`.
pub fn runtime() -> std::io::Result<Runtime> {
    Builder::new_multi_thread().worker_threads(2).enable_all().build()
}

/// Format a byte count for display.
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}

/// Compressed size as a percentage of the original.
pub fn ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        compressed as f64 / original as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_path() {
        assert_eq!(compressed_path(Path::new("a/notes.txt"), false), PathBuf::from("a/notes.txt.gz"));
        assert_eq!(compressed_path(Path::new("data"), true), PathBuf::from("data.deflate"));
    }

    #[test]
    fn test_decompressed_path() {
        assert_eq!(decompressed_path(Path::new("notes.txt.gz"), false), PathBuf::from("notes.txt"));
        assert_eq!(decompressed_path(Path::new("data.DEFLATE"), true), PathBuf::from("data"));
        assert_eq!(decompressed_path(Path::new("notes.gz"), true), PathBuf::from("notes.gz.out"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_level_mapping() {
        let level: oxiflate_core::CompressionLevel = CompressionLevel::Best.into();
        assert_eq!(level.level(), 9);
        let level: oxiflate_core::CompressionLevel = CompressionLevel::default().into();
        assert_eq!(level.level(), 6);
    }
}
