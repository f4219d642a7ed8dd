//! CLI command implementations.

mod compress;
mod decompress;
mod info;

pub use compress::cmd_compress;
pub use decompress::cmd_decompress;
pub use info::cmd_info;

/// Chunk size used for the Begin/End operations of `--async`.
const ASYNC_CHUNK: usize = 64 * 1024;
