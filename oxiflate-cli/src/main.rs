//! OxiFlate CLI - DEFLATE and GZIP streams from the command line
//!
//! Compresses and decompresses single files through the OxiFlate stream
//! adapters, either synchronously or with Begin/End operations on a Tokio
//! runtime.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::{cmd_compress, cmd_decompress, cmd_info};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use utils::CompressionLevel;

#[derive(Parser)]
#[command(name = "oxiflate")]
#[command(author, version, about = "DEFLATE and GZIP stream tool")]
#[command(long_about = "
OxiFlate compresses and decompresses files as GZIP members or raw DEFLATE
streams.

Examples:
  oxiflate compress notes.txt
  oxiflate compress notes.txt -o notes.txt.gz --name -l best
  oxiflate compress data.bin --raw
  oxiflate decompress notes.txt.gz
  oxiflate decompress data.bin.deflate --raw --async
  oxiflate info notes.txt.gz
")]
struct Cli {
    /// Log progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Output file (input + .gz, or .deflate with --raw)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a raw DEFLATE stream instead of a GZIP member
        #[arg(long)]
        raw: bool,

        /// Compression level
        #[arg(short = 'l', long, value_enum, default_value = "normal")]
        level: CompressionLevel,

        /// Store the original file name and modification time in the header
        #[arg(short = 'n', long)]
        name: bool,

        /// Run through the Begin/End asynchronous adapter
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        input: PathBuf,

        /// Output file (input without .gz / .deflate)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read a raw DEFLATE stream instead of a GZIP member
        #[arg(long)]
        raw: bool,

        /// Run through the Begin/End asynchronous adapter
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Show the GZIP header of a file
    #[command(alias = "i")]
    Info {
        /// GZIP file to inspect
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            raw,
            level,
            name,
            use_async,
        } => cmd_compress(&input, output.as_deref(), raw, level, name, use_async),
        Commands::Decompress {
            input,
            output,
            raw,
            use_async,
        } => cmd_decompress(&input, output.as_deref(), raw, use_async),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
