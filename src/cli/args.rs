//! CLI argument definitions.

use clap::Parser;
use std::path::PathBuf;

/// Real-time train-event capture pipeline for distributed acoustic sensing data.
#[derive(Debug, Parser)]
#[command(name = "das-train-capture")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of source files to process.
    pub data_path: PathBuf,

    /// Enable the plotting sink.
    ///
    /// Plotting is out of scope for this pipeline (see the pipeline design
    /// notes); passing this flag only emits a log line noting that no plot
    /// will be produced.
    #[arg(short = 'p', long)]
    pub plot: bool,

    /// Enable the chunk serializer sink.
    #[arg(short = 's', long)]
    pub save: bool,

    /// Serialize chunks as the binary header+NPY format instead of JSON.
    #[arg(short = 'b', long)]
    pub binary: bool,

    /// Override the configured maximum number of source files to read.
    #[arg(short = 'f', long = "files")]
    pub files: Option<usize>,

    /// Path to the TOML configuration file. Defaults to the platform config
    /// directory (see `config::paths`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output root directory. Overrides the config file / environment preset.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}
