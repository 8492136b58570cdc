//! DAS train-event capture pipeline.
//!
//! Reads a directory of raw strain-matrix files, preprocesses each batch
//! (moving-mean downsample + zero-phase Butterworth filter), detects trains
//! per monitored section, and persists contiguous train-plus-margin chunks
//! as bounded-size JSON or binary fragments.

#![warn(missing_docs)]

pub mod buffer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod detect;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod serialize;
pub mod signal;
pub mod source;

use clap::Parser;
use cli::Cli;
use config::{Environment, load_config_file, load_default_config};
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the capture CLI.
///
/// # Errors
///
/// Returns any error from configuration loading or from
/// [`pipeline::run`]; both are fatal and propagate to `main`.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let environment = Environment::from_env();
    info!(?environment, "starting capture run");

    let config = match cli.config {
        Some(ref path) => load_config_file(path)?,
        None => load_default_config()?,
    };

    let summary = pipeline::run(config, &cli)?;
    summary.log();

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = std::env::var("LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // Use try_init() so repeated calls (e.g. across tests in one process) don't panic.
    if fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init().is_err() {
        warn!("logging subscriber already initialized");
    }
}
