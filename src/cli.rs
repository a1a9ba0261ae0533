//! Defines command-line interface options using `clap` for the met_point application.

use clap::Parser;
use std::path::PathBuf;

/// Extract per-site meteorological time series from gridded archives
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = "met_point",
    about = "Point extraction and daily/monthly aggregation of gridded meteorological archives"
)]
pub struct Args {
    /// Path to the JSON run configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Only process these site ids (repeatable). Defaults to every configured site.
    #[arg(short, long = "site")]
    pub sites: Vec<String>,

    /// Override the output directory of the run file
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of worker threads. Defaults to number of CPU cores.
    #[arg(short = 't', long, value_parser = parse_threads)]
    pub threads: Option<usize>,

    /// Reprocess datasets whose output already exists
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_threads(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("thread count must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid thread count '{s}'")),
    }
}
