//! Entry point for the met_point application.
//! Loads the run file, processes every selected site and prints a batch summary.

use clap::Parser;
use met_point::config::RunConfig;
use met_point::parallel::ParallelConfig;
use met_point::pipeline::{self, DatasetOutcome, RunOptions};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("met_point={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(args: Args) -> met_point::Result<usize> {
    let config = RunConfig::load(&args.config)?;
    let sites = config.select_sites(&args.sites)?;
    let options = RunOptions {
        output_dir: args.output_dir.unwrap_or_else(|| config.output_dir.clone()),
        overwrite: args.overwrite,
    };
    let parallel = ParallelConfig::new(args.threads);

    println!(
        "Processing {} site(s) x {} dataset(s) on {} thread(s)",
        sites.len(),
        config.datasets.len(),
        parallel.threads()
    );

    let reports = pipeline::run_sites(&config, &sites, &parallel, &options)?;

    let mut failures = 0;
    for report in &reports {
        for (dataset, outcome) in &report.outcomes {
            match outcome {
                Ok(DatasetOutcome::Written { paths, rows }) => println!(
                    "✅ {} / {dataset}: {rows} rows -> {}",
                    report.site,
                    paths.site_table.display()
                ),
                Ok(DatasetOutcome::Skipped { existing }) => println!(
                    "✅ {} / {dataset}: up to date ({})",
                    report.site,
                    existing.display()
                ),
                Err(e) => println!("⚠ {} / {dataset}: {e}", report.site),
            }
        }
        failures += report.failures();
    }
    Ok(failures)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            println!("⚠ {failures} dataset(s) failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("⚠ {e}");
            ExitCode::FAILURE
        }
    }
}
