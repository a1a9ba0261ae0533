//! Per-site, per-dataset orchestration
//!
//! Each (site, dataset) pair runs extraction, assembly, aggregation and output
//! on its own. A failure aborts only that pair; the rest of the batch goes on.
//! Sites run in parallel on a dedicated worker pool.

use crate::aggregation::{
    daily_from_hourly, daily_from_model_table, monthly_from_daily, split_years, DailySummary,
    MonthlySummary,
};
use crate::assembly::assemble;
use crate::config::{DatasetConfig, Layout, RunConfig, SiteConfig};
use crate::derived::{self, TrainingTable};
use crate::errors::{MetPointError, Result};
use crate::netcdf_io::{self, with_source_file};
use crate::output::{self, OutputPaths};
use crate::parallel::ParallelConfig;
use crate::table::{SiteTable, VariableSeries};
use crate::timestamps::DateToken;
use crate::variables::{Frequency, MetVariable};
use chrono::Datelike;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Run-wide options that are not part of the run file
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Reprocess datasets whose site table already exists
    pub overwrite: bool,
}

/// What happened to one dataset of one site
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetOutcome {
    Written { paths: OutputPaths, rows: usize },
    /// The site table already existed and overwriting was not requested
    Skipped { existing: PathBuf },
}

/// Everything produced for one site and one dataset, before writing
#[derive(Debug, Clone)]
pub struct DatasetProducts {
    pub table: SiteTable,
    pub daily: Vec<DailySummary>,
    pub monthly: Vec<MonthlySummary>,
    pub training: Option<TrainingTable>,
}

/// Results of every dataset of one site
#[derive(Debug)]
pub struct SiteReport {
    pub site: String,
    pub outcomes: Vec<(String, Result<DatasetOutcome>)>,
}

impl SiteReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }
}

/// One source file and the variables to read from it
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePlan {
    pub path: PathBuf,
    pub variables: Vec<(MetVariable, String)>,
}

fn netcdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext == "nc" || ext == "nc4")
        })
        .collect();
    files.sort();
    Ok(files)
}

fn file_year(dataset: &DatasetConfig, path: &Path) -> Option<(i32, i32)> {
    let label = path.file_name()?.to_string_lossy();
    let token = DateToken::parse_for(dataset.family, &label).ok()?;
    let start = token.start.year();
    let end = token.end.map_or(start, |e| e.year());
    Some((start, end))
}

/// Source files of a dataset in processing order, filtered by year
pub fn source_plan(dataset: &DatasetConfig) -> Result<Vec<SourcePlan>> {
    let sources = dataset.source_variables();
    let wanted = |path: &Path| {
        file_year(dataset, path).map_or(true, |(start, _)| dataset.includes_year(start))
    };

    let plan: Vec<SourcePlan> = match dataset.layout {
        Layout::MultiVariableFiles => netcdf_files(&dataset.root)?
            .into_iter()
            .filter(|p| wanted(p))
            .map(|path| SourcePlan {
                path,
                variables: sources.iter().map(|(v, s)| (*v, s.clone())).collect(),
            })
            .collect(),
        Layout::PerVariableDirectories => {
            let mut plan = Vec::new();
            for (variable, source) in &sources {
                let dir = dataset.root.join(source);
                if !dir.is_dir() {
                    debug!(dataset = %dataset.name, dir = %dir.display(), "no directory for variable");
                    continue;
                }
                plan.extend(netcdf_files(&dir)?.into_iter().filter(|p| wanted(p)).map(
                    |path| SourcePlan {
                        path,
                        variables: vec![(*variable, source.clone())],
                    },
                ));
            }
            plan
        }
    };

    if plan.is_empty() {
        return Err(MetPointError::Assembly {
            dataset: dataset.name.clone(),
            reason: format!("no source files found under {}", dataset.root.display()),
        });
    }
    Ok(plan)
}

/// Inclusive year range the planned files cover, from their date tokens
fn planned_years(dataset: &DatasetConfig, plan: &[SourcePlan]) -> Option<(i32, i32)> {
    let years: Vec<(i32, i32)> = plan
        .iter()
        .map(|p| file_year(dataset, &p.path))
        .collect::<Option<_>>()?;
    let first = years.iter().map(|(s, _)| *s).min()?;
    let last = years.iter().map(|(_, e)| *e).max()?;
    Some((first, last))
}

/// Extract every planned series of one site, one file at a time
pub fn extract_site(
    site: &SiteConfig,
    dataset: &DatasetConfig,
    plan: &[SourcePlan],
) -> Result<Vec<VariableSeries>> {
    let mut series = Vec::new();
    for source in plan {
        with_source_file(&source.path, |file| {
            let index = file.locate(site.lat, site.lon)?;
            let axis = file.time_axis(dataset.family, None, dataset.time_source)?;
            for (variable, name) in &source.variables {
                if !file.has_variable(name) {
                    debug!(file = %source.path.display(), variable = %name, "variable not in file");
                    continue;
                }
                series.push(netcdf_io::extract(file, &axis, *variable, name, index)?);
            }
            Ok(())
        })?;
    }
    Ok(series)
}

/// Aggregate an assembled table into daily, monthly and training products
pub fn summarize(table: SiteTable) -> Result<DatasetProducts> {
    let (mut daily, training) = match table.frequency {
        Frequency::Hourly => {
            let mut daily = Vec::new();
            for year in table.split_by_year() {
                daily.extend(daily_from_hourly(&year)?);
            }
            (daily, Some(derived::training_table(&table)))
        }
        Frequency::Daily => (daily_from_model_table(&table)?, None),
        Frequency::Monthly => (Vec::new(), None),
    };
    derived::apply_departures(&mut daily);

    let mut monthly = Vec::new();
    for year in split_years(&daily) {
        if matches!(year.len(), 365 | 366) {
            monthly.extend(monthly_from_daily(year)?);
        } else {
            warn!(
                dataset = %table.dataset,
                year = year[0].year,
                days = year.len(),
                "incomplete year; no monthly summaries"
            );
        }
    }

    Ok(DatasetProducts {
        table,
        daily,
        monthly,
        training,
    })
}

/// Extract, assemble and aggregate one dataset for one site
pub fn build_products(
    site: &SiteConfig,
    dataset: &DatasetConfig,
    plan: &[SourcePlan],
) -> Result<DatasetProducts> {
    let series = extract_site(site, dataset, plan)?;
    let table = assemble(&dataset.name, dataset.family, series)?;
    summarize(table)
}

/// Stage every output, then persist them with the site table last.
///
/// The site table is what the skip check looks for, so it only appears once
/// every other output of the dataset is in place.
fn write_products(paths: &OutputPaths, products: &DatasetProducts) -> Result<()> {
    let mut staged = Vec::new();
    if !products.daily.is_empty() {
        staged.push(output::stage_daily(&paths.daily, &products.daily)?);
    }
    if !products.monthly.is_empty() {
        staged.push(output::stage_monthly(&paths.monthly, &products.monthly)?);
    }
    if let Some(training) = &products.training {
        staged.push(output::stage_training(&paths.training, training)?);
    }
    staged.push(output::stage_site_table(&paths.site_table, &products.table)?);
    output::persist_all(staged)
}

fn run_dataset(
    site: &SiteConfig,
    dataset: &DatasetConfig,
    options: &RunOptions,
) -> Result<DatasetOutcome> {
    let plan = source_plan(dataset)?;

    if !options.overwrite {
        if let Some((first, last)) = planned_years(dataset, &plan) {
            let existing =
                OutputPaths::new(&options.output_dir, &site.id, &dataset.name, first, last)
                    .site_table;
            if existing.exists() {
                return Ok(DatasetOutcome::Skipped { existing });
            }
        }
    }

    let products = build_products(site, dataset, &plan)?;
    let (first, last) = products.table.year_range().ok_or_else(|| MetPointError::Assembly {
        dataset: dataset.name.clone(),
        reason: "assembled table is empty".to_string(),
    })?;
    let paths = OutputPaths::new(&options.output_dir, &site.id, &dataset.name, first, last);
    write_products(&paths, &products)?;

    Ok(DatasetOutcome::Written {
        paths,
        rows: products.table.len(),
    })
}

/// Process one dataset for one site; errors carry the site and dataset
pub fn process_dataset(
    site: &SiteConfig,
    dataset: &DatasetConfig,
    options: &RunOptions,
) -> Result<DatasetOutcome> {
    info!(site = %site.id, dataset = %dataset.name, "processing dataset");
    let outcome =
        run_dataset(site, dataset, options).map_err(|e| e.with_context(&site.id, &dataset.name))?;
    match &outcome {
        DatasetOutcome::Written { paths, rows } => info!(
            site = %site.id,
            dataset = %dataset.name,
            rows,
            file = %paths.site_table.display(),
            "dataset written"
        ),
        DatasetOutcome::Skipped { existing } => info!(
            site = %site.id,
            dataset = %dataset.name,
            file = %existing.display(),
            "output exists; skipping"
        ),
    }
    Ok(outcome)
}

/// Every dataset of one site, in configuration order
pub fn process_site(site: &SiteConfig, datasets: &[DatasetConfig], options: &RunOptions) -> SiteReport {
    let outcomes = datasets
        .iter()
        .map(|dataset| {
            let result = process_dataset(site, dataset, options);
            if let Err(e) = &result {
                error!(site = %site.id, dataset = %dataset.name, "{e}");
            }
            (dataset.name.clone(), result)
        })
        .collect();
    SiteReport {
        site: site.id.clone(),
        outcomes,
    }
}

/// Run all `sites` through every configured dataset on a worker pool
pub fn run_sites(
    config: &RunConfig,
    sites: &[SiteConfig],
    parallel: &ParallelConfig,
    options: &RunOptions,
) -> Result<Vec<SiteReport>> {
    let pool = parallel.build_pool()?;
    Ok(pool.install(|| {
        sites
            .par_iter()
            .map(|site| process_site(site, &config.datasets, options))
            .collect()
    }))
}
