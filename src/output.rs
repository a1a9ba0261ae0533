//! CSV outputs for one site and one dataset
//!
//! Every file is first staged in a temporary file in the target directory.
//! Staged files are persisted under their final names only once all outputs
//! of a dataset have been written.

use crate::aggregation::{DailySummary, MonthlySummary};
use crate::derived::TrainingTable;
use crate::errors::{MetPointError, Result};
use crate::table::SiteTable;
use crate::timestamps::TimeStep;
use crate::variables::Frequency;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Output file locations for one site, dataset and year range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub site_table: PathBuf,
    pub daily: PathBuf,
    pub monthly: PathBuf,
    pub training: PathBuf,
}

impl OutputPaths {
    /// `{site}_{dataset}_{first}-{last}` plus a per-kind suffix
    pub fn new(dir: &Path, site: &str, dataset: &str, first_year: i32, last_year: i32) -> Self {
        let stem = format!("{site}_{dataset}_{first_year}-{last_year}");
        Self {
            site_table: dir.join(format!("{stem}.csv")),
            daily: dir.join(format!("{stem}_day.csv")),
            monthly: dir.join(format!("{stem}_month.csv")),
            training: dir.join(format!("{stem}_train.csv")),
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// A fully written output waiting in a temporary file next to its target
#[derive(Debug)]
pub struct StagedOutput {
    temp: NamedTempFile,
    path: PathBuf,
}

impl StagedOutput {
    /// Move the temporary file onto its final name
    pub fn persist(self) -> Result<()> {
        self.temp
            .persist(&self.path)
            .map_err(|e| MetPointError::Io(e.error))?;
        debug!(file = %self.path.display(), "wrote output");
        Ok(())
    }
}

fn stage<F>(path: &Path, write_rows: F) -> Result<StagedOutput>
where
    F: FnOnce(&mut csv::Writer<&mut File>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        write_rows(&mut writer)?;
        writer.flush()?;
    }
    Ok(StagedOutput {
        temp,
        path: path.to_path_buf(),
    })
}

/// Persist staged outputs in order, stopping at the first failure.
///
/// Callers put the file whose presence marks a finished dataset last.
pub fn persist_all(staged: Vec<StagedOutput>) -> Result<()> {
    for output in staged {
        output.persist()?;
    }
    Ok(())
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn time_cells(dataset: &str, step: &TimeStep, frequency: Frequency) -> Vec<String> {
    let (day, doy) = match frequency {
        Frequency::Monthly => (String::new(), String::new()),
        _ => (step.day.to_string(), step.doy.to_string()),
    };
    vec![
        dataset.to_string(),
        step.year.to_string(),
        step.month.to_string(),
        day,
        doy,
        step.hour.map(|h| h.to_string()).unwrap_or_default(),
    ]
}

const TIME_HEADER: [&str; 6] = ["dataset", "year", "month", "day", "doy", "hour"];

/// Stage the assembled site table with the family's fixed columns
pub fn stage_site_table(path: &Path, table: &SiteTable) -> Result<StagedOutput> {
    let variables = table.family.output_columns();
    stage(path, |writer| {
        let header = TIME_HEADER
            .iter()
            .copied()
            .chain(variables.iter().map(|v| v.column_name()));
        writer.write_record(header)?;

        for (row, step) in table.timestamps.iter().enumerate() {
            let mut record = time_cells(&table.dataset, step, table.frequency);
            record.extend(variables.iter().map(|&v| cell(table.value(v, row))));
            writer.write_record(&record)?;
        }
        Ok(())
    })
}

#[derive(Debug, Serialize)]
struct DailyRecord<'a> {
    dataset: &'a str,
    year: i32,
    doy: u32,
    month: u32,
    day: u32,
    tair_mean: Option<f64>,
    tair_min: Option<f64>,
    tair_max: Option<f64>,
    precip_tot: Option<f64>,
    swdown: Option<f64>,
    hrs_sun: Option<f64>,
    lwdown: Option<f64>,
    press: Option<f64>,
    qair: Option<f64>,
    wind: Option<f64>,
    max_departure: Option<f64>,
    min_departure: Option<f64>,
}

impl<'a> From<&'a DailySummary> for DailyRecord<'a> {
    fn from(d: &'a DailySummary) -> Self {
        Self {
            dataset: &d.dataset,
            year: d.year,
            doy: d.doy,
            month: d.month,
            day: d.day,
            tair_mean: finite(d.tair_mean),
            tair_min: finite(d.tair_min),
            tair_max: finite(d.tair_max),
            precip_tot: finite(d.precip_tot),
            swdown: finite(d.swdown),
            hrs_sun: finite(d.hrs_sun),
            lwdown: finite(d.lwdown),
            press: finite(d.press),
            qair: finite(d.qair),
            wind: finite(d.wind),
            max_departure: d.max_departure,
            min_departure: d.min_departure,
        }
    }
}

#[derive(Debug, Serialize)]
struct MonthlyRecord<'a> {
    dataset: &'a str,
    year: i32,
    month: u32,
    n_days: usize,
    tair_mean: Option<f64>,
    tair_min: Option<f64>,
    tair_max: Option<f64>,
    precip_tot: Option<f64>,
    swdown: Option<f64>,
    hrs_sun: Option<f64>,
    lwdown: Option<f64>,
    press: Option<f64>,
    qair: Option<f64>,
    wind: Option<f64>,
}

impl<'a> From<&'a MonthlySummary> for MonthlyRecord<'a> {
    fn from(m: &'a MonthlySummary) -> Self {
        Self {
            dataset: &m.dataset,
            year: m.year,
            month: m.month,
            n_days: m.n_days,
            tair_mean: finite(m.tair_mean),
            tair_min: finite(m.tair_min),
            tair_max: finite(m.tair_max),
            precip_tot: finite(m.precip_tot),
            swdown: finite(m.swdown),
            hrs_sun: finite(m.hrs_sun),
            lwdown: finite(m.lwdown),
            press: finite(m.press),
            qair: finite(m.qair),
            wind: finite(m.wind),
        }
    }
}

/// Stage daily summaries; undefined statistics are left empty
pub fn stage_daily(path: &Path, daily: &[DailySummary]) -> Result<StagedOutput> {
    stage(path, |writer| {
        for day in daily {
            writer.serialize(DailyRecord::from(day))?;
        }
        Ok(())
    })
}

/// Stage monthly summaries; undefined statistics are left empty
pub fn stage_monthly(path: &Path, monthly: &[MonthlySummary]) -> Result<StagedOutput> {
    stage(path, |writer| {
        for month in monthly {
            writer.serialize(MonthlyRecord::from(month))?;
        }
        Ok(())
    })
}

/// Stage the training table: per variable its value, lag, day mean and next-day mean
pub fn stage_training(path: &Path, training: &TrainingTable) -> Result<StagedOutput> {
    stage(path, |writer| {
        let mut header: Vec<String> = TIME_HEADER.iter().map(|h| h.to_string()).collect();
        for column in &training.columns {
            let name = column.variable.column_name();
            header.extend([
                name.to_string(),
                format!("{name}_lag"),
                format!("{name}_day"),
                format!("{name}_next_day"),
            ]);
        }
        writer.write_record(&header)?;

        for (row, step) in training.timestamps.iter().enumerate() {
            let mut record = time_cells(&training.dataset, step, Frequency::Hourly);
            for column in &training.columns {
                record.extend([
                    cell(column.value[row]),
                    cell(column.lag[row]),
                    cell(column.daily_mean[row]),
                    cell(column.next_day_mean[row]),
                ]);
            }
            writer.write_record(&record)?;
        }
        Ok(())
    })
}
