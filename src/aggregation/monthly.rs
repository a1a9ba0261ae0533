//! Monthly summaries from one year of daily summaries

use super::daily::DailySummary;
use super::reducers::{reduce, StatOperation};
use crate::calendar;
use crate::errors::Result;
use ndarray::{s, Array1};

/// One calendar month of reduced meteorology
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub dataset: String,
    pub year: i32,
    pub month: u32,
    /// Daily rows reduced into this month
    pub n_days: usize,
    pub tair_mean: f64,
    pub tair_min: f64,
    pub tair_max: f64,
    pub precip_tot: f64,
    pub swdown: f64,
    /// Mean sunlit hours per day
    pub hrs_sun: f64,
    pub lwdown: f64,
    pub press: f64,
    pub qair: f64,
    pub wind: f64,
}

/// Partition 365 or 366 daily rows into the twelve fixed month ranges.
///
/// Temperature mean, min and max come from the daily mean, min and max;
/// precipitation is summed; everything else, sunlit hours included, is averaged.
pub fn monthly_from_daily(daily: &[DailySummary]) -> Result<Vec<MonthlySummary>> {
    let ranges = calendar::month_row_ranges(daily.len())?;

    let field = |get: fn(&DailySummary) -> f64| -> Array1<f64> { daily.iter().map(get).collect() };
    let tair_mean = field(|d| d.tair_mean);
    let tair_min = field(|d| d.tair_min);
    let tair_max = field(|d| d.tair_max);
    let precip_tot = field(|d| d.precip_tot);
    let swdown = field(|d| d.swdown);
    let hrs_sun = field(|d| d.hrs_sun);
    let lwdown = field(|d| d.lwdown);
    let press = field(|d| d.press);
    let qair = field(|d| d.qair);
    let wind = field(|d| d.wind);

    let summaries = ranges
        .iter()
        .zip(1u32..)
        .map(|(range, month)| {
            let over = |values: &Array1<f64>, operation| {
                reduce(values.slice(s![range.clone()]), operation)
            };
            MonthlySummary {
                dataset: daily[range.start].dataset.clone(),
                year: daily[range.start].year,
                month,
                n_days: range.len(),
                tair_mean: over(&tair_mean, StatOperation::Mean),
                tair_min: over(&tair_min, StatOperation::Min),
                tair_max: over(&tair_max, StatOperation::Max),
                precip_tot: over(&precip_tot, StatOperation::Sum),
                swdown: over(&swdown, StatOperation::Mean),
                hrs_sun: over(&hrs_sun, StatOperation::Mean),
                lwdown: over(&lwdown, StatOperation::Mean),
                press: over(&press, StatOperation::Mean),
                qair: over(&qair, StatOperation::Mean),
                wind: over(&wind, StatOperation::Mean),
            }
        })
        .collect();
    Ok(summaries)
}
