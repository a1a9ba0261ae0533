//! Quantities derived from assembled tables and daily summaries

use crate::aggregation::reducers::reduce_slice;
use crate::aggregation::{DailySummary, StatOperation};
use crate::errors::Result;
use crate::table::SiteTable;
use crate::timestamps::TimeStep;
use crate::variables::MetVariable;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Vector magnitude of the eastward and northward wind components.
///
/// A single-direction trigonometric decomposition was considered as an
/// alternative and is not used.
pub fn wind_speed(eastward: f64, northward: f64) -> f64 {
    (eastward * eastward + northward * northward).sqrt()
}

/// Add a `wind` column from `uas` and `vas`.
///
/// Rows missing either component get no wind value. A table without both
/// component columns is left unchanged.
pub fn add_wind_speed(table: &mut SiteTable) -> Result<()> {
    let wind: Vec<Option<f64>> = match (
        table.column(MetVariable::Uas),
        table.column(MetVariable::Vas),
    ) {
        (Some(u), Some(v)) => u
            .iter()
            .zip(v)
            .map(|pair| match pair {
                (Some(u), Some(v)) => Some(wind_speed(*u, *v)),
                _ => None,
            })
            .collect(),
        _ => return Ok(()),
    };
    table.insert_column(MetVariable::Wind, wind)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Fill `max_departure` and `min_departure` from each day's max, min and mean
pub fn apply_departures(daily: &mut [DailySummary]) {
    for day in daily {
        day.max_departure = finite(day.tair_max - day.tair_mean);
        day.min_departure = finite(day.tair_min - day.tair_mean);
    }
}

/// Four feature columns for one variable of the training table
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingColumn {
    pub variable: MetVariable,
    pub value: Vec<Option<f64>>,
    /// Value at the previous step
    pub lag: Vec<Option<f64>>,
    /// Mean of the row's day
    pub daily_mean: Vec<Option<f64>>,
    /// Mean of the following calendar day
    pub next_day_mean: Vec<Option<f64>>,
}

/// Sub-daily rows enriched with daily context for model fitting
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTable {
    pub dataset: String,
    pub timestamps: Vec<TimeStep>,
    pub columns: Vec<TrainingColumn>,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, variable: MetVariable) -> Option<&TrainingColumn> {
        self.columns.iter().find(|c| c.variable == variable)
    }
}

/// Build the training table for the family's output variables.
///
/// Lags and next-day means are absent at the edges of the series and across
/// gaps of more than one day.
pub fn training_table(hourly: &SiteTable) -> TrainingTable {
    // Row range of each day, in order
    let mut days: Vec<(NaiveDate, std::ops::Range<usize>)> = Vec::new();
    for (row, step) in hourly.timestamps.iter().enumerate() {
        let same_day = days
            .last()
            .is_some_and(|(_, range)| hourly.timestamps[range.start].daily_key() == step.daily_key());
        match days.last_mut() {
            Some((_, range)) if same_day => range.end = row + 1,
            _ => {
                if let Some(date) = NaiveDate::from_ymd_opt(step.year, step.month, step.day) {
                    days.push((date, row..row + 1));
                }
            }
        }
    }
    let day_of_row: BTreeMap<usize, usize> = days
        .iter()
        .enumerate()
        .flat_map(|(d, (_, range))| range.clone().map(move |row| (row, d)))
        .collect();
    let date_of_row = |row: usize| day_of_row.get(&row).map(|&d| days[d].0);
    // Previous row usable as a lag: same day or the day before
    let lag_source: Vec<Option<usize>> = (0..hourly.len())
        .map(|row| {
            let prev = row.checked_sub(1)?;
            let gap = date_of_row(row)? - date_of_row(prev)?;
            (gap.num_days() <= 1).then_some(prev)
        })
        .collect();

    let columns = hourly
        .family
        .output_columns()
        .iter()
        .filter_map(|&variable| {
            let values = hourly.column(variable)?;
            let nan_values = hourly.column_or_nan(variable)?;
            let means: Vec<Option<f64>> = days
                .iter()
                .map(|(_, range)| finite(reduce_slice(&nan_values[range.clone()], StatOperation::Mean)))
                .collect();

            let lag = lag_source
                .iter()
                .map(|prev| prev.and_then(|p| values[p]))
                .collect();
            let daily_mean = (0..values.len())
                .map(|row| day_of_row.get(&row).and_then(|&d| means[d]))
                .collect();
            let next_day_mean = (0..values.len())
                .map(|row| {
                    let &d = day_of_row.get(&row)?;
                    let (date, _) = days.get(d)?;
                    let (next_date, _) = days.get(d + 1)?;
                    if date.succ_opt()? == *next_date {
                        means[d + 1]
                    } else {
                        None
                    }
                })
                .collect();

            Some(TrainingColumn {
                variable,
                value: values.to_vec(),
                lag,
                daily_mean,
                next_day_mean,
            })
        })
        .collect();

    TrainingTable {
        dataset: hourly.dataset.clone(),
        timestamps: hourly.timestamps.clone(),
        columns,
    }
}
