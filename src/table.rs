//! Typed per-variable series and assembled site tables

use crate::errors::{MetPointError, Result};
use crate::timestamps::TimeStep;
use crate::variables::{DatasetFamily, Frequency, MetVariable};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Time series of one physical quantity read from one file
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSeries {
    pub variable: MetVariable,
    pub frequency: Frequency,
    /// Hours per step; 24 for daily and monthly series
    pub step_hours: u32,
    pub source: PathBuf,
    pub timestamps: Vec<TimeStep>,
    pub values: Vec<f64>,
}

impl VariableSeries {
    /// Pair values with their timestamps; lengths must agree exactly
    pub fn new(
        variable: MetVariable,
        frequency: Frequency,
        step_hours: u32,
        source: PathBuf,
        timestamps: Vec<TimeStep>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if values.len() != timestamps.len() {
            return Err(MetPointError::LengthMismatch {
                file: source,
                variable: variable.to_string(),
                values: values.len(),
                timestamps: timestamps.len(),
            });
        }
        Ok(Self {
            variable,
            frequency,
            step_hours,
            source,
            timestamps,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// (timestamp, value) pairs in file order
    pub fn iter(&self) -> impl Iterator<Item = (&TimeStep, f64)> + '_ {
        self.timestamps.iter().zip(self.values.iter().copied())
    }
}

/// Assembled table for one site and one dataset
///
/// Rows are time steps in strictly increasing order; columns are variables.
/// A missing value is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteTable {
    pub dataset: String,
    pub family: DatasetFamily,
    pub frequency: Frequency,
    pub step_hours: u32,
    pub timestamps: Vec<TimeStep>,
    columns: BTreeMap<MetVariable, Vec<Option<f64>>>,
}

impl SiteTable {
    pub fn new(
        dataset: impl Into<String>,
        family: DatasetFamily,
        frequency: Frequency,
        step_hours: u32,
        timestamps: Vec<TimeStep>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            family,
            frequency,
            step_hours,
            timestamps,
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Add or replace a column; it must have one entry per row
    pub fn insert_column(&mut self, variable: MetVariable, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.len() {
            return Err(MetPointError::Assembly {
                dataset: self.dataset.clone(),
                reason: format!(
                    "column '{variable}' has {} rows, table has {}",
                    values.len(),
                    self.len()
                ),
            });
        }
        self.columns.insert(variable, values);
        Ok(())
    }

    pub fn column(&self, variable: MetVariable) -> Option<&[Option<f64>]> {
        self.columns.get(&variable).map(Vec::as_slice)
    }

    /// Column with missing values as NaN, ready for numeric reduction
    pub fn column_or_nan(&self, variable: MetVariable) -> Option<Vec<f64>> {
        self.column(variable)
            .map(|col| col.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    pub fn value(&self, variable: MetVariable, row: usize) -> Option<f64> {
        self.columns.get(&variable)?.get(row).copied().flatten()
    }

    /// True when the column exists and holds at least one value
    pub fn has_values(&self, variable: MetVariable) -> bool {
        self.column(variable)
            .is_some_and(|col| col.iter().any(Option::is_some))
    }

    pub fn variables(&self) -> impl Iterator<Item = MetVariable> + '_ {
        self.columns.keys().copied()
    }

    /// First and last calendar year covered
    pub fn year_range(&self) -> Option<(i32, i32)> {
        Some((self.timestamps.first()?.year, self.timestamps.last()?.year))
    }

    /// Copy of the rows in `range`, all columns included
    pub fn slice_rows(&self, range: std::ops::Range<usize>) -> SiteTable {
        SiteTable {
            dataset: self.dataset.clone(),
            family: self.family,
            frequency: self.frequency,
            step_hours: self.step_hours,
            timestamps: self.timestamps[range.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(var, col)| (*var, col[range.clone()].to_vec()))
                .collect(),
        }
    }

    /// One table per calendar year, in order
    pub fn split_by_year(&self) -> Vec<SiteTable> {
        let mut tables = Vec::new();
        let mut start = 0;
        for i in 1..=self.len() {
            if i == self.len() || self.timestamps[i].year != self.timestamps[start].year {
                tables.push(self.slice_rows(start..i));
                start = i;
            }
        }
        tables
    }
}
