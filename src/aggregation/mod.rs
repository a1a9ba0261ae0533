//! Temporal aggregation of assembled site tables
//!
//! Sub-daily tables reduce to daily summaries, one calendar year at a time;
//! a full year of daily summaries reduces to twelve monthly summaries.

pub mod daily;
pub mod monthly;
pub mod reducers;

pub use daily::{daily_from_hourly, daily_from_model_table, DailySummary};
pub use monthly::{monthly_from_daily, MonthlySummary};
pub use reducers::{reduce, StatOperation, StatisticalReduction};

/// Consecutive runs of daily summaries sharing a calendar year
pub fn split_years(daily: &[DailySummary]) -> Vec<&[DailySummary]> {
    daily.chunk_by(|a, b| a.year == b.year).collect()
}
