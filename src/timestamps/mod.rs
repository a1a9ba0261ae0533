//! Calendar-correct timestamps for every step of a source file
//!
//! Two sources of time are supported:
//! - [`label`]: the start-date token in the file name plus the step count
//!   (the default, [`reconstruct`]);
//! - [`coordinate`]: the file's own CF `time` axis, with the one-step drift
//!   correction some hourly archives need.
//!
//! Sub-daily hours mark the END of the averaging interval: an hourly step
//! covering 00:00-01:00 is labelled hour 0, the step ending at midnight is
//! labelled hour 23.

pub mod coordinate;
pub mod label;

pub use coordinate::{decode_time_axis, reattribute_drift, TimeUnits};
pub use label::{DateToken, TokenPrecision};

use crate::calendar::{self, Calendar, HOURS_PER_DAY};
use crate::errors::{MetPointError, Result};
use crate::variables::Frequency;
use chrono::{Datelike, NaiveDate};

/// One step of a reconstructed time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStep {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// 1-based day-of-year in the calendar of the source
    pub doy: u32,
    /// End-of-interval hour label, present for sub-daily steps only
    pub hour: Option<u32>,
}

impl TimeStep {
    /// Sub-daily step on a Gregorian day-of-year
    pub fn hourly(year: i32, doy: u32, hour: u32) -> Option<Self> {
        let (month, day) = calendar::month_day_from_doy(year, doy)?;
        Some(Self {
            year,
            month,
            day,
            doy,
            hour: Some(hour),
        })
    }

    /// Daily step; `doy` is given explicitly so no-leap calendars keep 365 days
    pub fn daily(year: i32, month: u32, day: u32, doy: u32) -> Self {
        Self {
            year,
            month,
            day,
            doy,
            hour: None,
        }
    }

    /// Monthly step, anchored on the first day of the month
    pub fn monthly(year: i32, month: u32) -> Self {
        let doy = calendar::doy_from_month_day(year, month, 1).unwrap_or(1);
        Self {
            year,
            month,
            day: 1,
            doy,
            hour: None,
        }
    }

    /// Join key of daily-resolution rows
    pub fn daily_key(&self) -> (i32, u32) {
        (self.year, self.doy)
    }

    /// Join key of monthly-resolution rows
    pub fn monthly_key(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    /// Continuous position in decimal years of `calendar`, hour counted at the
    /// end of the interval
    pub fn offset(&self, calendar: Calendar) -> f64 {
        let days = f64::from(calendar.days_in_year(self.year));
        let hour_fraction = self.hour.map_or(0.0, |h| f64::from(h + 1) / 24.0);
        f64::from(self.year) + (f64::from(self.doy - 1) + hour_fraction) / days
    }
}

/// Steps per day of a sub-daily archive holding `n_steps` steps over `days` days.
///
/// The ratio is rounded to the nearest integer and must divide 24.
pub fn steps_per_day(label: &str, n_steps: usize, days: u32) -> Result<u32> {
    if n_steps == 0 || days == 0 {
        return Err(MetPointError::timestamp(label, "file has no time steps"));
    }
    let per_day = (n_steps as f64 / f64::from(days)).round() as u32;
    if per_day == 0 || HOURS_PER_DAY % per_day != 0 {
        return Err(MetPointError::timestamp(
            label,
            format!("{n_steps} steps over {days} days is not a whole-hour sub-daily step"),
        ));
    }
    Ok(per_day)
}

/// Reconstruct the time axis of a file from its label (Gregorian calendar)
pub fn reconstruct(label: &str, n_steps: usize, frequency: Frequency) -> Result<Vec<TimeStep>> {
    let token = DateToken::parse(label)?;
    reconstruct_from_token(label, &token, n_steps, frequency, Calendar::Gregorian)
}

/// Reconstruct the time axis from an already parsed token and calendar
pub fn reconstruct_from_token(
    label: &str,
    token: &DateToken,
    n_steps: usize,
    frequency: Frequency,
    calendar: Calendar,
) -> Result<Vec<TimeStep>> {
    match frequency {
        Frequency::Hourly => reconstruct_sub_daily(label, token, n_steps),
        Frequency::Daily => reconstruct_daily(label, token, n_steps, calendar),
        Frequency::Monthly => reconstruct_monthly(label, token, n_steps),
    }
}

/// Hours between consecutive steps of a sub-daily archive starting at `token`
pub fn sub_daily_step_hours(label: &str, token: &DateToken, n_steps: usize) -> Result<u32> {
    let days = days_covered(token);
    Ok(HOURS_PER_DAY / steps_per_day(label, n_steps, days)?)
}

/// Sub-daily archives cover the rest of the start year, i.e. the whole year
/// for year tokens
fn days_covered(token: &DateToken) -> u32 {
    let year = token.start.year();
    calendar::days_in_year(year) - token.start.ordinal() + 1
}

fn reconstruct_sub_daily(label: &str, token: &DateToken, n_steps: usize) -> Result<Vec<TimeStep>> {
    let year = token.start.year();
    let days = days_covered(token);
    let per_day = steps_per_day(label, n_steps, days)?;

    let expected = (days * per_day) as usize;
    if n_steps != expected {
        return Err(MetPointError::timestamp(
            label,
            format!(
                "{n_steps} steps is not a whole number of days at {per_day} steps/day \
                 (expected {expected})"
            ),
        ));
    }

    let step_hours = HOURS_PER_DAY / per_day;
    let first_doy = token.start.ordinal();
    let mut steps = Vec::with_capacity(n_steps);
    for doy in first_doy..first_doy + days {
        for k in 1..=per_day {
            let step = TimeStep::hourly(year, doy, k * step_hours - 1).ok_or_else(|| {
                MetPointError::timestamp(label, format!("day-of-year {doy} outside {year}"))
            })?;
            steps.push(step);
        }
    }
    Ok(steps)
}

fn reconstruct_daily(
    label: &str,
    token: &DateToken,
    n_steps: usize,
    calendar: Calendar,
) -> Result<Vec<TimeStep>> {
    let mut steps = Vec::with_capacity(n_steps);
    let mut date = token.start;
    if calendar == Calendar::NoLeap && is_feb_29(date) {
        return Err(MetPointError::timestamp(
            label,
            "no-leap archive starts on 29 February",
        ));
    }

    while steps.len() < n_steps {
        steps.push(TimeStep::daily(
            date.year(),
            date.month(),
            date.day(),
            calendar_doy(date, calendar),
        ));
        date = next_day(label, date, calendar)?;
    }

    if let Some(end) = token.end {
        let last = steps.last().map(|s| (s.year, s.month, s.day));
        let expected_last = Some((end.year(), end.month(), end.day()));
        if last != expected_last {
            return Err(MetPointError::timestamp(
                label,
                format!(
                    "{n_steps} daily steps from {} do not end on {end} in the {calendar:?} calendar",
                    token.start
                ),
            ));
        }
    }
    Ok(steps)
}

fn reconstruct_monthly(label: &str, token: &DateToken, n_steps: usize) -> Result<Vec<TimeStep>> {
    if let Some(end) = token.end {
        let span = calendar::months_inclusive(
            token.start.year(),
            token.start.month(),
            end.year(),
            end.month(),
        );
        if span != n_steps as i64 {
            return Err(MetPointError::timestamp(
                label,
                format!("{n_steps} monthly steps but the label spans {span} months"),
            ));
        }
    }

    let (mut year, mut month) = (token.start.year(), token.start.month());
    let mut steps = Vec::with_capacity(n_steps);
    for _ in 0..n_steps {
        steps.push(TimeStep::monthly(year, month));
        (year, month) = calendar::next_month(year, month);
    }
    Ok(steps)
}

fn is_feb_29(date: NaiveDate) -> bool {
    date.month() == 2 && date.day() == 29
}

fn next_day(label: &str, date: NaiveDate, calendar: Calendar) -> Result<NaiveDate> {
    let mut next = date
        .succ_opt()
        .ok_or_else(|| MetPointError::timestamp(label, "date overflow"))?;
    if calendar == Calendar::NoLeap && is_feb_29(next) {
        next = next
            .succ_opt()
            .ok_or_else(|| MetPointError::timestamp(label, "date overflow"))?;
    }
    Ok(next)
}

/// Day-of-year in `calendar`; no-leap years never count 29 February
pub(crate) fn calendar_doy(date: NaiveDate, calendar: Calendar) -> u32 {
    let ordinal = date.ordinal();
    if calendar == Calendar::NoLeap && calendar::is_leap_year(date.year()) && date.month() > 2 {
        ordinal - 1
    } else {
        ordinal
    }
}
