//! Decoding of a file's own CF `time` coordinate
//!
//! Each coordinate value marks the END of its interval; the step is labelled
//! with the day and hour of the instant just before that end.

use super::{calendar_doy, TimeStep};
use crate::calendar::{Calendar, HOURS_PER_DAY, SECONDS_PER_DAY};
use crate::errors::{MetPointError, Result};
use crate::variables::Frequency;
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use tracing::warn;

/// Parsed CF `units` attribute of a time coordinate, e.g. `hours since 1980-01-01`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub seconds_per_unit: f64,
    pub origin: NaiveDateTime,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self> {
        let bad = |reason: &str| MetPointError::timestamp(units, reason.to_string());

        let (unit, origin) = units
            .split_once(" since ")
            .ok_or_else(|| bad("time units are not of the form '<unit> since <date>'"))?;

        let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "s" => 1.0,
            "minutes" | "minute" | "mins" => 60.0,
            "hours" | "hour" | "hrs" | "h" => 3600.0,
            "days" | "day" | "d" => SECONDS_PER_DAY,
            _ => return Err(bad("unsupported time unit")),
        };

        let origin = parse_origin(origin.trim()).ok_or_else(|| bad("unparseable reference date"))?;
        Ok(Self {
            seconds_per_unit,
            origin,
        })
    }
}

fn parse_origin(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = raw
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .split('.')
        .next()
        .unwrap_or(raw)
        .trim();

    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
        .or_else(|| {
            let date_part = cleaned.split([' ', 'T']).next()?;
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Decode coordinate values into time steps.
///
/// Sub-daily axes are then passed through [`reattribute_drift`], so every day
/// of the result holds exactly the same number of steps.
pub fn decode_time_axis(
    label: &str,
    values: &[f64],
    units: &TimeUnits,
    frequency: Frequency,
    calendar: Calendar,
) -> Result<Vec<TimeStep>> {
    let mut steps = Vec::with_capacity(values.len());
    for &value in values {
        // Round to the minute to absorb floating-point noise in the offsets
        let seconds = (value * units.seconds_per_unit / 60.0).round() as i64 * 60;
        let (date, second_of_day) = label_instant(label, units.origin, seconds - 1, calendar)?;
        let doy = calendar_doy(date, calendar);
        steps.push(match frequency {
            Frequency::Hourly => TimeStep {
                year: date.year(),
                month: date.month(),
                day: date.day(),
                doy,
                hour: Some(second_of_day / 3600),
            },
            Frequency::Daily => TimeStep::daily(date.year(), date.month(), date.day(), doy),
            Frequency::Monthly => TimeStep::monthly(date.year(), date.month()),
        });
    }

    if frequency != Frequency::Hourly {
        return Ok(steps);
    }

    let step_hours = infer_step_hours(label, values, units)?;
    reattribute_drift(label, steps, HOURS_PER_DAY / step_hours)
}

pub(crate) fn infer_step_hours(label: &str, values: &[f64], units: &TimeUnits) -> Result<u32> {
    let step_hours = match values {
        [first, second, ..] => ((second - first) * units.seconds_per_unit / 3600.0).round() as u32,
        _ => HOURS_PER_DAY,
    };
    if step_hours == 0 || HOURS_PER_DAY % step_hours != 0 {
        return Err(MetPointError::timestamp(
            label,
            format!("time coordinate spacing of {step_hours} h does not divide a day"),
        ));
    }
    Ok(step_hours)
}

/// Calendar date and second-of-day of `origin + seconds`
fn label_instant(
    label: &str,
    origin: NaiveDateTime,
    seconds: i64,
    calendar: Calendar,
) -> Result<(NaiveDate, u32)> {
    let overflow = || MetPointError::timestamp(label, "time coordinate overflows the calendar");
    match calendar {
        Calendar::Gregorian => {
            let instant = TimeDelta::try_seconds(seconds)
                .and_then(|delta| origin.checked_add_signed(delta))
                .ok_or_else(overflow)?;
            Ok((instant.date(), instant.num_seconds_from_midnight()))
        }
        Calendar::NoLeap => {
            let origin_day = i64::from(origin.year()) * 365
                + i64::from(calendar_doy(origin.date(), Calendar::NoLeap))
                - 1;
            let total = origin_day * 86_400 + i64::from(origin.num_seconds_from_midnight()) + seconds;
            let day_index = total.div_euclid(86_400);
            let second_of_day = total.rem_euclid(86_400) as u32;
            let year = i32::try_from(day_index.div_euclid(365)).map_err(|_| overflow())?;
            let doy = day_index.rem_euclid(365) as u32 + 1;
            // Month and day of a no-leap day-of-year follow any common year
            let common = NaiveDate::from_yo_opt(2001, doy).ok_or_else(overflow)?;
            let date = NaiveDate::from_ymd_opt(year, common.month(), common.day())
                .ok_or_else(overflow)?;
            Ok((date, second_of_day))
        }
    }
}

/// Fix one-step drift in a sub-daily axis.
///
/// Workaround for an artifact seen in some hourly reanalysis archives: a day
/// occasionally receives one step too many while the day before it is one
/// short. The first step of the over-full day is handed back to the previous
/// day, then every day's hours are renumbered as end-of-interval labels.
/// Any day that still does not hold exactly `steps_per_day` steps is an error.
pub fn reattribute_drift(
    label: &str,
    mut steps: Vec<TimeStep>,
    steps_per_day: u32,
) -> Result<Vec<TimeStep>> {
    let per_day = steps_per_day as usize;
    let step_hours = HOURS_PER_DAY / steps_per_day.max(1);

    // Runs of consecutive steps on the same day: (start index, length)
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        let same_day = runs
            .last()
            .is_some_and(|&(start, _)| steps[start].daily_key() == step.daily_key());
        match runs.last_mut() {
            Some(run) if same_day => run.1 += 1,
            _ => runs.push((i, 1)),
        }
    }

    for r in 1..runs.len() {
        let (prev_start, prev_len) = runs[r - 1];
        let (start, len) = runs[r];
        if len == per_day + 1 && prev_len + 1 == per_day {
            let target = steps[prev_start];
            warn!(
                file = label,
                year = steps[start].year,
                doy = steps[start].doy,
                "day holds one extra step; reattributing it to the previous day"
            );
            steps[start] = TimeStep { hour: None, ..target };
            runs[r - 1].1 += 1;
            runs[r] = (start + 1, len - 1);
        }
    }

    for (r, &(start, len)) in runs.iter().enumerate() {
        let key = steps[start].daily_key();
        if len != per_day {
            return Err(MetPointError::timestamp(
                label,
                format!(
                    "year {} day {} holds {len} steps, expected {per_day}",
                    key.0, key.1
                ),
            ));
        }
        if r > 0 && steps[runs[r - 1].0].daily_key() >= key {
            return Err(MetPointError::timestamp(
                label,
                format!("time coordinate is not increasing at year {} day {}", key.0, key.1),
            ));
        }
        for (k, step) in steps[start..start + len].iter_mut().enumerate() {
            step.hour = Some((k as u32 + 1) * step_hours - 1);
        }
    }

    Ok(steps)
}
