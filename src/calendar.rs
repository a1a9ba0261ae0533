//! Calendar arithmetic shared by the timestamp reconstructor and the aggregator
//!
//! Leap years, month lengths and the fixed day-of-year month boundaries live
//! here and nowhere else, so timestamps and month partitions always agree.

use crate::errors::{MetPointError, Result};
use chrono::{Datelike, NaiveDate};
use std::ops::Range;

/// First day-of-year of each month in a 365-day year
pub const MONTH_START_DOY: [u32; 12] = [1, 32, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Hours in a day, and the fixed step length of hourly archives in seconds
pub const HOURS_PER_DAY: u32 = 24;
pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Calendar used by a model time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Calendar {
    /// Proleptic Gregorian (`standard`, `gregorian`, `proleptic_gregorian`)
    #[default]
    Gregorian,
    /// Every year has 365 days (`noleap`, `365_day`)
    NoLeap,
}

impl Calendar {
    /// Parse a CF `calendar` attribute value
    pub fn from_cf(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "standard" | "gregorian" | "proleptic_gregorian" | "julian" => {
                Ok(Calendar::Gregorian)
            }
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            other => Err(MetPointError::timestamp(
                other,
                "unsupported model calendar",
            )),
        }
    }

    pub fn is_leap_year(self, year: i32) -> bool {
        match self {
            Calendar::Gregorian => is_leap_year(year),
            Calendar::NoLeap => false,
        }
    }

    pub fn days_in_year(self, year: i32) -> u32 {
        if self.is_leap_year(year) {
            366
        } else {
            365
        }
    }
}

/// Gregorian leap-year rule: divisible by 4, except centuries not divisible by 400
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    Calendar::Gregorian.days_in_year(year)
}

/// Number of days in `month` (1-12) of `year`
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Month start days-of-year, shifted by one from March onward in leap years
pub fn month_start_doys(leap: bool) -> [u32; 12] {
    let mut starts = MONTH_START_DOY;
    if leap {
        for start in starts.iter_mut().skip(2) {
            *start += 1;
        }
    }
    starts
}

/// Zero-based row ranges of the twelve months in a table of one year of daily rows
pub fn month_row_ranges(n_days: usize) -> Result<[Range<usize>; 12]> {
    let leap = match n_days {
        365 => false,
        366 => true,
        other => {
            return Err(MetPointError::IrregularYear {
                rows: other,
                expected: "365 or 366 daily rows".to_string(),
            })
        }
    };

    let starts = month_start_doys(leap);
    Ok(std::array::from_fn(|m| {
        let start = (starts[m] - 1) as usize;
        let end = if m == 11 {
            n_days
        } else {
            (starts[m + 1] - 1) as usize
        };
        start..end
    }))
}

/// Calendar date for a 1-based day-of-year
pub fn date_from_doy(year: i32, doy: u32) -> Option<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy)
}

/// (month, day) for a 1-based day-of-year
pub fn month_day_from_doy(year: i32, doy: u32) -> Option<(u32, u32)> {
    date_from_doy(year, doy).map(|d| (d.month(), d.day()))
}

/// 1-based day-of-year for a calendar date
pub fn doy_from_month_day(year: i32, month: u32, day: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.ordinal())
}

/// Whole months from (y0, m0) to (y1, m1), inclusive of both ends
pub fn months_inclusive(y0: i32, m0: u32, y1: i32, m1: u32) -> i64 {
    (i64::from(y1) - i64::from(y0)) * 12 + i64::from(m1) - i64::from(m0) + 1
}

/// Advance (year, month) by one month
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
