//! Start/end date tokens embedded in archive file names
//!
//! Reanalysis archives carry a year (`NLDAS_1980.nc`) or a full date token;
//! CMIP-style model files end in a `<start>-<end>` range of `YYYYMMDD`
//! (daily tables) or `YYYYMM` (monthly tables) tokens.

use crate::calendar::days_in_month;
use crate::errors::{MetPointError, Result};
use crate::variables::{DatasetFamily, Frequency};
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Resolution of a parsed date token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPrecision {
    Year,
    Month,
    Day,
}

/// Typed result of parsing a file label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateToken {
    pub start: NaiveDate,
    /// Last day covered, when the label carries a range
    pub end: Option<NaiveDate>,
    pub precision: TokenPrecision,
}

fn range_pattern() -> &'static Regex {
    static RANGE: OnceLock<Regex> = OnceLock::new();
    RANGE.get_or_init(|| {
        Regex::new(r"(?:^|[_.-])([0-9]{8}|[0-9]{6})-([0-9]{8}|[0-9]{6})$")
            .expect("valid range regex")
    })
}

fn digits_pattern() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit regex"))
}

/// File stem of a label that may be a bare name or a full path
pub fn label_stem(label: &str) -> &str {
    let name = Path::new(label)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(label);
    name.strip_suffix(".nc4")
        .or_else(|| name.strip_suffix(".nc"))
        .unwrap_or(name)
}

impl DateToken {
    /// Parse with the grammar of any family: a trailing range first, then the
    /// last standalone 8-, 6- or 4-digit token
    pub fn parse(label: &str) -> Result<Self> {
        let stem = label_stem(label);
        if let Some(token) = parse_range(label, stem)? {
            return Ok(token);
        }
        parse_last_token(label, stem, &[8, 6, 4])
    }

    /// Parse with the grammar of one dataset family
    pub fn parse_for(family: DatasetFamily, label: &str) -> Result<Self> {
        let stem = label_stem(label);
        match family {
            DatasetFamily::Reanalysis => parse_last_token(label, stem, &[8, 4]),
            DatasetFamily::ClimateModel => match parse_range(label, stem)? {
                Some(token) => Ok(token),
                None => parse_last_token(label, stem, &[8, 6]),
            },
        }
    }

    /// Native frequency implied by the token width for a family
    pub fn implied_frequency(&self, family: DatasetFamily) -> Frequency {
        match family {
            DatasetFamily::Reanalysis => Frequency::Hourly,
            DatasetFamily::ClimateModel => match self.precision {
                TokenPrecision::Month => Frequency::Monthly,
                TokenPrecision::Day | TokenPrecision::Year => Frequency::Daily,
            },
        }
    }
}

fn parse_range(label: &str, stem: &str) -> Result<Option<DateToken>> {
    let Some(caps) = range_pattern().captures(stem) else {
        return Ok(None);
    };
    let (start_raw, end_raw) = (&caps[1], &caps[2]);
    if start_raw.len() != end_raw.len() {
        return Err(MetPointError::timestamp(
            label,
            format!("date range '{start_raw}-{end_raw}' mixes token widths"),
        ));
    }

    let (start, precision) = parse_digits(label, start_raw, false)?;
    let (end, _) = parse_digits(label, end_raw, true)?;
    if end < start {
        return Err(MetPointError::timestamp(
            label,
            format!("date range ends ({end}) before it starts ({start})"),
        ));
    }

    Ok(Some(DateToken {
        start,
        end: Some(end),
        precision,
    }))
}

fn parse_last_token(label: &str, stem: &str, widths: &[usize]) -> Result<DateToken> {
    let raw = digits_pattern()
        .find_iter(stem)
        .map(|m| m.as_str())
        .filter(|d| widths.contains(&d.len()))
        .last()
        .ok_or_else(|| {
            MetPointError::timestamp(label, "no date token found in file label")
        })?;

    let (start, precision) = parse_digits(label, raw, false)?;
    Ok(DateToken {
        start,
        end: None,
        precision,
    })
}

/// Decode a fixed-width token; `as_end` resolves partial dates to their last day
fn parse_digits(label: &str, raw: &str, as_end: bool) -> Result<(NaiveDate, TokenPrecision)> {
    let number = |range: std::ops::Range<usize>| -> Result<u32> {
        raw.get(range)
            .ok_or_else(|| MetPointError::timestamp(label, format!("bad date token '{raw}'")))?
            .parse::<u32>()
            .map_err(|e| MetPointError::timestamp(label, format!("bad date token '{raw}': {e}")))
    };

    let year = number(0..4)? as i32;
    let (month, day, precision) = match raw.len() {
        4 => (if as_end { 12 } else { 1 }, None, TokenPrecision::Year),
        6 => (number(4..6)?, None, TokenPrecision::Month),
        8 => (number(4..6)?, Some(number(6..8)?), TokenPrecision::Day),
        _ => {
            return Err(MetPointError::timestamp(
                label,
                format!("date token '{raw}' has unsupported width"),
            ))
        }
    };

    let day = match day {
        Some(d) => d,
        None if as_end => days_in_month(year, month),
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| (date, precision))
        .ok_or_else(|| {
            MetPointError::timestamp(label, format!("date token '{raw}' is not a valid date"))
        })
}
