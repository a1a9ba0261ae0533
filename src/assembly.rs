//! Merging per-file, per-variable series into one site table
//!
//! Series are grouped by native frequency. Each group is outer-joined on its
//! own time key; coarser groups are then broadcast onto the finest group
//! (daily values onto every hour of the day, monthly values onto every day or
//! hour of the month).

use crate::calendar;
use crate::derived;
use crate::errors::{MetPointError, Result};
use crate::table::{SiteTable, VariableSeries};
use crate::timestamps::TimeStep;
use crate::variables::{DatasetFamily, Frequency, MetVariable};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Join key of a row at a given frequency
type RowKey = (i32, u32, u32);

fn row_key(step: &TimeStep, frequency: Frequency) -> RowKey {
    let ((a, b), c) = match frequency {
        Frequency::Hourly => (step.daily_key(), step.hour.unwrap_or(0)),
        Frequency::Daily => (step.daily_key(), 0),
        Frequency::Monthly => (step.monthly_key(), 0),
    };
    (a, b, c)
}

/// Outer-joined rows of one frequency group
struct WideGroup {
    frequency: Frequency,
    step_hours: u32,
    rows: BTreeMap<RowKey, (TimeStep, BTreeMap<MetVariable, f64>)>,
}

impl WideGroup {
    fn build(dataset: &str, frequency: Frequency, series: &[VariableSeries]) -> Result<Self> {
        let step_hours = series.first().map_or(calendar::HOURS_PER_DAY, |s| s.step_hours);
        let mut rows: BTreeMap<RowKey, (TimeStep, BTreeMap<MetVariable, f64>)> = BTreeMap::new();

        for s in series {
            if s.step_hours != step_hours {
                return Err(MetPointError::Assembly {
                    dataset: dataset.to_string(),
                    reason: format!(
                        "'{}' in {:?} has a {} h step, other {frequency} series have {step_hours} h",
                        s.variable, s.source, s.step_hours
                    ),
                });
            }
            for (step, value) in s.iter() {
                let (_, values) = rows
                    .entry(row_key(step, frequency))
                    .or_insert_with(|| (*step, BTreeMap::new()));
                if values.insert(s.variable, value).is_some() {
                    return Err(MetPointError::Assembly {
                        dataset: dataset.to_string(),
                        reason: format!(
                            "'{}' has two values for {}-{:03} hour {:?} (overlapping files, last in {:?})",
                            s.variable, step.year, step.doy, step.hour, s.source
                        ),
                    });
                }
            }
        }

        Ok(Self {
            frequency,
            step_hours,
            rows,
        })
    }
}

/// Time steps at `fine` resolution covering one coarse step
fn expand_step(step: &TimeStep, coarse: Frequency, fine: Frequency, step_hours: u32) -> Vec<TimeStep> {
    let days: Vec<TimeStep> = match coarse {
        Frequency::Monthly => {
            let first = calendar::doy_from_month_day(step.year, step.month, 1).unwrap_or(1);
            (0..calendar::days_in_month(step.year, step.month))
                .map(|d| TimeStep::daily(step.year, step.month, d + 1, first + d))
                .collect()
        }
        _ => vec![TimeStep { hour: None, ..*step }],
    };

    if fine != Frequency::Hourly {
        return days;
    }
    let per_day = calendar::HOURS_PER_DAY / step_hours.max(1);
    days.iter()
        .flat_map(|day| {
            (1..=per_day).map(move |k| TimeStep {
                hour: Some(k * step_hours - 1),
                ..*day
            })
        })
        .collect()
}

/// Assemble all series of one dataset into a site table
pub fn assemble(
    dataset: &str,
    family: DatasetFamily,
    series: Vec<VariableSeries>,
) -> Result<SiteTable> {
    if series.is_empty() {
        return Err(MetPointError::Assembly {
            dataset: dataset.to_string(),
            reason: "no variable series were extracted".to_string(),
        });
    }

    let mut by_frequency: BTreeMap<Frequency, Vec<VariableSeries>> = BTreeMap::new();
    for s in series {
        by_frequency.entry(s.frequency).or_default().push(s);
    }

    let mut groups = by_frequency
        .iter()
        .map(|(frequency, members)| WideGroup::build(dataset, *frequency, members))
        .collect::<Result<Vec<_>>>()?
        .into_iter();

    // Finest frequency first (BTreeMap order); it defines the row grid
    let mut base = match groups.next() {
        Some(group) => group,
        None => {
            return Err(MetPointError::Assembly {
                dataset: dataset.to_string(),
                reason: "no variable series were extracted".to_string(),
            })
        }
    };

    for coarse in groups {
        debug!(
            dataset,
            from = %coarse.frequency,
            onto = %base.frequency,
            rows = coarse.rows.len(),
            "broadcasting coarser group"
        );

        // Outer join: coarse keys with no finer rows still get rows
        let covered: BTreeSet<RowKey> = base
            .rows
            .values()
            .map(|(step, _)| row_key(step, coarse.frequency))
            .collect();
        for (key, (step, _)) in &coarse.rows {
            if !covered.contains(key) {
                for fine in expand_step(step, coarse.frequency, base.frequency, base.step_hours) {
                    base.rows
                        .entry(row_key(&fine, base.frequency))
                        .or_insert_with(|| (fine, BTreeMap::new()));
                }
            }
        }

        for (step, values) in base.rows.values_mut() {
            if let Some((_, coarse_values)) = coarse.rows.get(&row_key(step, coarse.frequency)) {
                for (variable, value) in coarse_values {
                    values.entry(*variable).or_insert(*value);
                }
            }
        }
    }

    let timestamps: Vec<TimeStep> = base.rows.values().map(|(step, _)| *step).collect();
    let mut table = SiteTable::new(dataset, family, base.frequency, base.step_hours, timestamps);

    let mut present: Vec<MetVariable> = base
        .rows
        .values()
        .flat_map(|(_, values)| values.keys().copied())
        .collect();
    present.sort();
    present.dedup();

    for variable in present {
        let column = base
            .rows
            .values()
            .map(|(_, values)| values.get(&variable).copied().filter(|v| v.is_finite()))
            .collect();
        table.insert_column(variable, column)?;
    }

    if !table.has_values(MetVariable::Wind) {
        derived::add_wind_speed(&mut table)?;
    }

    for &required in family.output_columns() {
        if !table.has_values(required) {
            return Err(MetPointError::Assembly {
                dataset: dataset.to_string(),
                reason: format!("required variable '{required}' is entirely absent"),
            });
        }
    }

    info!(
        dataset,
        rows = table.len(),
        frequency = %table.frequency,
        "assembled site table"
    );
    Ok(table)
}
