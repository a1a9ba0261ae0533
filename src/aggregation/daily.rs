//! Daily summaries from sub-daily or daily site tables

use super::reducers::{StatOperation, StatisticalReduction};
use crate::calendar::{HOURS_PER_DAY, SECONDS_PER_DAY, SECONDS_PER_HOUR};
use crate::errors::{MetPointError, Result};
use crate::table::SiteTable;
use crate::variables::{Frequency, MetVariable};
use ndarray::Array2;

/// One calendar day of reduced meteorology
///
/// Undefined statistics are NaN. Departures stay `None` until
/// [`crate::derived::apply_departures`] has run.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub dataset: String,
    pub year: i32,
    pub doy: u32,
    pub month: u32,
    pub day: u32,
    pub tair_mean: f64,
    pub tair_min: f64,
    pub tair_max: f64,
    /// Accumulated precipitation, kg m-2 (mm)
    pub precip_tot: f64,
    pub swdown: f64,
    /// Hours with strictly positive shortwave radiation
    pub hrs_sun: f64,
    pub lwdown: f64,
    pub press: f64,
    pub qair: f64,
    pub wind: f64,
    pub max_departure: Option<f64>,
    pub min_departure: Option<f64>,
}

/// Reduce one year of sub-daily rows to one summary per day.
///
/// The table must hold exactly `days_in_year × steps_per_day` rows, in order,
/// with every consecutive block of `steps_per_day` rows on the same day.
/// Precipitation rates (kg m-2 s-1) are accumulated over each step's length.
pub fn daily_from_hourly(table: &SiteTable) -> Result<Vec<DailySummary>> {
    let step_hours = table.step_hours;
    if table.frequency != Frequency::Hourly || step_hours == 0 || HOURS_PER_DAY % step_hours != 0 {
        return Err(MetPointError::IrregularYear {
            rows: table.len(),
            expected: format!(
                "a sub-daily table, got {} data with a {step_hours} h step",
                table.frequency
            ),
        });
    }
    let per_day = (HOURS_PER_DAY / step_hours) as usize;
    let expected = || format!("365×{per_day} or 366×{per_day}");

    let Some(first) = table.timestamps.first() else {
        return Err(MetPointError::IrregularYear {
            rows: 0,
            expected: expected(),
        });
    };
    let n_days = table.len() / per_day;
    if table.len() % per_day != 0 || !(n_days == 365 || n_days == 366) {
        return Err(MetPointError::IrregularYear {
            rows: table.len(),
            expected: format!("{} for year {}", expected(), first.year),
        });
    }

    for chunk in table.timestamps.chunks(per_day) {
        let (head, tail) = (chunk[0], chunk[per_day - 1]);
        if head.daily_key() != tail.daily_key() {
            return Err(MetPointError::IrregularYear {
                rows: table.len(),
                expected: format!(
                    "{per_day} consecutive steps per day, but year {} day {} spills into day {}",
                    head.year, head.doy, tail.doy
                ),
            });
        }
    }

    // Days × steps matrix of one variable; all-NaN when the column is absent
    let matrix = |variable: MetVariable| -> Result<Array2<f64>> {
        let values = table
            .column_or_nan(variable)
            .unwrap_or_else(|| vec![f64::NAN; table.len()]);
        Ok(Array2::from_shape_vec((n_days, per_day), values)?)
    };
    let reduce = |variable: MetVariable, operation: StatOperation| -> Result<Vec<f64>> {
        Ok(matrix(variable)?.reduce_along_axis(1, operation)?.to_vec())
    };

    let seconds_per_step = f64::from(step_hours) * SECONDS_PER_HOUR;
    let tair_mean = reduce(MetVariable::Tair, StatOperation::Mean)?;
    let tair_min = reduce(MetVariable::Tair, StatOperation::Min)?;
    let tair_max = reduce(MetVariable::Tair, StatOperation::Max)?;
    let precip_tot = reduce(MetVariable::Precipf, StatOperation::Sum)?;
    let swdown = reduce(MetVariable::Swdown, StatOperation::Mean)?;
    let sunlit_steps = reduce(MetVariable::Swdown, StatOperation::CountPositive)?;
    let lwdown = reduce(MetVariable::Lwdown, StatOperation::Mean)?;
    let press = reduce(MetVariable::Press, StatOperation::Mean)?;
    let qair = reduce(MetVariable::Qair, StatOperation::Mean)?;
    let wind = reduce(MetVariable::Wind, StatOperation::Mean)?;

    let summaries = table
        .timestamps
        .chunks(per_day)
        .enumerate()
        .map(|(d, chunk)| DailySummary {
            dataset: table.dataset.clone(),
            year: chunk[0].year,
            doy: chunk[0].doy,
            month: chunk[0].month,
            day: chunk[0].day,
            tair_mean: tair_mean[d],
            tair_min: tair_min[d],
            tair_max: tair_max[d],
            precip_tot: precip_tot[d] * seconds_per_step,
            swdown: swdown[d],
            hrs_sun: sunlit_steps[d] * f64::from(step_hours),
            lwdown: lwdown[d],
            press: press[d],
            qair: qair[d],
            wind: wind[d],
            max_departure: None,
            min_departure: None,
        })
        .collect();
    Ok(summaries)
}

/// Daily summaries straight from a daily climate-model table.
///
/// Model output carries daily maximum and minimum temperature only; the daily
/// mean is their midpoint. Sunlit hours cannot be recovered and stay NaN.
pub fn daily_from_model_table(table: &SiteTable) -> Result<Vec<DailySummary>> {
    if table.frequency != Frequency::Daily {
        return Err(MetPointError::Assembly {
            dataset: table.dataset.clone(),
            reason: format!(
                "daily summaries need a daily table, got {} rows",
                table.frequency
            ),
        });
    }

    let get = |variable: MetVariable, row: usize| table.value(variable, row).unwrap_or(f64::NAN);
    let summaries = table
        .timestamps
        .iter()
        .enumerate()
        .map(|(row, step)| {
            let tmax = get(MetVariable::Tmax, row);
            let tmin = get(MetVariable::Tmin, row);
            DailySummary {
                dataset: table.dataset.clone(),
                year: step.year,
                doy: step.doy,
                month: step.month,
                day: step.day,
                tair_mean: (tmax + tmin) / 2.0,
                tair_min: tmin,
                tair_max: tmax,
                precip_tot: get(MetVariable::Precipf, row) * SECONDS_PER_DAY,
                swdown: get(MetVariable::Swdown, row),
                hrs_sun: f64::NAN,
                lwdown: get(MetVariable::Lwdown, row),
                press: get(MetVariable::Press, row),
                qair: get(MetVariable::Qair, row),
                wind: get(MetVariable::Wind, row),
                max_departure: None,
                min_departure: None,
            }
        })
        .collect();
    Ok(summaries)
}
