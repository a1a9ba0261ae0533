//! Daily and monthly aggregation, reducers and derived quantities

mod common;

use common::{hourly_steps, hourly_table, reanalysis_value};
use met_point::aggregation::reducers::reduce_slice;
use met_point::aggregation::{
    daily_from_hourly, daily_from_model_table, monthly_from_daily, StatOperation,
    StatisticalReduction,
};
use met_point::calendar;
use met_point::derived::{add_wind_speed, apply_departures, training_table, wind_speed};
use met_point::errors::{MetPointError, Result};
use met_point::table::SiteTable;
use met_point::timestamps::TimeStep;
use met_point::variables::{DatasetFamily, Frequency, MetVariable};
use ndarray::Array2;
use std::f64::consts::PI;

fn plain(variable: MetVariable, _row: usize, step: &TimeStep) -> Option<f64> {
    Some(reanalysis_value(variable, step.hour.unwrap_or(0), step.doy))
}

#[test]
fn test_reducers_skip_missing_values() -> Result<()> {
    let values = [1.0, f64::NAN, 3.0, f64::INFINITY, -2.0, 0.0];
    assert_eq!(reduce_slice(&values, StatOperation::Mean), 0.5);
    assert_eq!(reduce_slice(&values, StatOperation::Sum), 2.0);
    assert_eq!(reduce_slice(&values, StatOperation::Min), -2.0);
    assert_eq!(reduce_slice(&values, StatOperation::Max), 3.0);
    assert_eq!(reduce_slice(&values, StatOperation::CountPositive), 2.0);
    assert!(reduce_slice(&[f64::NAN, f64::NAN], StatOperation::Mean).is_nan());
    assert!(reduce_slice(&[], StatOperation::Sum).is_nan());

    let matrix = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0])?;
    let means = matrix.reduce_along_axis(1, StatOperation::Mean)?;
    assert_eq!(means.to_vec(), vec![2.0, 5.0]);
    let maxima = matrix.reduce_along_axis(0, StatOperation::Max)?;
    assert_eq!(maxima.to_vec(), vec![4.0, 2.0, 6.0]);
    assert!(matrix.reduce_along_axis(2, StatOperation::Mean).is_err());
    Ok(())
}

#[test]
fn test_no_sunlit_hours_without_shortwave() -> Result<()> {
    let table = hourly_table(2001, |variable, row, step| match variable {
        MetVariable::Swdown => Some(0.0),
        _ => plain(variable, row, step),
    })?;
    let daily = daily_from_hourly(&table)?;

    assert_eq!(daily.len(), 365);
    assert!(daily.iter().all(|d| d.hrs_sun == 0.0));
    Ok(())
}

#[test]
fn test_twelve_sunlit_hours() -> Result<()> {
    let table = hourly_table(2001, |variable, row, step| match variable {
        MetVariable::Swdown => Some(if step.hour.unwrap_or(0) % 2 == 0 { 250.0 } else { 0.0 }),
        _ => plain(variable, row, step),
    })?;
    let daily = daily_from_hourly(&table)?;

    assert!(daily.iter().all(|d| d.hrs_sun == 12.0));
    assert!(daily.iter().all(|d| (d.swdown - 125.0).abs() < 1e-12));
    Ok(())
}

#[test]
fn test_daily_reducer_columns() -> Result<()> {
    let table = hourly_table(2001, plain)?;
    let daily = daily_from_hourly(&table)?;

    let jan_1 = &daily[0];
    assert_eq!((jan_1.year, jan_1.doy, jan_1.month, jan_1.day), (2001, 1, 1, 1));
    assert!((jan_1.tair_min - 270.05).abs() < 1e-9);
    assert!((jan_1.tair_max - (270.05 + 11.5)).abs() < 1e-9);
    assert!((jan_1.tair_mean - (270.05 + 5.75)).abs() < 1e-9);
    // One hour at 1e-4 kg m-2 s-1
    assert!((jan_1.precip_tot - 0.36).abs() < 1e-12);
    assert_eq!(jan_1.hrs_sun, 12.0);
    assert_eq!(jan_1.lwdown, 300.0);
    assert_eq!(jan_1.press, 101_325.0);
    assert_eq!(jan_1.wind, 3.0);
    assert_eq!(jan_1.max_departure, None);

    let dec_31 = &daily[364];
    assert_eq!((dec_31.doy, dec_31.month, dec_31.day), (365, 12, 31));
    Ok(())
}

#[test]
fn test_precipitation_total_round_trip() -> Result<()> {
    let table = hourly_table(2004, |variable, row, step| match variable {
        MetVariable::Precipf => Some(1.0e-5 * ((row % 7) as f64)),
        _ => plain(variable, row, step),
    })?;
    let daily = daily_from_hourly(&table)?;
    assert_eq!(daily.len(), 366);

    let from_daily: f64 = daily.iter().map(|d| d.precip_tot).sum();
    let from_hourly: f64 = table
        .column_or_nan(MetVariable::Precipf)
        .unwrap_or_default()
        .iter()
        .map(|rate| rate * 3600.0)
        .sum();
    assert!((from_daily - from_hourly).abs() <= 1e-9 * from_hourly.abs());
    Ok(())
}

#[test]
fn test_missing_hours_are_skipped_not_zeroed() -> Result<()> {
    let table = hourly_table(2001, |variable, row, step| match (variable, step.hour) {
        (MetVariable::Tair, Some(0)) => None,
        _ => plain(variable, row, step),
    })?;
    let daily = daily_from_hourly(&table)?;
    assert!((daily[0].tair_min - (270.05 + 0.5)).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_daily_requires_a_full_year() -> Result<()> {
    let table = hourly_table(2001, plain)?;
    let short = table.slice_rows(0..8759);
    match daily_from_hourly(&short) {
        Err(MetPointError::IrregularYear { rows, .. }) => assert_eq!(rows, 8759),
        other => panic!("Expected IrregularYear error, got {other:?}"),
    }

    let half = table.slice_rows(0..24 * 180);
    assert!(matches!(
        daily_from_hourly(&half),
        Err(MetPointError::IrregularYear { .. })
    ));
    Ok(())
}

#[test]
fn test_three_hourly_aggregation() -> Result<()> {
    let steps = met_point::timestamps::reconstruct("GLDAS_2001.nc", 2920, Frequency::Hourly)?;
    let mut table = SiteTable::new(
        "GLDAS",
        DatasetFamily::Reanalysis,
        Frequency::Hourly,
        3,
        steps.clone(),
    );
    let rate: Vec<Option<f64>> = steps.iter().map(|_| Some(1.0e-5)).collect();
    let sw: Vec<Option<f64>> = steps
        .iter()
        .map(|s| Some(if (8..=17).contains(&s.hour.unwrap_or(0)) { 100.0 } else { 0.0 }))
        .collect();
    table.insert_column(MetVariable::Precipf, rate)?;
    table.insert_column(MetVariable::Swdown, sw)?;

    let daily = daily_from_hourly(&table)?;
    assert_eq!(daily.len(), 365);
    // 8 steps of 3 hours at 1e-5 kg m-2 s-1
    assert!((daily[0].precip_tot - 0.864).abs() < 1e-12);
    // Steps ending at hours 8, 11, 14 and 17 are sunlit
    assert_eq!(daily[0].hrs_sun, 12.0);
    Ok(())
}

#[test]
fn test_monthly_partition_in_leap_year() -> Result<()> {
    let daily = daily_from_hourly(&hourly_table(2000, plain)?)?;
    assert_eq!(daily.len(), 366);

    let monthly = monthly_from_daily(&daily)?;
    assert_eq!(monthly.len(), 12);
    assert_eq!(monthly.iter().map(|m| m.n_days).sum::<usize>(), 366);
    assert_eq!(monthly[1].n_days, 29);
    assert_eq!(monthly[2].n_days, 31);
    assert!(monthly.iter().zip(1u32..).all(|(m, month)| m.month == month && m.year == 2000));

    // March starts one day later than in a common year
    let leap_march = calendar::month_row_ranges(366)?[2].start;
    let common_march = calendar::month_row_ranges(365)?[2].start;
    assert_eq!(leap_march, common_march + 1);
    assert_eq!((daily[leap_march].month, daily[leap_march].day), (3, 1));
    Ok(())
}

#[test]
fn test_monthly_requires_a_full_year() -> Result<()> {
    let daily = daily_from_hourly(&hourly_table(2001, plain)?)?;
    match monthly_from_daily(&daily[..300]) {
        Err(MetPointError::IrregularYear { rows, .. }) => assert_eq!(rows, 300),
        other => panic!("Expected IrregularYear error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_monthly_reducers() -> Result<()> {
    let daily = daily_from_hourly(&hourly_table(2001, plain)?)?;
    let monthly = monthly_from_daily(&daily)?;

    let january = &monthly[0];
    assert_eq!(january.n_days, 31);
    // One wet hour per day, summed over the month
    assert!((january.precip_tot - 31.0 * 0.36).abs() < 1e-9);
    // Mean sunlit hours per day, not a monthly total
    assert_eq!(january.hrs_sun, 12.0);
    assert!((january.tair_min - daily[0].tair_min).abs() < 1e-12);
    assert!((january.tair_max - daily[30].tair_max).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_sinusoid_monthly_statistics() -> Result<()> {
    let amplitude = 5.0;
    let diurnal = |hour: u32| amplitude * (2.0 * PI * (f64::from(hour) + 0.5) / 24.0).sin();
    let trend = |doy: u32| 270.0 + 0.1 * f64::from(doy);

    let table = hourly_table(2001, |variable, row, step| match variable {
        MetVariable::Tair => Some(trend(step.doy) + diurnal(step.hour.unwrap_or(0))),
        _ => plain(variable, row, step),
    })?;
    let daily = daily_from_hourly(&table)?;
    let monthly = monthly_from_daily(&daily)?;

    // Peak of the sampled sine is at hours 5 and 6 (82.5 degrees)
    let peak = amplitude * (82.5f64).to_radians().sin();
    let starts = calendar::month_start_doys(false);
    for (m, summary) in monthly.iter().enumerate() {
        let first = starts[m];
        let last = if m == 11 { 365 } else { starts[m + 1] - 1 };
        let mean_doy = f64::from(first + last) / 2.0;

        let expected_mean = 270.0 + 0.1 * mean_doy;
        let expected_min = trend(first) - peak;
        let expected_max = trend(last) + peak;

        let close = |a: f64, b: f64| (a - b).abs() <= 1e-6 * b.abs();
        assert!(close(summary.tair_mean, expected_mean), "month {} mean", m + 1);
        assert!(close(summary.tair_min, expected_min), "month {} min", m + 1);
        assert!(close(summary.tair_max, expected_max), "month {} max", m + 1);
    }
    Ok(())
}

#[test]
fn test_wind_speed_from_components() -> Result<()> {
    let steps: Vec<TimeStep> = (1..=4).map(|d| TimeStep::daily(2001, 1, d, d)).collect();
    let mut table = SiteTable::new(
        "MODEL",
        DatasetFamily::ClimateModel,
        Frequency::Daily,
        24,
        steps,
    );
    table.insert_column(MetVariable::Uas, vec![Some(3.0), Some(-1.5), None, Some(0.0)])?;
    table.insert_column(MetVariable::Vas, vec![Some(4.0), Some(2.0), Some(1.0), None])?;
    add_wind_speed(&mut table)?;

    let wind = table.column(MetVariable::Wind).map(<[_]>::to_vec);
    assert_eq!(wind, Some(vec![Some(5.0), Some(2.5), None, None]));
    for row in 0..2 {
        let (u, v) = (
            table.value(MetVariable::Uas, row).unwrap_or_default(),
            table.value(MetVariable::Vas, row).unwrap_or_default(),
        );
        let w = table.value(MetVariable::Wind, row).unwrap_or_default();
        assert!((w - (u * u + v * v).sqrt()).abs() < 1e-12);
    }
    assert_eq!(wind_speed(-6.0, -8.0), 10.0);
    Ok(())
}

#[test]
fn test_wind_is_not_fabricated_without_components() -> Result<()> {
    let steps: Vec<TimeStep> = (1..=2).map(|d| TimeStep::daily(2001, 1, d, d)).collect();
    let mut table = SiteTable::new("MODEL", DatasetFamily::ClimateModel, Frequency::Daily, 24, steps);
    table.insert_column(MetVariable::Uas, vec![Some(1.0), Some(2.0)])?;
    add_wind_speed(&mut table)?;
    assert!(table.column(MetVariable::Wind).is_none());
    Ok(())
}

#[test]
fn test_temperature_departures() -> Result<()> {
    let mut daily = daily_from_hourly(&hourly_table(2001, plain)?)?;
    daily[1].tair_max = f64::NAN;
    apply_departures(&mut daily);

    let first = &daily[0];
    assert_eq!(first.max_departure, Some(first.tair_max - first.tair_mean));
    assert_eq!(first.min_departure, Some(first.tair_min - first.tair_mean));
    assert!((first.max_departure.unwrap_or_default() - 5.75).abs() < 1e-9);
    assert_eq!(daily[1].max_departure, None);
    assert!(daily[1].min_departure.is_some());
    Ok(())
}

#[test]
fn test_model_table_to_daily_summaries() -> Result<()> {
    let steps: Vec<TimeStep> = (1..=3).map(|d| TimeStep::daily(2001, 1, d, d)).collect();
    let mut table = SiteTable::new("MODEL", DatasetFamily::ClimateModel, Frequency::Daily, 24, steps);
    table.insert_column(MetVariable::Tmax, vec![Some(290.0), Some(292.0), None])?;
    table.insert_column(MetVariable::Tmin, vec![Some(280.0), Some(281.0), Some(279.0)])?;
    table.insert_column(MetVariable::Precipf, vec![Some(1.0e-5), Some(0.0), Some(2.0e-5)])?;
    table.insert_column(MetVariable::Press, vec![Some(101_000.0); 3])?;

    let daily = daily_from_model_table(&table)?;
    assert_eq!(daily.len(), 3);
    assert_eq!(daily[0].tair_mean, 285.0);
    assert_eq!(daily[0].tair_max, 290.0);
    assert_eq!(daily[1].tair_min, 281.0);
    assert!((daily[0].precip_tot - 0.864).abs() < 1e-12);
    assert!(daily[0].hrs_sun.is_nan());
    assert!(daily[2].tair_mean.is_nan());
    assert_eq!(daily[2].press, 101_000.0);

    let hourly = hourly_table(2001, plain)?;
    assert!(matches!(
        daily_from_model_table(&hourly),
        Err(MetPointError::Assembly { .. })
    ));
    Ok(())
}

#[test]
fn test_training_table_lags_and_previews() -> Result<()> {
    let table = hourly_table(2001, plain)?;
    let training = training_table(&table);
    assert_eq!(training.len(), 8760);

    let tair = training
        .column(MetVariable::Tair)
        .ok_or_else(|| MetPointError::Config("no tair column".to_string()))?;
    assert_eq!(tair.lag[0], None);
    assert_eq!(tair.lag[1], tair.value[0]);

    let day_1_mean = 270.05 + 5.75;
    let day_2_mean = 270.10 + 5.75;
    assert!((tair.daily_mean[0].unwrap_or_default() - day_1_mean).abs() < 1e-9);
    assert!((tair.daily_mean[23].unwrap_or_default() - day_1_mean).abs() < 1e-9);
    assert!((tair.next_day_mean[0].unwrap_or_default() - day_2_mean).abs() < 1e-9);
    assert_eq!(tair.next_day_mean[8759], None);
    Ok(())
}

#[test]
fn test_training_table_breaks_at_missing_years() -> Result<()> {
    // 2001 followed directly by 2003
    let mut steps = hourly_steps(2001)?;
    steps.extend(hourly_steps(2003)?);
    let mut table = SiteTable::new(
        "TEST",
        DatasetFamily::Reanalysis,
        Frequency::Hourly,
        1,
        steps.clone(),
    );
    for &variable in DatasetFamily::Reanalysis.output_columns() {
        let column = steps
            .iter()
            .enumerate()
            .map(|(row, step)| plain(variable, row, step))
            .collect();
        table.insert_column(variable, column)?;
    }

    let training = training_table(&table);
    let tair = training
        .column(MetVariable::Tair)
        .ok_or_else(|| MetPointError::Config("no tair column".to_string()))?;

    // Last hour of 2001 has no following day, first hour of 2003 no previous step
    assert_eq!(tair.next_day_mean[8759], None);
    assert_eq!(tair.lag[8760], None);
    assert_eq!(tair.lag[8761], tair.value[8760]);
    // Midnight rollover inside a year keeps its lag
    assert_eq!(tair.lag[24], tair.value[23]);
    assert!(tair.lag[8760..].iter().skip(1).all(Option::is_some));
    Ok(())
}
