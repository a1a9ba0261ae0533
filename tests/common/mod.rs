//! Shared fixtures: small synthetic archives and in-memory site tables
#![allow(dead_code)]

use met_point::errors::Result;
use met_point::table::SiteTable;
use met_point::timestamps::{reconstruct, TimeStep};
use met_point::variables::{DatasetFamily, Frequency, MetVariable};
use ndarray::{Array2, Array3};
use netcdf::create;
use std::path::Path;

/// Site inside cell (lat 1, lon 0) of the fixture grid
pub const SITE_LAT: f64 = 47.0;
pub const SITE_LON: f64 = -72.0;

/// Offset added to every cell other than the site's
pub const OTHER_CELL_OFFSET: f64 = 500.0;

pub const FILL: f64 = -9999.0;

/// Optional CF time coordinate of a fixture archive
pub struct TimeCoordinate<'a> {
    pub values: &'a [f64],
    pub units: &'a str,
    pub calendar: Option<&'a str>,
}

/// Write a 2x2 archive whose site cell holds `series`; NaN values are written as fill
pub fn write_archive(
    path: &Path,
    n_steps: usize,
    time: Option<TimeCoordinate>,
    variables: &[(&str, &[f64])],
) -> Result<()> {
    write_archive_on_grid(path, n_steps, time, variables, [-75.0, -70.0, -65.0])
}

/// Same as [`write_archive`] with custom longitude edges
pub fn write_archive_on_grid(
    path: &Path,
    n_steps: usize,
    time: Option<TimeCoordinate>,
    variables: &[(&str, &[f64])],
    lon_edges: [f64; 3],
) -> Result<()> {
    let mut file = create(path)?;

    file.add_dimension("time", n_steps)?;
    file.add_dimension("lat", 2)?;
    file.add_dimension("lon", 2)?;
    file.add_dimension("bnds", 2)?;

    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_values(&[42.5, 47.5], ..)?;
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_values(
            &[
                (lon_edges[0] + lon_edges[1]) / 2.0,
                (lon_edges[1] + lon_edges[2]) / 2.0,
            ],
            ..,
        )?;
    }
    {
        let lat_bnds = Array2::from_shape_vec((2, 2), vec![40.0, 45.0, 45.0, 50.0])?;
        let mut var = file.add_variable::<f64>("lat_bnds", &["lat", "bnds"])?;
        var.put(lat_bnds.view(), ..)?;
    }
    {
        let lon_bnds = Array2::from_shape_vec(
            (2, 2),
            vec![lon_edges[0], lon_edges[1], lon_edges[1], lon_edges[2]],
        )?;
        let mut var = file.add_variable::<f64>("lon_bnds", &["lon", "bnds"])?;
        var.put(lon_bnds.view(), ..)?;
    }

    if let Some(time) = time {
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        var.put_attribute("units", time.units)?;
        if let Some(calendar) = time.calendar {
            var.put_attribute("calendar", calendar)?;
        }
        var.put_values(time.values, ..)?;
    }

    for (name, series) in variables {
        assert_eq!(series.len(), n_steps, "fixture series length for {name}");
        let mut data = Array3::<f64>::zeros((n_steps, 2, 2));
        for (t, &value) in series.iter().enumerate() {
            for lat in 0..2 {
                for lon in 0..2 {
                    data[[t, lat, lon]] = if value.is_nan() {
                        FILL
                    } else if (lat, lon) == (1, 0) {
                        value
                    } else {
                        value + OTHER_CELL_OFFSET
                    };
                }
            }
        }
        let mut var = file.add_variable::<f64>(name, &["time", "lat", "lon"])?;
        var.put_attribute("_FillValue", FILL)?;
        var.put(data.view(), ..)?;
    }

    Ok(())
}

/// Hourly timestamps of one whole year
pub fn hourly_steps(year: i32) -> Result<Vec<TimeStep>> {
    let n = met_point::calendar::days_in_year(year) as usize * 24;
    reconstruct(&format!("TEST_{year}.nc"), n, Frequency::Hourly)
}

/// One-year hourly reanalysis table, every column filled by `value(variable, row, step)`
pub fn hourly_table(
    year: i32,
    value: impl Fn(MetVariable, usize, &TimeStep) -> Option<f64>,
) -> Result<SiteTable> {
    let steps = hourly_steps(year)?;
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
            .map(|(row, step)| value(variable, row, step))
            .collect();
        table.insert_column(variable, column)?;
    }
    Ok(table)
}

/// Value of every reanalysis variable for a plain, well-behaved fixture
pub fn reanalysis_value(variable: MetVariable, hour: u32, doy: u32) -> f64 {
    match variable {
        MetVariable::Tair => 270.0 + 0.05 * f64::from(doy) + f64::from(hour) * 0.5,
        MetVariable::Precipf => {
            if hour == 12 {
                1.0e-4
            } else {
                0.0
            }
        }
        MetVariable::Swdown => {
            if (6..18).contains(&hour) {
                400.0
            } else {
                0.0
            }
        }
        MetVariable::Lwdown => 300.0,
        MetVariable::Press => 101_325.0,
        MetVariable::Qair => 0.005,
        MetVariable::Wind => 3.0,
        _ => f64::NAN,
    }
}
