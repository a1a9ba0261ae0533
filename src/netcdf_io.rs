//! NetCDF access: grid bounds, time axes and single-cell variable series
//!
//! Every source file is opened through [`with_source_file`], which closes the
//! handle on every exit path before the next file is touched.

use crate::calendar::{Calendar, HOURS_PER_DAY, SECONDS_PER_DAY};
use crate::errors::{MetPointError, Result};
use crate::grid::{self, CellBounds, GridIndex};
use crate::table::VariableSeries;
use crate::timestamps::{self, coordinate, DateToken, TimeStep, TimeUnits};
use crate::variables::{DatasetFamily, Frequency, MetVariable};
use ndarray::{ArrayD, Ix2};
use netcdf::{AttributeValue, File, Variable};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

const TIME_NAMES: [&str; 2] = ["time", "t"];
const LAT_NAMES: [&str; 4] = ["lat", "latitude", "y", "rlat"];
const LON_NAMES: [&str; 4] = ["lon", "longitude", "x", "rlon"];

/// Magnitudes above this are treated as unflagged fill values
const FILL_THRESHOLD: f64 = 1.0e30;

/// Where the timestamps of a file come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    /// Start-date token of the file label plus the step count
    #[default]
    Label,
    /// The file's CF `time` coordinate
    Coordinate,
}

/// Reconstructed time axis shared by every variable of one file
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub frequency: Frequency,
    pub step_hours: u32,
    pub steps: Vec<TimeStep>,
}

/// An open source archive
pub struct SourceFile {
    path: PathBuf,
    file: File,
}

/// Open `path`, run `f`, and close the file whether or not `f` succeeded
pub fn with_source_file<T>(path: &Path, f: impl FnOnce(&SourceFile) -> Result<T>) -> Result<T> {
    let source = SourceFile::open(path)?;
    let result = f(&source);
    let closed = source.close();
    let value = result?;
    closed?;
    Ok(value)
}

impl SourceFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)?;
        debug!(file = %path.display(), "opened source file");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used for date-token parsing
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn variable(&self, name: &str) -> Result<Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| MetPointError::VariableNotFound {
                var: name.to_string(),
                file: self.path.clone(),
            })
    }

    fn first_variable(&self, names: &[&str]) -> Option<Variable<'_>> {
        names.iter().find_map(|name| self.file.variable(name))
    }

    /// Latitude and longitude cell edges of the grid
    pub fn grid_bounds(&self) -> Result<(Vec<CellBounds>, Vec<CellBounds>)> {
        Ok((
            self.axis_bounds(&["lat_bnds", "lat_bounds"], &LAT_NAMES)?,
            self.axis_bounds(&["lon_bnds", "lon_bounds"], &LON_NAMES)?,
        ))
    }

    fn axis_bounds(&self, bounds_names: &[&str], centre_names: &[&str]) -> Result<Vec<CellBounds>> {
        if let Some(var) = self.first_variable(bounds_names) {
            let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();
            let data = ArrayD::from_shape_vec(shape, var.get_values::<f64, _>(..)?)?
                .into_dimensionality::<Ix2>()?;

            // CF stores (n, 2); some archives store the transposed (2, n)
            let rows = if data.ncols() == 2 {
                data
            } else if data.nrows() == 2 {
                data.reversed_axes()
            } else {
                return Err(MetPointError::DimensionNotFound {
                    var: var.name(),
                    dim: "bnds (length 2)".to_string(),
                });
            };
            return Ok(rows
                .outer_iter()
                .map(|edge| CellBounds::new(edge[0], edge[1]))
                .collect());
        }

        let centres = self.first_variable(centre_names).ok_or_else(|| {
            MetPointError::VariableNotFound {
                var: bounds_names[0].to_string(),
                file: self.path.clone(),
            }
        })?;
        let values = centres.get_values::<f64, _>(..)?;
        if values.len() == 1 {
            return Err(MetPointError::DimensionNotFound {
                var: centres.name(),
                dim: format!(
                    "{} (cell edges cannot be inferred from a single centre)",
                    bounds_names[0]
                ),
            });
        }
        Ok(bounds_from_centres(&values))
    }

    /// Locate the cell containing the site in this file's grid
    pub fn locate(&self, lat: f64, lon: f64) -> Result<GridIndex> {
        let (lat_bounds, lon_bounds) = self.grid_bounds()?;
        grid::locate(lat, lon, &lat_bounds, &lon_bounds)
    }

    /// Number of time steps in the file
    pub fn time_len(&self) -> Result<usize> {
        TIME_NAMES
            .iter()
            .find_map(|name| self.file.dimension(name))
            .map(|d| d.len())
            .ok_or_else(|| MetPointError::DimensionNotFound {
                var: self.label(),
                dim: "time".to_string(),
            })
    }

    /// Calendar of the time coordinate, Gregorian when unstated
    pub fn calendar(&self) -> Result<Calendar> {
        let Some(time) = self.first_variable(&TIME_NAMES) else {
            return Ok(Calendar::Gregorian);
        };
        match string_attribute(&time, "calendar")? {
            Some(name) => Calendar::from_cf(&name),
            None => Ok(Calendar::Gregorian),
        }
    }

    /// Raw time coordinate values and their units
    pub fn time_coordinate(&self) -> Result<(Vec<f64>, TimeUnits)> {
        let time = self.first_variable(&TIME_NAMES).ok_or_else(|| {
            MetPointError::VariableNotFound {
                var: "time".to_string(),
                file: self.path.clone(),
            }
        })?;
        let units = string_attribute(&time, "units")?.ok_or_else(|| {
            MetPointError::timestamp(self.label(), "time coordinate has no 'units' attribute")
        })?;
        Ok((time.get_values::<f64, _>(..)?, TimeUnits::parse(&units)?))
    }

    /// Build the time axis of this file
    pub fn time_axis(
        &self,
        family: DatasetFamily,
        frequency: Option<Frequency>,
        source: TimeSource,
    ) -> Result<TimeAxis> {
        let label = self.label();
        let calendar = self.calendar()?;

        match source {
            TimeSource::Label => {
                let token = DateToken::parse_for(family, &label)?;
                let frequency = frequency.unwrap_or_else(|| token.implied_frequency(family));
                let n_steps = self.time_len()?;
                let steps = timestamps::reconstruct_from_token(
                    &label, &token, n_steps, frequency, calendar,
                )?;
                let step_hours = match frequency {
                    Frequency::Hourly => timestamps::sub_daily_step_hours(&label, &token, n_steps)?,
                    _ => HOURS_PER_DAY,
                };
                Ok(TimeAxis {
                    frequency,
                    step_hours,
                    steps,
                })
            }
            TimeSource::Coordinate => {
                let (values, units) = self.time_coordinate()?;
                let frequency = frequency
                    .or_else(|| {
                        DateToken::parse_for(family, &label)
                            .ok()
                            .map(|t| t.implied_frequency(family))
                    })
                    .unwrap_or_else(|| frequency_from_spacing(&values, &units));
                let steps =
                    coordinate::decode_time_axis(&label, &values, &units, frequency, calendar)?;
                let step_hours = match frequency {
                    Frequency::Hourly => coordinate::infer_step_hours(&label, &values, &units)?,
                    _ => HOURS_PER_DAY,
                };
                Ok(TimeAxis {
                    frequency,
                    step_hours,
                    steps,
                })
            }
        }
    }

    /// Full time series of `var_name` at one grid cell, in file step order.
    ///
    /// Fill values become NaN; `scale_factor` / `add_offset` are applied.
    pub fn read_point(&self, var_name: &str, index: GridIndex) -> Result<Vec<f64>> {
        let var = self.variable(var_name)?;

        let mut has_time = false;
        let mut extents: Vec<Range<usize>> = Vec::new();
        for dim in var.dimensions() {
            let name = dim.name();
            let len = dim.len();
            let range = if TIME_NAMES.contains(&name.as_str()) {
                has_time = true;
                0..len
            } else if LAT_NAMES.contains(&name.as_str()) {
                checked_index(var_name, &name, index.lat, len)?
            } else if LON_NAMES.contains(&name.as_str()) {
                checked_index(var_name, &name, index.lon, len)?
            } else if len == 1 {
                0..1
            } else {
                return Err(MetPointError::DimensionNotFound {
                    var: var_name.to_string(),
                    dim: format!("{name} (unexpected non-singleton dimension)"),
                });
            };
            extents.push(range);
        }
        if !has_time {
            return Err(MetPointError::DimensionNotFound {
                var: var_name.to_string(),
                dim: "time".to_string(),
            });
        }

        let raw: Vec<f64> = match extents.len() {
            1 => var.get_values::<f64, _>(extents[0].clone())?,
            2 => var.get_values::<f64, _>((extents[0].clone(), extents[1].clone()))?,
            3 => var.get_values::<f64, _>((
                extents[0].clone(),
                extents[1].clone(),
                extents[2].clone(),
            ))?,
            4 => var.get_values::<f64, _>((
                extents[0].clone(),
                extents[1].clone(),
                extents[2].clone(),
                extents[3].clone(),
            ))?,
            n => {
                return Err(MetPointError::DimensionNotFound {
                    var: var_name.to_string(),
                    dim: format!("{n} dimensions (at most 4 supported)"),
                })
            }
        };

        let fill = numeric_attribute(&var, "_FillValue")?
            .or(numeric_attribute(&var, "missing_value")?);
        let scale = numeric_attribute(&var, "scale_factor")?.unwrap_or(1.0);
        let offset = numeric_attribute(&var, "add_offset")?.unwrap_or(0.0);

        Ok(raw
            .into_iter()
            .map(|v| {
                if fill.is_some_and(|f| v == f) || !v.is_finite() || v.abs() > FILL_THRESHOLD {
                    f64::NAN
                } else {
                    v * scale + offset
                }
            })
            .collect())
    }
}

/// Read one variable at the located cell and pair it with the file's time axis
pub fn extract(
    file: &SourceFile,
    axis: &TimeAxis,
    variable: MetVariable,
    source_name: &str,
    index: GridIndex,
) -> Result<VariableSeries> {
    let values = file.read_point(source_name, index)?;
    debug!(
        file = %file.path().display(),
        variable = source_name,
        steps = values.len(),
        "extracted point series"
    );
    VariableSeries::new(
        variable,
        axis.frequency,
        axis.step_hours,
        file.path().to_path_buf(),
        axis.steps.clone(),
        values,
    )
    .map_err(|e| match e {
        MetPointError::LengthMismatch {
            file,
            values,
            timestamps,
            ..
        } => MetPointError::LengthMismatch {
            file,
            variable: source_name.to_string(),
            values,
            timestamps,
        },
        other => other,
    })
}

fn checked_index(var: &str, dim: &str, index: usize, len: usize) -> Result<Range<usize>> {
    if index < len {
        Ok(index..index + 1)
    } else {
        Err(MetPointError::DimensionNotFound {
            var: var.to_string(),
            dim: format!("{dim}[{index}] (length {len})"),
        })
    }
}

/// Cell edges halfway between centres, outer edges mirrored.
///
/// A lone centre yields a zero-width cell that only contains the centre itself.
pub fn bounds_from_centres(centres: &[f64]) -> Vec<CellBounds> {
    match centres {
        [] => Vec::new(),
        [only] => vec![CellBounds::new(*only, *only)],
        _ => {
            let n = centres.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centres[0] - (centres[1] - centres[0]) / 2.0);
            edges.extend(centres.windows(2).map(|w| (w[0] + w[1]) / 2.0));
            edges.push(centres[n - 1] + (centres[n - 1] - centres[n - 2]) / 2.0);
            edges.windows(2).map(|w| CellBounds::new(w[0], w[1])).collect()
        }
    }
}

fn frequency_from_spacing(values: &[f64], units: &TimeUnits) -> Frequency {
    let spacing_days = match values {
        [first, second, ..] => (second - first) * units.seconds_per_unit / SECONDS_PER_DAY,
        _ => 1.0,
    };
    if spacing_days < 0.99 {
        Frequency::Hourly
    } else if spacing_days < 27.0 {
        Frequency::Daily
    } else {
        Frequency::Monthly
    }
}

fn numeric_attribute(var: &Variable, name: &str) -> Result<Option<f64>> {
    let Some(attr) = var.attribute(name) else {
        return Ok(None);
    };
    Ok(match attr.value()? {
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Floats(vs) => vs.first().map(|v| f64::from(*v)),
        AttributeValue::Doubles(vs) => vs.first().copied(),
        _ => None,
    })
}

fn string_attribute(var: &Variable, name: &str) -> Result<Option<String>> {
    let Some(attr) = var.attribute(name) else {
        return Ok(None);
    };
    Ok(match attr.value()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    })
}
