//! Nearest-cell lookup on gridded archives
//!
//! A grid is described only by its cell edges (`lat_bnds` / `lon_bnds`). The
//! target point must fall inside exactly one cell per axis; anything else is
//! reported instead of silently picking a neighbour.

use crate::errors::{GridAxis, MetPointError, Result};

/// Lower/upper edge of one grid cell along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub lower: f64,
    pub upper: f64,
}

impl CellBounds {
    /// Edges may be stored in either order; they are normalized here.
    /// Equal edges make a zero-width cell containing only that value.
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            lower: a.min(b),
            upper: a.max(b),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Index of the located cell in the file's (lat, lon) axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridIndex {
    pub lat: usize,
    pub lon: usize,
}

/// Translate a query longitude into the grid's convention.
///
/// A grid whose largest edge exceeds 180 is taken to be 0..360, otherwise
/// -180..180.
pub fn normalize_longitude(lon: f64, lon_bounds: &[CellBounds]) -> f64 {
    let grid_max = lon_bounds
        .iter()
        .map(|b| b.upper)
        .fold(f64::NEG_INFINITY, f64::max);

    if grid_max > 180.0 {
        if lon < 0.0 {
            lon + 360.0
        } else {
            lon
        }
    } else if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Locate the grid cell containing (lat, lon)
pub fn locate(
    lat: f64,
    lon: f64,
    lat_bounds: &[CellBounds],
    lon_bounds: &[CellBounds],
) -> Result<GridIndex> {
    let lat_index = unique_cell(GridAxis::Latitude, lat, lat_bounds)?;

    let query = normalize_longitude(lon, lon_bounds);
    let lon_index = match unique_cell(GridAxis::Longitude, query, lon_bounds) {
        Ok(index) => index,
        // Cells straddling the seam (e.g. -0.5..0.5 in a 0..360 grid)
        Err(MetPointError::GridLookup { matches: 0, .. }) => {
            let wrapped = if query >= 180.0 {
                query - 360.0
            } else {
                query + 360.0
            };
            unique_cell(GridAxis::Longitude, wrapped, lon_bounds).map_err(|_| {
                MetPointError::GridLookup {
                    axis: GridAxis::Longitude,
                    value: lon,
                    matches: 0,
                }
            })?
        }
        Err(e) => return Err(e),
    };

    Ok(GridIndex {
        lat: lat_index,
        lon: lon_index,
    })
}

fn unique_cell(axis: GridAxis, value: f64, bounds: &[CellBounds]) -> Result<usize> {
    let mut hits = bounds
        .iter()
        .enumerate()
        .filter(|(_, b)| b.contains(value))
        .map(|(i, _)| i);

    match (hits.next(), hits.count()) {
        (Some(index), 0) => Ok(index),
        (first, rest) => Err(MetPointError::GridLookup {
            axis,
            value,
            matches: usize::from(first.is_some()) + rest,
        }),
    }
}
