//! met_point: point extraction and aggregation of gridded meteorological archives
//!
//! Reads reanalysis and climate-model archives stored as NetCDF, pulls the time
//! series of the grid cell containing a site, and produces per-site tables at
//! sub-daily, daily and monthly resolution.
//!
//! ## Module Organization
//!
//! - [`grid`]: locating the cell that contains a point
//! - [`timestamps`]: calendar-correct time axes from file labels or CF time coordinates
//! - [`netcdf_io`]: reading point series out of source files
//! - [`assembly`]: merging series of all files and variables into a [`table::SiteTable`]
//! - [`aggregation`]: daily and monthly summaries
//! - [`derived`]: wind speed, temperature departures and the training table
//! - [`calendar`]: leap years and month boundaries shared by all of the above
//! - [`output`], [`config`], [`pipeline`], [`parallel`]: batch runs
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use met_point::prelude::*;
//!
//! fn first_year_months(hourly: &SiteTable) -> Result<Vec<MonthlySummary>> {
//!     let mut daily = daily_from_hourly(hourly)?;
//!     apply_departures(&mut daily);
//!     monthly_from_daily(&daily)
//! }
//! ```

pub mod aggregation;
pub mod assembly;
pub mod calendar;
pub mod config;
pub mod derived;
pub mod errors;
pub mod grid;
pub mod netcdf_io;
pub mod output;
pub mod parallel;
pub mod pipeline;
pub mod table;
pub mod timestamps;
pub mod variables;

pub use errors::{MetPointError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::aggregation::{
        daily_from_hourly, daily_from_model_table, monthly_from_daily, DailySummary,
        MonthlySummary,
    };
    pub use crate::assembly::assemble;
    pub use crate::derived::{add_wind_speed, apply_departures, training_table, wind_speed};
    pub use crate::errors::{MetPointError, Result};
    pub use crate::grid::{locate, CellBounds, GridIndex};
    pub use crate::parallel::ParallelConfig;
    pub use crate::table::{SiteTable, VariableSeries};
    pub use crate::timestamps::{reconstruct, TimeStep};
    pub use crate::variables::{DatasetFamily, Frequency, MetVariable};
}
