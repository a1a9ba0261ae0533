//! Centralized error handling for met_point
//!
//! Every stage of the extraction pipeline reports through [`MetPointError`] so a
//! batch run can tell exactly which site, dataset, file and variable failed.

use std::path::PathBuf;
use thiserror::Error;

/// Grid axis named in lookup failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    Latitude,
    Longitude,
}

impl std::fmt::Display for GridAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridAxis::Latitude => write!(f, "latitude"),
            GridAxis::Longitude => write!(f, "longitude"),
        }
    }
}

/// Main error type for met_point operations
#[derive(Debug, Error)]
pub enum MetPointError {
    /// The target point did not resolve to exactly one grid cell
    #[error("grid lookup failed: {axis} {value} matched {matches} cells (expected exactly 1)")]
    GridLookup {
        axis: GridAxis,
        value: f64,
        matches: usize,
    },

    /// Unparseable or inconsistent file-label date
    #[error("timestamp error for '{label}': {reason}")]
    Timestamp { label: String, reason: String },

    /// Variable series length disagrees with the reconstructed timestamps
    #[error(
        "length mismatch in {file:?} for '{variable}': {values} values but {timestamps} timestamps"
    )]
    LengthMismatch {
        file: PathBuf,
        variable: String,
        values: usize,
        timestamps: usize,
    },

    /// Dataset could not be assembled into a site table
    #[error("assembly error for dataset '{dataset}': {reason}")]
    Assembly { dataset: String, reason: String },

    /// Aggregation input is not one full calendar year
    #[error("irregular year: got {rows} rows, expected {expected}")]
    IrregularYear { rows: usize, expected: String },

    /// Variable not found in NetCDF file
    #[error("variable '{var}' not found in {file:?}")]
    VariableNotFound { var: String, file: PathBuf },

    /// Dimension not found in variable
    #[error("dimension '{dim}' not found in variable '{var}'")]
    DimensionNotFound { var: String, dim: String },

    /// Invalid run configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Thread pool configuration error
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array shape or dimension error
    #[error("array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Any of the above, tagged with the site and dataset being processed
    #[error("site '{site}', dataset '{dataset}': {source}")]
    Context {
        site: String,
        dataset: String,
        #[source]
        source: Box<MetPointError>,
    },
}

impl MetPointError {
    /// Convenience constructor for [`MetPointError::Timestamp`]
    pub fn timestamp(label: impl Into<String>, reason: impl Into<String>) -> Self {
        MetPointError::Timestamp {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error with the site and dataset it occurred in
    pub fn with_context(self, site: &str, dataset: &str) -> Self {
        MetPointError::Context {
            site: site.to_string(),
            dataset: dataset.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any `Context` wrappers
    pub fn root(&self) -> &MetPointError {
        match self {
            MetPointError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for met_point operations
pub type Result<T> = std::result::Result<T, MetPointError>;
