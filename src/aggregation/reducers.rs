//! Reducer rules shared by the daily and monthly aggregators
//!
//! Non-finite values are skipped; a reduction with no finite input is NaN.

use crate::errors::{MetPointError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Supported reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Arithmetic mean
    Mean,
    /// Sum of values
    Sum,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Number of strictly positive values
    CountPositive,
}

impl StatOperation {
    /// Get the string representation of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "minimum",
            Self::Max => "maximum",
            Self::CountPositive => "count_positive",
        }
    }
}

/// Reduce one lane of values
pub fn reduce(values: ArrayView1<f64>, operation: StatOperation) -> f64 {
    let (count, sum, min, max, positive) = values.iter().filter(|v| v.is_finite()).fold(
        (0usize, 0.0f64, f64::INFINITY, f64::NEG_INFINITY, 0usize),
        |(count, sum, min, max, positive), &v| {
            (
                count + 1,
                sum + v,
                min.min(v),
                max.max(v),
                positive + usize::from(v > 0.0),
            )
        },
    );

    if count == 0 {
        return f64::NAN;
    }
    match operation {
        StatOperation::Mean => sum / count as f64,
        StatOperation::Sum => sum,
        StatOperation::Min => min,
        StatOperation::Max => max,
        StatOperation::CountPositive => positive as f64,
    }
}

/// Convenience wrapper over a plain slice
pub fn reduce_slice(values: &[f64], operation: StatOperation) -> f64 {
    reduce(ArrayView1::from(values), operation)
}

/// Trait for arrays that can be reduced along an axis
pub trait StatisticalReduction {
    /// Reduce every lane along `axis`
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is out of bounds for the array.
    fn reduce_along_axis(&self, axis: usize, operation: StatOperation) -> Result<Array1<f64>>;
}

impl StatisticalReduction for Array2<f64> {
    fn reduce_along_axis(&self, axis: usize, operation: StatOperation) -> Result<Array1<f64>> {
        if axis >= self.ndim() {
            return Err(MetPointError::Assembly {
                dataset: String::new(),
                reason: format!(
                    "axis {axis} is out of bounds for array with {} dimensions",
                    self.ndim()
                ),
            });
        }
        Ok(self.map_axis(Axis(axis), |lane| reduce(lane, operation)))
    }
}
