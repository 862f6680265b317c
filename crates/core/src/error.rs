//! Error types for mode projection.
//!
//! Only structural problems are errors. Numeric degeneracies (zero pressure
//! range, zero basis norm, zero column variance) are not: they propagate as
//! NaN/Inf through the returned arrays.

use thiserror::Error;

/// Errors that can occur while validating projection inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    /// Level count differs from the field's extent along the level axis.
    #[error(
        "Shape mismatch: {levels} pressure levels but field axis {axis} has extent {extent}"
    )]
    ShapeMismatch {
        levels: usize,
        axis: usize,
        extent: usize,
    },

    /// Level axis does not resolve to an axis of the field.
    #[error("Invalid level axis {axis} for a field with {ndim} dimension(s)")]
    InvalidAxis { axis: isize, ndim: usize },

    /// The end-point weights need at least two levels.
    #[error("At least 2 pressure levels are required, got {levels}")]
    TooFewLevels { levels: usize },

    /// A value could not be represented as `f32`.
    #[error("Cannot convert {what} value at flat index {index} to f32")]
    TypeCoercion { what: &'static str, index: usize },
}

impl ProjectionError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(levels: usize, axis: usize, extent: usize) -> Self {
        Self::ShapeMismatch {
            levels,
            axis,
            extent,
        }
    }
}
