//! Sine-mode vertical basis on pressure levels.
//!
//! Everything here depends only on the level layout, never on the field being
//! projected, so one [`VerticalBasis`] can be applied to any number of fields
//! that share the same levels.
//!
//! # Construction
//!
//! ```text
//! htop = min(p), hbot = max(p)
//! x[i]  = (p[i] - htop) / (hbot - htop)            0 at the top, 1 at the bottom
//! y1[i] = -sin(π x[i])                             first baroclinic mode
//! y2[i] = -sin(2π x[i])                            second baroclinic mode
//!
//! delta_p[0]   = p[0] - p[1]
//! delta_p[i]   = (p[i-1] - p[i+1]) / 2             1 <= i <= n-2
//! delta_p[n-1] = p[n-2] - p[n-1]
//!
//! yk_norm2 = Σ yk[i]² delta_p[i]
//! ```
//!
//! The weights are signed: levels ordered bottom-up (decreasing pressure)
//! give positive weights, top-down ordering gives negative weights. Every
//! quantity downstream is a ratio of two such sums, so the sign cancels and
//! results do not depend on the ordering, provided the levels are monotonic.
//!
//! A zero pressure range is not rejected: `x` becomes NaN and the NaN flows
//! into every projection computed from this basis.

use crate::core_types::units::{Hectopascals, Pascals};
use crate::error::ProjectionError;
use nalgebra::DVector;
use ndarray::ArrayView1;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::{debug, warn};

/// Level-dependent quantities of the two-mode projection.
///
/// Serializes as its pressure levels only; deserializing rebuilds every
/// derived vector, so a stored basis is always internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BasisLevels", into = "BasisLevels")]
pub struct VerticalBasis {
    levels: DVector<f32>,
    x: DVector<f32>,
    y1: DVector<f32>,
    y2: DVector<f32>,
    delta_p: DVector<f32>,
    y1_weighted: DVector<f32>,
    y2_weighted: DVector<f32>,
    y1_norm2: f32,
    y2_norm2: f32,
    monotonic: bool,
}

/// Serialized form of [`VerticalBasis`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BasisLevels {
    levels: Vec<f32>,
}

impl TryFrom<BasisLevels> for VerticalBasis {
    type Error = ProjectionError;

    fn try_from(stored: BasisLevels) -> Result<Self, Self::Error> {
        Self::from_coerced(stored.levels, true)
    }
}

impl From<VerticalBasis> for BasisLevels {
    fn from(basis: VerticalBasis) -> Self {
        Self {
            levels: basis.levels.as_slice().to_vec(),
        }
    }
}

/// Projection of a single level column onto both modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColumnProjection {
    /// Mode 1 coefficient
    pub a: f32,
    /// Mode 2 coefficient
    pub b: f32,
    /// Fraction of the column's weighted variance explained by mode 1
    pub var_a: f32,
    /// Fraction of the column's weighted variance explained by mode 2
    pub var_b: f32,
}

impl VerticalBasis {
    /// Build the basis for a set of pressure levels.
    ///
    /// Levels may be ordered either way but should be strictly monotonic;
    /// a non-monotonic sequence is accepted and logged at `warn`.
    ///
    /// # Errors
    ///
    /// - [`ProjectionError::TypeCoercion`] if a level is not representable as `f32`
    /// - [`ProjectionError::TooFewLevels`] if fewer than two levels are given
    pub fn new<L: ToPrimitive>(pressure_levels: &[L]) -> Result<Self, ProjectionError> {
        Self::from_coerced(coerce_levels(pressure_levels)?, true)
    }

    /// Build the basis from typed hPa levels.
    ///
    /// # Errors
    ///
    /// Same as [`VerticalBasis::new`].
    pub fn from_hectopascals(pressure_levels: &[Hectopascals]) -> Result<Self, ProjectionError> {
        Self::new(pressure_levels)
    }

    /// Build the basis from typed Pa levels, converted to hPa first.
    ///
    /// # Errors
    ///
    /// Same as [`VerticalBasis::new`].
    pub fn from_pascals(pressure_levels: &[Pascals]) -> Result<Self, ProjectionError> {
        let hpa: Vec<Hectopascals> = pressure_levels
            .iter()
            .copied()
            .map(Pascals::to_hectopascals)
            .collect();
        Self::from_hectopascals(&hpa)
    }

    pub(crate) fn from_coerced(
        levels: Vec<f32>,
        warn_on_non_monotonic: bool,
    ) -> Result<Self, ProjectionError> {
        let n = levels.len();
        if n < 2 {
            return Err(ProjectionError::TooFewLevels { levels: n });
        }
        if n == 2 {
            warn!("Only 2 pressure levels: both weights reduce to the same one-sided difference");
        }

        let levels = DVector::from_vec(levels);
        let monotonic = is_strictly_monotonic(levels.as_slice());
        if !monotonic && warn_on_non_monotonic {
            warn!(
                "Pressure levels are not strictly monotonic, level weights are unreliable: {:?}",
                levels.as_slice()
            );
        }

        let htop = nan_propagating_fold(levels.as_slice(), f32::INFINITY, f32::min);
        let hbot = nan_propagating_fold(levels.as_slice(), f32::NEG_INFINITY, f32::max);
        let range = hbot - htop;
        if range == 0.0 {
            debug!("Zero pressure range at {} hPa, basis will be NaN", htop);
        }

        let x = levels.map(|p| (p - htop) / range);
        let y1 = x.map(|x| -(PI * x).sin());
        let y2 = x.map(|x| -(2.0 * PI * x).sin());

        let delta_p = DVector::from_fn(n, |i, _| {
            if i == 0 {
                levels[0] - levels[1]
            } else if i == n - 1 {
                levels[n - 2] - levels[n - 1]
            } else {
                (levels[i - 1] - levels[i + 1]) / 2.0
            }
        });

        let y1_weighted = y1.component_mul(&delta_p);
        let y2_weighted = y2.component_mul(&delta_p);
        let y1_norm2 = sequential_dot(&y1, &y1_weighted);
        let y2_norm2 = sequential_dot(&y2, &y2_weighted);

        debug!(
            "Built sine-mode basis: {} levels, |y1|² = {}, |y2|² = {}",
            n, y1_norm2, y2_norm2
        );

        Ok(Self {
            levels,
            x,
            y1,
            y2,
            delta_p,
            y1_weighted,
            y2_weighted,
            y1_norm2,
            y2_norm2,
            monotonic,
        })
    }

    /// Number of pressure levels
    #[inline]
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Pressure levels as given (hPa)
    pub fn levels(&self) -> &DVector<f32> {
        &self.levels
    }

    /// Normalized pressure coordinate in [0, 1]
    pub fn x(&self) -> &DVector<f32> {
        &self.x
    }

    /// Mode 1 basis vector, `-sin(πx)`
    pub fn y1(&self) -> &DVector<f32> {
        &self.y1
    }

    /// Mode 2 basis vector, `-sin(2πx)`
    pub fn y2(&self) -> &DVector<f32> {
        &self.y2
    }

    /// Per-level integration weights (hPa, signed by level ordering)
    pub fn delta_p(&self) -> &DVector<f32> {
        &self.delta_p
    }

    /// `y1 * delta_p`
    pub fn y1_weighted(&self) -> &DVector<f32> {
        &self.y1_weighted
    }

    /// `y2 * delta_p`
    pub fn y2_weighted(&self) -> &DVector<f32> {
        &self.y2_weighted
    }

    /// Squared weighted norm of mode 1
    pub fn y1_norm2(&self) -> f32 {
        self.y1_norm2
    }

    /// Squared weighted norm of mode 2
    pub fn y2_norm2(&self) -> f32 {
        self.y2_norm2
    }

    /// Whether the levels are strictly increasing or strictly decreasing
    pub fn is_monotonic(&self) -> bool {
        self.monotonic
    }

    /// Project one level column onto both modes.
    ///
    /// `column` must have [`n_levels`](Self::n_levels) entries; callers
    /// validate the shape before reducing.
    #[inline]
    pub(crate) fn project_column(&self, column: ArrayView1<'_, f32>) -> ColumnProjection {
        debug_assert_eq!(column.len(), self.n_levels());

        let mut proj1 = 0.0_f32;
        let mut proj2 = 0.0_f32;
        let mut total_var = 0.0_f32;
        for (i, &w) in column.iter().enumerate() {
            proj1 += w * self.y1_weighted[i];
            proj2 += w * self.y2_weighted[i];
            total_var += w * w * self.delta_p[i];
        }

        let a = proj1 / self.y1_norm2;
        let b = proj2 / self.y2_norm2;

        ColumnProjection {
            a,
            b,
            var_a: a * a * self.y1_norm2 / total_var,
            var_b: b * b * self.y2_norm2 / total_var,
        }
    }
}

/// Coerce raw level values to `f32`.
pub(crate) fn coerce_levels<L: ToPrimitive>(levels: &[L]) -> Result<Vec<f32>, ProjectionError> {
    levels
        .iter()
        .enumerate()
        .map(|(index, p)| {
            p.to_f32().ok_or(ProjectionError::TypeCoercion {
                what: "pressure level",
                index,
            })
        })
        .collect()
}

fn is_strictly_monotonic(levels: &[f32]) -> bool {
    levels.windows(2).all(|w| w[0] < w[1]) || levels.windows(2).all(|w| w[0] > w[1])
}

// f32::min/max skip NaN; a NaN level has to poison the range instead.
fn nan_propagating_fold(values: &[f32], init: f32, f: fn(f32, f32) -> f32) -> f32 {
    values.iter().fold(init, |acc, &v| {
        if acc.is_nan() || v.is_nan() {
            f32::NAN
        } else {
            f(acc, v)
        }
    })
}

// Same summation order as `project_column`, so a column equal to a basis
// vector reproduces its norm exactly.
fn sequential_dot(u: &DVector<f32>, v: &DVector<f32>) -> f32 {
    u.iter().zip(v.iter()).map(|(a, b)| a * b).sum()
}
