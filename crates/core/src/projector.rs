//! Projection of vertical-velocity fields onto the two sine modes.
//!
//! For each column of the field along the level axis:
//!
//! ```text
//! a         = Σ ω[i] y1[i] Δp[i] / |y1|²
//! b         = Σ ω[i] y2[i] Δp[i] / |y2|²
//! total_var = Σ ω[i]² Δp[i]
//! var_a     = a² |y1|² / total_var
//! var_b     = b² |y2|² / total_var
//! ```
//!
//! Columns are independent, so the reduction is data-parallel over every
//! axis except the level axis. Structural problems (axis, shape, coercion)
//! fail before any output is allocated; numeric degeneracies come back as
//! NaN/Inf inside a complete result.

use crate::basis::{coerce_levels, VerticalBasis};
use crate::config::ProjectorConfig;
use crate::error::ProjectionError;
use ndarray::{ArrayBase, ArrayD, ArrayView1, Axis, Data, Dimension, IxDyn, RemoveAxis, Zip};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Projection coefficients and variance fractions for every grid point.
///
/// Each array has the input field's shape with the level axis removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProjection {
    /// Mode 1 coefficient (units of the field)
    pub a: ArrayD<f32>,
    /// Mode 2 coefficient (units of the field)
    pub b: ArrayD<f32>,
    /// Variance fraction explained by mode 1 (not clamped)
    pub var_a: ArrayD<f32>,
    /// Variance fraction explained by mode 2 (not clamped)
    pub var_b: ArrayD<f32>,
}

impl ModeProjection {
    /// Split into the `(a, b, var_a, var_b)` tuple.
    pub fn into_tuple(self) -> (ArrayD<f32>, ArrayD<f32>, ArrayD<f32>, ArrayD<f32>) {
        (self.a, self.b, self.var_a, self.var_b)
    }

    /// Shape shared by all four output arrays
    pub fn shape(&self) -> &[usize] {
        self.a.shape()
    }

    /// Variance fraction not explained by either mode, `1 - var_a - var_b`
    pub fn unexplained_fraction(&self) -> ArrayD<f32> {
        let mut rest = ArrayD::<f32>::ones(self.var_a.raw_dim());
        Zip::from(&mut rest)
            .and(&self.var_a)
            .and(&self.var_b)
            .for_each(|r, &va, &vb| *r -= va + vb);
        rest
    }

    /// Rebuild the two-mode approximation `a*y1 + b*y2`.
    ///
    /// The level axis is inserted at `level_axis`, resolved against the
    /// dimensionality of the reconstructed array (so `-1` appends it).
    ///
    /// # Errors
    ///
    /// [`ProjectionError::InvalidAxis`] if `level_axis` does not resolve.
    pub fn reconstruct(
        &self,
        basis: &VerticalBasis,
        level_axis: isize,
    ) -> Result<ArrayD<f32>, ProjectionError> {
        let axis = resolve_axis(level_axis, self.a.ndim() + 1)?;
        let mut shape = self.a.shape().to_vec();
        shape.insert(axis, basis.n_levels());

        let (y1, y2) = (basis.y1(), basis.y2());
        let mut out = ArrayD::<f32>::zeros(IxDyn(&shape));
        Zip::from(out.lanes_mut(Axis(axis)))
            .and(&self.a)
            .and(&self.b)
            .for_each(|mut column, &a, &b| {
                for (i, w) in column.iter_mut().enumerate() {
                    *w = a * y1[i] + b * y2[i];
                }
            });
        Ok(out)
    }
}

/// Projects fields onto the sine-mode basis of their pressure levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeProjector {
    config: ProjectorConfig,
}

impl ModeProjector {
    /// Create a projector with the given configuration
    pub fn new(config: ProjectorConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Project `field` onto the two sine modes of `pressure_levels`.
    ///
    /// `level_axis` may be negative to count from the last axis. A fresh
    /// basis is built on every call.
    ///
    /// # Errors
    ///
    /// - [`ProjectionError::InvalidAxis`] if `level_axis` does not resolve
    /// - [`ProjectionError::ShapeMismatch`] if the level count differs from the
    ///   field's extent along the level axis
    /// - [`ProjectionError::TooFewLevels`] if fewer than two levels are given
    /// - [`ProjectionError::TypeCoercion`] if a level or field value is not
    ///   representable as `f32`
    pub fn project<A, S, D, L>(
        &self,
        field: &ArrayBase<S, D>,
        pressure_levels: &[L],
        level_axis: isize,
    ) -> Result<ModeProjection, ProjectionError>
    where
        A: ToPrimitive,
        S: Data<Elem = A>,
        D: Dimension,
        L: ToPrimitive,
    {
        let axis = checked_level_axis(field, pressure_levels.len(), level_axis)?;
        let basis = VerticalBasis::from_coerced(
            coerce_levels(pressure_levels)?,
            self.config.warn_on_non_monotonic,
        )?;
        let field = coerce_field(field)?;
        Ok(self.reduce(&basis, &field, axis))
    }

    /// Project `field` onto a prebuilt basis.
    ///
    /// # Errors
    ///
    /// - [`ProjectionError::InvalidAxis`] if `level_axis` does not resolve
    /// - [`ProjectionError::ShapeMismatch`] if the basis level count differs
    ///   from the field's extent along the level axis
    /// - [`ProjectionError::TypeCoercion`] if a field value is not
    ///   representable as `f32`
    pub fn project_with_basis<A, S, D>(
        &self,
        basis: &VerticalBasis,
        field: &ArrayBase<S, D>,
        level_axis: isize,
    ) -> Result<ModeProjection, ProjectionError>
    where
        A: ToPrimitive,
        S: Data<Elem = A>,
        D: Dimension,
    {
        let axis = checked_level_axis(field, basis.n_levels(), level_axis)?;
        let field = coerce_field(field)?;
        Ok(self.reduce(basis, &field, axis))
    }

    fn reduce(&self, basis: &VerticalBasis, field: &ArrayD<f32>, axis: usize) -> ModeProjection {
        let grid_dim = field.raw_dim().remove_axis(Axis(axis));
        let grid_points = grid_dim.size();
        let parallel = self.config.use_parallel(grid_points);
        debug!(
            "Projecting {:?} field onto sine modes along axis {} ({} grid points, parallel: {})",
            field.shape(),
            axis,
            grid_points,
            parallel
        );

        let mut a = ArrayD::<f32>::zeros(grid_dim.clone());
        let mut b = ArrayD::<f32>::zeros(grid_dim.clone());
        let mut var_a = ArrayD::<f32>::zeros(grid_dim.clone());
        let mut var_b = ArrayD::<f32>::zeros(grid_dim);

        let zip = Zip::from(&mut a)
            .and(&mut b)
            .and(&mut var_a)
            .and(&mut var_b)
            .and(field.lanes(Axis(axis)));

        let store = |a_out: &mut f32,
                     b_out: &mut f32,
                     var_a_out: &mut f32,
                     var_b_out: &mut f32,
                     column: ArrayView1<f32>| {
            let proj = basis.project_column(column);
            *a_out = proj.a;
            *b_out = proj.b;
            *var_a_out = proj.var_a;
            *var_b_out = proj.var_b;
        };

        if parallel {
            zip.par_for_each(store);
        } else {
            zip.for_each(store);
        }

        trace!("Projection complete for {} grid points", grid_points);
        ModeProjection { a, b, var_a, var_b }
    }
}

impl VerticalBasis {
    /// Project `field` onto this basis with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`ModeProjector::project_with_basis`].
    pub fn project<A, S, D>(
        &self,
        field: &ArrayBase<S, D>,
        level_axis: isize,
    ) -> Result<ModeProjection, ProjectionError>
    where
        A: ToPrimitive,
        S: Data<Elem = A>,
        D: Dimension,
    {
        ModeProjector::default().project_with_basis(self, field, level_axis)
    }
}

/// Project `field` onto the two sine modes of `pressure_levels` with the
/// default configuration.
///
/// ```
/// use ndarray::Array2;
/// use sine_modes_core::{project_modes, VerticalBasis};
///
/// let levels = [1000.0_f32, 900.0, 800.0, 700.0, 600.0, 500.0, 400.0, 300.0, 200.0, 100.0];
/// let basis = VerticalBasis::new(&levels).unwrap();
///
/// // Three grid points, each holding a pure mode 1 profile
/// let column = basis.y1().as_slice().to_vec();
/// let field = Array2::from_shape_fn((3, levels.len()), |(_, k)| column[k]);
///
/// let result = project_modes(&field, &levels, -1).unwrap();
/// assert_eq!(result.shape(), &[3]);
/// for (&a, &var_a) in result.a.iter().zip(result.var_a.iter()) {
///     assert!((a - 1.0).abs() < 1e-3);
///     assert!((var_a - 1.0).abs() < 1e-3);
/// }
/// ```
///
/// # Errors
///
/// See [`ModeProjector::project`].
pub fn project_modes<A, S, D, L>(
    field: &ArrayBase<S, D>,
    pressure_levels: &[L],
    level_axis: isize,
) -> Result<ModeProjection, ProjectionError>
where
    A: ToPrimitive,
    S: Data<Elem = A>,
    D: Dimension,
    L: ToPrimitive,
{
    ModeProjector::default().project(field, pressure_levels, level_axis)
}

/// Resolve a possibly negative axis index against `ndim` axes.
///
/// # Errors
///
/// [`ProjectionError::InvalidAxis`] unless `-ndim <= axis < ndim`.
pub fn resolve_axis(axis: isize, ndim: usize) -> Result<usize, ProjectionError> {
    let invalid = ProjectionError::InvalidAxis { axis, ndim };
    let ndim_signed = isize::try_from(ndim).map_err(|_| invalid.clone())?;
    let resolved = if axis < 0 { axis + ndim_signed } else { axis };
    if (0..ndim_signed).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(invalid)
    }
}

fn checked_level_axis<S, D>(
    field: &ArrayBase<S, D>,
    levels: usize,
    level_axis: isize,
) -> Result<usize, ProjectionError>
where
    S: Data,
    D: Dimension,
{
    let axis = resolve_axis(level_axis, field.ndim())?;
    let extent = field.len_of(Axis(axis));
    if extent != levels {
        return Err(ProjectionError::shape_mismatch(levels, axis, extent));
    }
    Ok(axis)
}

fn coerce_field<A, S, D>(field: &ArrayBase<S, D>) -> Result<ArrayD<f32>, ProjectionError>
where
    A: ToPrimitive,
    S: Data<Elem = A>,
    D: Dimension,
{
    if let Some(index) = field.iter().position(|v| v.to_f32().is_none()) {
        return Err(ProjectionError::TypeCoercion {
            what: "field",
            index,
        });
    }
    Ok(field.map(|v| v.to_f32().unwrap_or(f32::NAN)).into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::{Array1, Array3};

    /// Field value that may have failed to parse upstream
    enum Reading {
        Value(f32),
        Unparsed,
    }

    impl ToPrimitive for Reading {
        fn to_i64(&self) -> Option<i64> {
            match self {
                Reading::Value(v) => v.to_i64(),
                Reading::Unparsed => None,
            }
        }

        fn to_u64(&self) -> Option<u64> {
            match self {
                Reading::Value(v) => v.to_u64(),
                Reading::Unparsed => None,
            }
        }

        fn to_f32(&self) -> Option<f32> {
            match self {
                Reading::Value(v) => Some(*v),
                Reading::Unparsed => None,
            }
        }
    }

    const UNIFORM: [f32; 10] = [
        1000.0, 900.0, 800.0, 700.0, 600.0, 500.0, 400.0, 300.0, 200.0, 100.0,
    ];

    fn column_field(shape: &[usize], axis: usize, column: &[f32]) -> ArrayD<f32> {
        ArrayD::from_shape_fn(IxDyn(shape), |idx| column[idx[axis]])
    }

    #[test]
    fn test_resolve_axis() {
        assert_eq!(resolve_axis(0, 3), Ok(0));
        assert_eq!(resolve_axis(2, 3), Ok(2));
        assert_eq!(resolve_axis(-1, 3), Ok(2));
        assert_eq!(resolve_axis(-3, 3), Ok(0));
        assert_eq!(
            resolve_axis(3, 3),
            Err(ProjectionError::InvalidAxis { axis: 3, ndim: 3 })
        );
        assert_eq!(
            resolve_axis(-4, 3),
            Err(ProjectionError::InvalidAxis { axis: -4, ndim: 3 })
        );
        assert!(resolve_axis(0, 0).is_err());
    }

    #[test]
    fn test_shape_law_every_axis() {
        let basis = VerticalBasis::new(&UNIFORM).unwrap();
        let column = basis.y2().as_slice().to_vec();
        for axis in 0..3 {
            let mut shape = vec![2, 3, 4];
            shape.insert(axis, UNIFORM.len());
            let field = column_field(&shape, axis, &column);

            let result = project_modes(&field, &UNIFORM, axis as isize).unwrap();
            assert_eq!(result.shape(), &[2, 3, 4]);
            assert_eq!(result.b.shape(), result.var_b.shape());
            assert!(result.b.iter().all(|&b| (b - 1.0).abs() < 1e-3));
        }
    }

    #[test]
    fn test_uniform_levels_separate_modes_exactly() {
        let basis = VerticalBasis::new(&UNIFORM).unwrap();
        let column: Vec<f32> = basis
            .y1()
            .iter()
            .zip(basis.y2().iter())
            .map(|(y1, y2)| 2.0 * y1 - 0.5 * y2)
            .collect();
        let field = Array1::from(column);

        let result = basis.project(&field, 0).unwrap();
        assert_eq!(result.shape(), &[] as &[usize]);
        let a = result.a.iter().next().copied().unwrap();
        let b = result.b.iter().next().copied().unwrap();
        assert_relative_eq!(a, 2.0, max_relative = 1e-4);
        assert_relative_eq!(b, -0.5, max_relative = 1e-4);

        // 4|y1|² / (4|y1|² + 0.25|y2|²) with equal norms
        let var_a = result.var_a.iter().next().copied().unwrap();
        let var_b = result.var_b.iter().next().copied().unwrap();
        assert_relative_eq!(var_a, 16.0 / 17.0, max_relative = 1e-4);
        assert_relative_eq!(var_b, 1.0 / 17.0, max_relative = 1e-3);
        assert_abs_diff_eq!(
            result.unexplained_fraction().iter().next().copied().unwrap(),
            0.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let field = Array3::<f32>::zeros((4, 7, 5));
        let err = project_modes(&field, &UNIFORM, 1).unwrap_err();
        assert_eq!(err, ProjectionError::shape_mismatch(10, 1, 7));
    }

    #[test]
    fn test_invalid_axis_fails_fast() {
        let field = Array3::<f32>::zeros((4, 10, 5));
        let err = project_modes(&field, &UNIFORM, 3).unwrap_err();
        assert_eq!(err, ProjectionError::InvalidAxis { axis: 3, ndim: 3 });
        let err = project_modes(&field, &UNIFORM, -4).unwrap_err();
        assert_eq!(err, ProjectionError::InvalidAxis { axis: -4, ndim: 3 });
    }

    #[test]
    fn test_integer_field_is_coerced() {
        let field = Array1::from(vec![0_i64; UNIFORM.len()]);
        let result = project_modes(&field, &UNIFORM, 0).unwrap();
        assert!(result.a.iter().all(|&a| a == 0.0));
        assert!(result.var_a.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_uncoercible_value_is_reported() {
        let mut values: Vec<Reading> = UNIFORM.iter().map(|_| Reading::Value(0.5)).collect();
        values[3] = Reading::Unparsed;
        let field = Array1::from(values);
        let err = project_modes(&field, &UNIFORM, 0).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::TypeCoercion {
                what: "field",
                index: 3
            }
        );
    }

    #[test]
    fn test_uncoercible_level_is_reported() {
        let mut levels: Vec<Reading> = UNIFORM.iter().map(|&p| Reading::Value(p)).collect();
        levels[6] = Reading::Unparsed;
        let field = Array1::<f32>::zeros(UNIFORM.len());
        let err = project_modes(&field, &levels, 0).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::TypeCoercion {
                what: "pressure level",
                index: 6
            }
        );
    }

    #[test]
    fn test_reconstruct_inserts_level_axis() {
        let basis = VerticalBasis::new(&UNIFORM).unwrap();
        let column = basis.y1().as_slice().to_vec();
        let field = column_field(&[3, UNIFORM.len(), 2], 1, &column);

        let result = basis.project(&field, 1).unwrap();
        let rebuilt = result.reconstruct(&basis, 1).unwrap();
        assert_eq!(rebuilt.shape(), field.shape());
        for (r, f) in rebuilt.iter().zip(field.iter()) {
            assert_abs_diff_eq!(*r, *f, epsilon = 1e-4);
        }

        assert!(result.reconstruct(&basis, 3).is_err());
        assert_eq!(result.reconstruct(&basis, -1).unwrap().shape(), &[3, 2, 10]);
    }

    #[test]
    fn test_into_tuple_order() {
        let basis = VerticalBasis::new(&UNIFORM).unwrap();
        let field = column_field(&[2, UNIFORM.len()], 1, basis.y1().as_slice());
        let result = basis.project(&field, -1).unwrap();
        let expected = result.clone();
        let (a, b, var_a, var_b) = result.into_tuple();
        assert_eq!(a, expected.a);
        assert_eq!(b, expected.b);
        assert_eq!(var_a, expected.var_a);
        assert_eq!(var_b, expected.var_b);
    }
}
