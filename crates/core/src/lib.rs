//! Sine-Mode Projection Core Library
//!
//! Decomposes vertical velocity sampled on pressure levels onto the first two
//! baroclinic sine modes, `-sin(πx)` and `-sin(2πx)` over the normalized
//! pressure coordinate, and reports how much of each column's weighted
//! variance each mode explains.
//!
//! ## Overview
//!
//! - [`VerticalBasis`]: normalized coordinate, basis vectors, level weights
//!   and basis norms for one level layout (reusable across fields)
//! - [`ModeProjector`] / [`project_modes`]: weighted projection of an
//!   n-dimensional field along its level axis
//! - [`ModeProjection`]: coefficients `a`, `b` and variance fractions
//!   `var_a`, `var_b` shaped like the field without the level axis
//!
//! Structural input problems are reported as [`ProjectionError`]; numeric
//! degeneracies (flat pressure range, all-zero columns) propagate as NaN.

// Core types and utilities
pub mod core_types;

pub mod basis;
pub mod config;
pub mod error;
pub mod projector;

// Re-export main types
pub use basis::VerticalBasis;
pub use config::ProjectorConfig;
pub use core_types::{Hectopascals, Pascals};
pub use error::ProjectionError;
pub use projector::{project_modes, resolve_axis, ModeProjection, ModeProjector};
