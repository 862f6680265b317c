//! Semantic unit types for pressure coordinates
//!
//! Newtype wrappers keep hectopascal and pascal values from being mixed up
//! when level sets come from different data sources (reanalysis files commonly
//! store levels in Pa, model output in hPa).
//!
//! # Design Philosophy
//! - f32 storage, matching the single-precision projection arithmetic
//! - Total ordering via `Ord` on hPa levels (NaN sorts above all values)
//! - `Deref` to the raw value for use in formulas
//! - Serde support for serialization
//!
//! # Usage
//! ```
//! use sine_modes_core::core_types::units::{Hectopascals, Pascals};
//!
//! let p = Hectopascals::new(850.0);
//! let pa: Pascals = p.into();
//! assert!((*pa - 85_000.0).abs() < 0.01);
//!
//! let top = Hectopascals::new(50.0);
//! assert_eq!(p.min(top), top);
//! ```

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// Compare f32 values with total ordering using Rust's built-in `total_cmp`
#[inline]
fn f32_total_cmp(a: f32, b: f32) -> Ordering {
    a.total_cmp(&b)
}

// ============================================================================
// PRESSURE TYPES
// ============================================================================

/// Pressure in hectopascals (hPa, numerically equal to millibars)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Hectopascals(f32);

impl Eq for Hectopascals {}

impl PartialOrd for Hectopascals {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hectopascals {
    fn cmp(&self, other: &Self) -> Ordering {
        f32_total_cmp(self.0, other.0)
    }
}

impl Deref for Hectopascals {
    type Target = f32;
    #[inline]
    fn deref(&self) -> &f32 {
        &self.0
    }
}

impl Hectopascals {
    /// Create a new pressure in hPa
    #[inline]
    #[must_use]
    pub const fn new(value: f32) -> Self {
        Hectopascals(value)
    }

    /// Get the raw f32 value
    #[inline]
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Convert to pascals
    #[inline]
    #[must_use]
    pub fn to_pascals(self) -> Pascals {
        Pascals(self.0 * 100.0)
    }
}

impl From<f32> for Hectopascals {
    fn from(v: f32) -> Self {
        Hectopascals(v)
    }
}

impl From<Hectopascals> for f32 {
    fn from(p: Hectopascals) -> f32 {
        p.0
    }
}

impl From<Pascals> for Hectopascals {
    fn from(p: Pascals) -> Self {
        p.to_hectopascals()
    }
}

// Lets typed levels flow straight into the projection's numeric coercion.
impl ToPrimitive for Hectopascals {
    fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    fn to_f32(&self) -> Option<f32> {
        Some(self.0)
    }

    fn to_f64(&self) -> Option<f64> {
        Some(f64::from(self.0))
    }
}

impl fmt::Display for Hectopascals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} hPa", self.0)
    }
}

/// Pressure in pascals (Pa)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Pascals(f32);

impl Deref for Pascals {
    type Target = f32;
    #[inline]
    fn deref(&self) -> &f32 {
        &self.0
    }
}

impl Pascals {
    /// Create a new pressure in Pa
    #[inline]
    #[must_use]
    pub const fn new(value: f32) -> Self {
        Pascals(value)
    }

    /// Get the raw f32 value
    #[inline]
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Convert to hectopascals
    #[inline]
    #[must_use]
    pub fn to_hectopascals(self) -> Hectopascals {
        Hectopascals(self.0 / 100.0)
    }
}

impl From<Hectopascals> for Pascals {
    fn from(p: Hectopascals) -> Self {
        p.to_pascals()
    }
}

impl fmt::Display for Pascals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0} Pa", self.0)
    }
}
