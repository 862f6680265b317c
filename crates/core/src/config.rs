//! Projector configuration
//!
//! Controls how the per-grid-point reduction is scheduled and which
//! diagnostics are logged. None of these settings change the numbers
//! produced: serial and parallel runs are bit-for-bit identical because every
//! grid point is reduced independently in the same level order.

use serde::{Deserialize, Serialize};

/// Default grid-point count at which lane reductions switch to rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// Configuration for [`ModeProjector`](crate::ModeProjector)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Minimum number of grid points (field size without the level axis)
    /// before the reduction runs in parallel
    pub parallel_threshold: usize,
    /// Emit a `warn` event when the level sequence is not strictly monotonic
    pub warn_on_non_monotonic: bool,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            warn_on_non_monotonic: true,
        }
    }
}

impl ProjectorConfig {
    /// Always reduce on the calling thread
    #[must_use]
    pub const fn serial() -> Self {
        Self {
            parallel_threshold: usize::MAX,
            warn_on_non_monotonic: true,
        }
    }

    /// Always reduce with rayon, regardless of grid size
    #[must_use]
    pub const fn parallel() -> Self {
        Self {
            parallel_threshold: 0,
            warn_on_non_monotonic: true,
        }
    }

    /// Set the parallel threshold
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Enable or disable the non-monotonic level warning
    pub fn with_monotonic_warning(mut self, enabled: bool) -> Self {
        self.warn_on_non_monotonic = enabled;
        self
    }

    /// Whether a field with `grid_points` columns should be reduced in parallel
    #[must_use]
    pub fn use_parallel(&self, grid_points: usize) -> bool {
        grid_points >= self.parallel_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(!ProjectorConfig::serial().use_parallel(10_000_000));
        assert!(ProjectorConfig::parallel().use_parallel(1));

        let config = ProjectorConfig::default();
        assert!(!config.use_parallel(DEFAULT_PARALLEL_THRESHOLD - 1));
        assert!(config.use_parallel(DEFAULT_PARALLEL_THRESHOLD));
    }

    #[test]
    fn test_builder_setters() {
        let config = ProjectorConfig::default()
            .with_parallel_threshold(16)
            .with_monotonic_warning(false);
        assert_eq!(config.parallel_threshold, 16);
        assert!(!config.warn_on_non_monotonic);
    }
}
