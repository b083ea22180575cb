//! Position estimator contract used by the gate's filtered mode.

use crate::domain::{GeoPoint, LocationSample};

/// A recursive estimator that turns noisy readings into smoothed positions.
///
/// The gate owns one estimator for its whole lifetime: the first `reset`
/// seeds it, later `reset` calls restart it from a fresh fix, and `process`
/// folds one sample into the estimate. Both calls are synchronous and must
/// complete in bounded time.
pub trait PositionEstimator: Send {
    /// Seed or re-seed the estimate from one sample.
    fn reset(&mut self, seed: &LocationSample);

    /// Fold one sample into the estimate and return the smoothed position.
    fn process(&mut self, sample: &LocationSample) -> GeoPoint;
}
