//! Raw geolocation readings as delivered by a positioning source.

use chrono::{DateTime, Utc};

use super::GeoPoint;
use crate::{Result, TrackError};

/// One raw reading from the positioning source.
///
/// Produced externally and never mutated. Validity is checked on use, not on
/// construction, so sources can hand readings over without ceremony.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationSample {
    /// Reported position.
    pub point: GeoPoint,
    /// When the source produced the reading.
    pub timestamp: DateTime<Utc>,
    /// Estimated horizontal error radius in meters (smaller is better).
    pub horizontal_accuracy: f64,
}

impl LocationSample {
    /// Create a new sample.
    pub fn new(point: GeoPoint, timestamp: DateTime<Utc>, horizontal_accuracy: f64) -> Self {
        Self {
            point,
            timestamp,
            horizontal_accuracy,
        }
    }

    /// Check that the reading is usable: finite coordinates and a finite,
    /// non-negative accuracy.
    pub fn validate(&self) -> Result<()> {
        if !self.point.is_finite() {
            return Err(TrackError::InvalidSample(format!(
                "non-finite coordinates ({}, {})",
                self.point.latitude, self.point.longitude
            )));
        }
        if !self.horizontal_accuracy.is_finite() {
            return Err(TrackError::InvalidSample(
                "non-finite horizontal accuracy".to_string(),
            ));
        }
        if self.horizontal_accuracy < 0.0 {
            return Err(TrackError::InvalidSample(format!(
                "negative horizontal accuracy {}",
                self.horizontal_accuracy
            )));
        }
        Ok(())
    }

    /// True when the error radius is strictly below `max_accuracy` meters.
    pub fn is_reliable(&self, max_accuracy: f64) -> bool {
        self.horizontal_accuracy < max_accuracy
    }
}
