//! Path segments and the units their distances are reported in.

use super::GeoPoint;

/// Unit for reported path distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceUnit {
    /// Meters, the unit distances are accumulated in.
    Meters,
    /// Miles, converted from the meter total with the factor 0.621371.
    Miles,
}

impl DistanceUnit {
    /// Convert a meter total into this unit.
    pub fn from_meters(&self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Meters => meters,
            DistanceUnit::Miles => meters * 0.621371,
        }
    }
}

/// One contiguous stretch of recorded path.
///
/// Points are kept in traversal order. The length accumulator is independent
/// of the point list: appending a point never changes it, and it only grows
/// through explicit distance recording.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathSegment {
    points: Vec<GeoPoint>,
    length_m: f64,
}

impl PathSegment {
    /// Create an empty segment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Points in traversal order.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Accumulated length in meters.
    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    /// Number of captured points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no point has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(crate) fn push(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    /// Overwrite the first point, or append when the segment is empty.
    pub(crate) fn replace_first(&mut self, point: GeoPoint) {
        match self.points.first_mut() {
            Some(first) => *first = point,
            None => self.points.push(point),
        }
    }

    /// Grow the length accumulator. Negative deltas are clamped to zero.
    pub(crate) fn add_length(&mut self, meters: f64) {
        self.length_m += meters.max(0.0);
    }
}
