//! Path ledger: ordered segments with length and time accounting.
//!
//! The ledger owns the recorded [`TrackingSession`] and is the only place
//! segment points, lengths, and start/end times get mutated. Time-dependent
//! operations take an explicit `now` so callers control the clock.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{DistanceUnit, GeoPoint, PathSegment};
use crate::{Result, TrackError};

/// Handle to one segment, stable for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentHandle(usize);

impl SegmentHandle {
    /// Index of the segment within the session.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Everything recorded since the last reset: segments plus their start and
/// end times, in segment order.
///
/// Invariants: one start time per segment; at most one segment (the last)
/// has no end time yet.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingSession {
    segments: Vec<PathSegment>,
    start_times: Vec<DateTime<Utc>>,
    end_times: Vec<DateTime<Utc>>,
}

impl TrackingSession {
    /// Segments in creation order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Segment start times, one per segment.
    pub fn start_times(&self) -> &[DateTime<Utc>] {
        &self.start_times
    }

    /// Segment end times; shorter than the start list while a segment is open.
    pub fn end_times(&self) -> &[DateTime<Utc>] {
        &self.end_times
    }

    /// True when the most recent segment has not been closed yet.
    pub fn has_open_segment(&self) -> bool {
        self.end_times.len() < self.start_times.len()
    }
}

/// Owns the recorded session and enforces its accounting rules.
#[derive(Debug, Default)]
pub struct PathLedger {
    session: TrackingSession,
}

impl PathLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new segment at `now`, closing any still-open one first.
    ///
    /// When `seed` is given it becomes the segment's first point, keeping the
    /// rendered path connected across sessions. Returns a handle to the new
    /// segment.
    pub fn begin_segment(&mut self, seed: Option<GeoPoint>, now: DateTime<Utc>) -> SegmentHandle {
        if self.session.has_open_segment() {
            self.end_segment(now);
        }

        let mut segment = PathSegment::new();
        if let Some(point) = seed {
            segment.push(point);
        }

        self.session.segments.push(segment);
        self.session.start_times.push(now);

        let handle = SegmentHandle(self.session.segments.len() - 1);
        tracing::debug!(
            segment = handle.index(),
            seeded = seed.is_some(),
            "segment opened"
        );
        handle
    }

    /// Append a point to the open segment.
    ///
    /// Length accounting is untouched; route distance exclusively through
    /// [`record_distance`](Self::record_distance).
    pub fn append_point(&mut self, point: GeoPoint) -> Result<()> {
        self.open_segment_mut()?.push(point);
        Ok(())
    }

    /// Replace the open segment's first point, or append when it is empty.
    ///
    /// Used when a provisional seed point turns out to be superseded by the
    /// first trustworthy fix.
    pub fn replace_origin(&mut self, point: GeoPoint) -> Result<()> {
        self.open_segment_mut()?.replace_first(point);
        Ok(())
    }

    /// Add `meters` to the open segment's length accumulator.
    ///
    /// Deltas must be non-negative; negative values are clamped to zero.
    pub fn record_distance(&mut self, meters: f64) -> Result<()> {
        self.open_segment_mut()?.add_length(meters);
        Ok(())
    }

    /// Close the open segment at `now`. No-op when every segment is closed.
    pub fn end_segment(&mut self, now: DateTime<Utc>) {
        if self.session.has_open_segment() {
            self.session.end_times.push(now);
            tracing::debug!(segment = self.session.end_times.len() - 1, "segment closed");
        }
    }

    /// Total time spent tracking: `(end - start)` over closed segments, plus
    /// `(now - start)` for the open one if any. Zero when empty.
    pub fn total_elapsed(&self, now: DateTime<Utc>) -> Duration {
        let mut total = Duration::zero();
        for (i, start) in self.session.start_times.iter().enumerate() {
            match self.session.end_times.get(i) {
                Some(end) => total = total + (*end - *start),
                None => total = total + (now - *start),
            }
        }
        total
    }

    /// Total recorded distance across all segments, in `unit`.
    pub fn total_distance(&self, unit: DistanceUnit) -> f64 {
        let meters: f64 = self.session.segments.iter().map(PathSegment::length_m).sum();
        unit.from_meters(meters)
    }

    /// Discard everything and return to the empty state.
    pub fn reset(&mut self) {
        self.session = TrackingSession::default();
    }

    /// Segments recorded so far, in creation order.
    pub fn segments(&self) -> &[PathSegment] {
        self.session.segments()
    }

    /// The full recorded session.
    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    /// True while a segment is open.
    pub fn is_open(&self) -> bool {
        self.session.has_open_segment()
    }

    fn open_segment_mut(&mut self) -> Result<&mut PathSegment> {
        if !self.session.has_open_segment() {
            return Err(TrackError::NoOpenSegment);
        }
        self.session
            .segments
            .last_mut()
            .ok_or(TrackError::NoOpenSegment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn secs(s: i64) -> Duration {
        Duration::seconds(s)
    }

    #[test]
    fn test_append_requires_open_segment() {
        let mut ledger = PathLedger::new();
        let err = ledger.append_point(GeoPoint::new(0.0, 0.0));
        assert!(matches!(err, Err(TrackError::NoOpenSegment)));

        ledger.begin_segment(None, t0());
        assert!(ledger.append_point(GeoPoint::new(0.0, 0.0)).is_ok());

        ledger.end_segment(t0() + secs(10));
        let err = ledger.append_point(GeoPoint::new(0.0, 0.0));
        assert!(matches!(err, Err(TrackError::NoOpenSegment)));
    }

    #[test]
    fn test_begin_with_seed_captures_first_point() {
        let mut ledger = PathLedger::new();
        let seed = GeoPoint::new(47.6, -122.3);
        let handle = ledger.begin_segment(Some(seed), t0());

        assert_eq!(handle.index(), 0);
        assert_eq!(ledger.segments()[0].points(), &[seed]);
        assert!(ledger.segments()[0].length_m().abs() < f64::EPSILON);
    }

    #[test]
    fn test_begin_while_open_closes_previous() {
        let mut ledger = PathLedger::new();
        ledger.begin_segment(None, t0());
        let handle = ledger.begin_segment(None, t0() + secs(5));

        assert_eq!(handle.index(), 1);
        assert_eq!(ledger.session().start_times().len(), 2);
        // First segment was force-closed at the second start.
        assert_eq!(ledger.session().end_times().len(), 1);
        assert_eq!(ledger.session().end_times()[0], t0() + secs(5));
        assert!(ledger.is_open());
    }

    #[test]
    fn test_end_segment_is_idempotent() {
        let mut ledger = PathLedger::new();
        ledger.begin_segment(None, t0());
        ledger.end_segment(t0() + secs(10));
        ledger.end_segment(t0() + secs(20));

        assert_eq!(ledger.session().end_times().len(), 1);
        assert_eq!(ledger.session().end_times()[0], t0() + secs(10));
    }

    #[test]
    fn test_elapsed_counts_open_tail() {
        let mut ledger = PathLedger::new();
        assert_eq!(ledger.total_elapsed(t0()), Duration::zero());

        ledger.begin_segment(None, t0());
        assert_eq!(ledger.total_elapsed(t0() + secs(30)), secs(30));

        ledger.end_segment(t0() + secs(60));
        // Closed now; later queries no longer grow the total.
        assert_eq!(ledger.total_elapsed(t0() + secs(600)), secs(60));
    }

    #[test]
    fn test_elapsed_sums_closed_segments() {
        let mut ledger = PathLedger::new();
        ledger.begin_segment(None, t0());
        ledger.end_segment(t0() + secs(60));
        ledger.begin_segment(None, t0() + secs(120));
        ledger.end_segment(t0() + secs(150));

        assert_eq!(ledger.total_elapsed(t0() + secs(1000)), secs(90));
    }

    #[test]
    fn test_distance_totals_and_units() {
        let mut ledger = PathLedger::new();
        assert!(ledger.total_distance(DistanceUnit::Meters).abs() < f64::EPSILON);

        ledger.begin_segment(None, t0());
        ledger.record_distance(40.0).unwrap();
        ledger.record_distance(10.0).unwrap();
        ledger.end_segment(t0() + secs(10));
        ledger.begin_segment(None, t0() + secs(20));
        ledger.record_distance(50.0).unwrap();

        let meters = ledger.total_distance(DistanceUnit::Meters);
        let miles = ledger.total_distance(DistanceUnit::Miles);
        assert!((meters - 100.0).abs() < 1e-9);
        assert!((miles - meters * 0.621371).abs() < 1e-12);
    }

    #[test]
    fn test_record_distance_requires_open_segment() {
        let mut ledger = PathLedger::new();
        assert!(matches!(
            ledger.record_distance(5.0),
            Err(TrackError::NoOpenSegment)
        ));
    }

    #[test]
    fn test_replace_origin_overwrites_seed() {
        let mut ledger = PathLedger::new();
        ledger.begin_segment(Some(GeoPoint::new(1.0, 1.0)), t0());
        ledger.replace_origin(GeoPoint::new(2.0, 2.0)).unwrap();

        assert_eq!(ledger.segments()[0].points(), &[GeoPoint::new(2.0, 2.0)]);
    }

    #[test]
    fn test_reset_returns_to_empty() {
        let mut ledger = PathLedger::new();
        ledger.begin_segment(None, t0());
        ledger.append_point(GeoPoint::new(0.0, 0.0)).unwrap();
        ledger.record_distance(5.0).unwrap();

        ledger.reset();
        assert!(ledger.segments().is_empty());
        assert!(!ledger.is_open());
        assert_eq!(ledger.total_elapsed(t0() + secs(100)), Duration::zero());
        assert!(ledger.total_distance(DistanceUnit::Meters).abs() < f64::EPSILON);
    }
}
