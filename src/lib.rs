//! # trackgate
//!
//! Gated GPS track recording: accuracy and time-window filtering, optional
//! Kalman smoothing, and per-session distance and elapsed-time accounting.
//!
//! Raw position readings are noisy and arrive at awkward rates. This crate
//! sits between a location source and whatever renders or stores the track:
//! each reading is gated on accuracy and timing, optionally smoothed, and
//! only then appended to the recorded path.
//!
//! ## Features
//!
//! - **Accuracy gating**: readings must beat a configurable horizontal
//!   accuracy bound before they count
//! - **Time windows**: a minimum spacing between accepted fixes, and a
//!   staleness warning when no reliable fix arrives for too long
//! - **Kalman smoothing**: optional constant-velocity filtering of accepted
//!   fixes, pluggable behind the [`PositionEstimator`] trait
//! - **Segment ledger**: per-session polylines with distance and elapsed
//!   totals that survive pause/resume
//!
//! ## Use Cases
//!
//! - Fitness and route recording
//! - Fleet and delivery breadcrumb trails
//! - Field data collection along a path
//! - Replaying logged readings through consistent gating rules
//!
//! ## Architecture
//!
//! ```text
//!                   ┌──────────────┐  accepted points   ┌────────────┐
//!  raw samples ───▶ │ LocationGate │ ─────────────────▶ │ PathLedger │
//!                   └──────┬───────┘                    └─────┬──────┘
//!                          │ smoothing                        │
//!                 ┌────────▼────────┐              distance / elapsed
//!                 │ KalmanSmoother  │                     totals
//!                 └─────────────────┘
//!                          │
//!                 warnings ▼
//!                     EventSink
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use trackgate::{DistanceUnit, GateConfig, GeoPoint, LocationSample, TrackRecorder};
//!
//! fn main() -> trackgate::Result<()> {
//!     let mut recorder = TrackRecorder::new(GateConfig::default())?;
//!
//!     recorder.start_tracking(false, Utc::now());
//!     let sample = LocationSample::new(GeoPoint::new(37.4220, -122.0841), Utc::now(), 5.0);
//!     let outcome = recorder.push_sample(&sample)?;
//!     println!(
//!         "outcome: {outcome:?}, recorded: {:.1} m",
//!         recorder.total_distance(DistanceUnit::Meters)
//!     );
//!     recorder.end_tracking(Utc::now());
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod domain;
pub mod ledger;
pub mod tracking;

// Re-export main types
pub use domain::{
    BroadcastSink, DistanceUnit, EventSink, GeoPoint, InMemoryEventLog, LocationSample,
    NullSink, PathSegment, TrackingEvent,
};
pub use ledger::{PathLedger, SegmentHandle, TrackingSession};
pub use tracking::{
    DiscardReason, GateConfig, GateState, KalmanConfig, KalmanSmoother, LocationGate,
    PositionEstimator, SampleOutcome,
};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for tracking operations
pub type Result<T> = std::result::Result<T, TrackError>;

/// Unified error type for tracking operations
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// A sample carried non-finite or otherwise unusable fields
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// A recording operation needed an open segment and found none
    #[error("No open segment")]
    NoOpenSegment,

    /// A configuration value was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Facade tying the gate, the ledger, and the event sink together.
///
/// Owns one [`LocationGate`] and one [`PathLedger`] and keeps them in step:
/// session control opens and closes ledger segments, publishes session
/// boundary events, and every pushed sample flows through the gate into the
/// ledger. All timing comes from caller-supplied timestamps; the recorder
/// never reads a clock.
pub struct TrackRecorder {
    gate: LocationGate,
    ledger: PathLedger,
    sink: Arc<dyn EventSink>,
}

impl TrackRecorder {
    /// Create a recorder with the default Kalman estimator and no event sink.
    pub fn new(config: GateConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Box::new(KalmanSmoother::default()),
            Arc::new(NullSink),
        )
    }

    /// Create a recorder from explicit parts.
    pub fn with_parts(
        config: GateConfig,
        estimator: Box<dyn PositionEstimator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let gate = LocationGate::new(config, estimator, sink.clone())?;
        Ok(Self {
            gate,
            ledger: PathLedger::new(),
            sink,
        })
    }

    /// Replace the event sink on both the recorder and its gate.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.gate.set_sink(sink.clone());
        self.sink = sink;
        self
    }

    /// Replace the position estimator. The replacement starts unseeded.
    pub fn with_estimator(mut self, estimator: Box<dyn PositionEstimator>) -> Self {
        self.gate.set_estimator(estimator);
        self
    }

    /// Start a tracking session at `now`.
    ///
    /// Opens a ledger segment (closing any left open), arms the gate, and
    /// publishes [`TrackingEvent::TrackingStarted`]. With `continue_from_last`
    /// the new segment is seeded with the last known position so the rendered
    /// path stays connected.
    pub fn start_tracking(&mut self, continue_from_last: bool, now: DateTime<Utc>) -> SegmentHandle {
        let handle = self.gate.start_tracking(&mut self.ledger, continue_from_last, now);
        self.sink.publish(TrackingEvent::TrackingStarted {
            continued: continue_from_last,
            timestamp: now,
        });
        handle
    }

    /// End the current session at `now`.
    ///
    /// Closes the open segment, idles the gate, and publishes
    /// [`TrackingEvent::TrackingEnded`]. Does nothing when no session is
    /// active.
    pub fn end_tracking(&mut self, now: DateTime<Utc>) {
        if !self.gate.is_tracking() {
            return;
        }
        self.gate.end_tracking(&mut self.ledger, now);
        self.sink
            .publish(TrackingEvent::TrackingEnded { timestamp: now });
    }

    /// Feed one raw reading through the gate.
    pub fn push_sample(&mut self, sample: &LocationSample) -> Result<SampleOutcome> {
        self.gate.on_sample(&mut self.ledger, sample)
    }

    /// Total recorded distance across all segments, in the requested unit.
    pub fn total_distance(&self, unit: DistanceUnit) -> f64 {
        self.ledger.total_distance(unit)
    }

    /// Total tracked time across all segments, the open one counted up to
    /// `now`.
    pub fn total_elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.ledger.total_elapsed(now)
    }

    /// Recorded segments, oldest first.
    pub fn segments(&self) -> &[PathSegment] {
        self.ledger.segments()
    }

    /// The full recorded session: segments plus start and end times.
    pub fn session(&self) -> &TrackingSession {
        self.ledger.session()
    }

    /// Most recent valid reading seen, in any state.
    pub fn last_known_location(&self) -> Option<&LocationSample> {
        self.gate.last_known()
    }

    /// True while a tracking session is active.
    pub fn is_tracking(&self) -> bool {
        self.gate.is_tracking()
    }

    /// Current gating state.
    pub fn state(&self) -> &GateState {
        self.gate.state()
    }

    /// Replace the gating thresholds; takes effect with the next sample.
    pub fn set_config(&mut self, config: GateConfig) -> Result<()> {
        self.gate.set_config(config)
    }

    /// Current gating thresholds.
    pub fn config(&self) -> &GateConfig {
        self.gate.config()
    }

    /// Discard all recorded data and session state. Configuration and the
    /// estimator are kept.
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.gate.reset();
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Result, TrackError, TrackRecorder,
        // Domain types
        DistanceUnit, GeoPoint, LocationSample, PathSegment, TrackingEvent,
        // Ledger
        PathLedger, SegmentHandle, TrackingSession,
        // Gating
        DiscardReason, GateConfig, GateState, LocationGate, SampleOutcome,
        // Estimation
        KalmanConfig, KalmanSmoother, PositionEstimator,
        // Event sinks
        BroadcastSink, EventSink, InMemoryEventLog, NullSink,
    };
}
