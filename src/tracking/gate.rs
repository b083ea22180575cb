//! Per-sample gating state machine: accept, smooth, discard, or warn.
//!
//! The gate consumes raw readings one at a time and decides what each one
//! becomes: a raw point in the ledger, a smoothed point via the estimator, or
//! a discard (with a published warning when no reliable fix has arrived for
//! too long). All staleness checks come from sample timestamps; the gate owns
//! no timers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{EventSink, GeoPoint, LocationSample, TrackingEvent};
use crate::ledger::{PathLedger, SegmentHandle};
use crate::tracking::PositionEstimator;
use crate::{Result, TrackError};

/// Thresholds for the gating state machine.
///
/// Read on every sample; replacing the config takes effect with the next one.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateConfig {
    /// Seconds that must pass since the last accept before a sample is
    /// processed in filtered mode (default: 0.5)
    pub min_time_window: f64,
    /// Seconds without an accept before a low-accuracy warning (default: 8.0)
    pub max_time_window: f64,
    /// Horizontal accuracy in meters a reading must beat (default: 25.0)
    pub max_accuracy: f64,
    /// Displacement in meters below which no distance is recorded
    /// (default: 0.1)
    pub min_distance: f64,
    /// Route accepted samples through the position estimator (default: false)
    pub use_filter: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_time_window: 0.5,
            max_time_window: 8.0,
            max_accuracy: 25.0,
            min_distance: 0.1,
            use_filter: false,
        }
    }
}

impl GateConfig {
    /// Check that the thresholds are usable: all finite and non-negative,
    /// with `min_time_window <= max_time_window`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_time_window", self.min_time_window),
            ("max_time_window", self.max_time_window),
            ("max_accuracy", self.max_accuracy),
            ("min_distance", self.min_distance),
        ] {
            if !value.is_finite() {
                return Err(TrackError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
            if value < 0.0 {
                return Err(TrackError::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if self.min_time_window > self.max_time_window {
            return Err(TrackError::InvalidConfig(format!(
                "min_time_window ({}) exceeds max_time_window ({})",
                self.min_time_window, self.max_time_window
            )));
        }
        Ok(())
    }
}

/// Gating state, advanced by session control and per-sample evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    /// Not tracking; samples only refresh the last known position.
    Idle,
    /// Tracking without the estimator; every valid sample is accepted as-is.
    Raw,
    /// Tracking with the estimator, waiting for the first sample to seed it.
    FilterUninitialized,
    /// Estimator seeded (possibly in an earlier session) but not trustworthy;
    /// waiting for a reliable sample to re-seed from.
    FilterPendingReset {
        /// When the last sample was accepted, or the wait began.
        last_accepted_at: DateTime<Utc>,
    },
    /// Estimator live; reliable, well-spaced samples are smoothed in.
    FilterActive {
        /// When the last sample was accepted.
        last_accepted_at: DateTime<Utc>,
    },
}

/// Why a sample was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No tracking session is active.
    Idle,
    /// Horizontal accuracy did not beat `max_accuracy`.
    Unreliable,
    /// Arrived before `min_time_window` elapsed since the last accept, or
    /// with a timestamp behind it.
    TooSoon,
    /// No accept for longer than `max_time_window`; a warning was published.
    Stale,
}

/// What the gate did with one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// Accepted unchanged; the raw point was appended.
    AcceptedRaw,
    /// Accepted through the estimator.
    AcceptedFiltered {
        /// The smoothed position that was appended.
        smoothed: GeoPoint,
    },
    /// Not accepted; no point was appended.
    Discarded(DiscardReason),
}

impl SampleOutcome {
    /// True for either accepted variant.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::AcceptedRaw | Self::AcceptedFiltered { .. })
    }
}

/// The per-sample gating state machine.
///
/// Owns the gating state, the estimator, and the distance reference. Session
/// control and sample evaluation drive a [`PathLedger`] passed into each
/// call; warnings go out through the configured [`EventSink`].
pub struct LocationGate {
    config: GateConfig,
    state: GateState,
    estimator: Box<dyn PositionEstimator>,
    /// True once the estimator has been seeded at least once.
    estimator_initialized: bool,
    /// Last accepted raw position; the displacement gate measures from here.
    tracking_reference: Option<GeoPoint>,
    /// Most recent valid raw reading, regardless of state.
    last_known: Option<LocationSample>,
    sink: Arc<dyn EventSink>,
}

impl LocationGate {
    /// Create an idle gate with the given config, estimator, and sink.
    pub fn new(
        config: GateConfig,
        estimator: Box<dyn PositionEstimator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: GateState::Idle,
            estimator,
            estimator_initialized: false,
            tracking_reference: None,
            last_known: None,
            sink,
        })
    }

    /// Start a tracking session: open a ledger segment and arm the gate.
    ///
    /// With `continue_from_last` the segment is seeded with the last known
    /// position so the rendered path stays connected across sessions. In
    /// filtered mode an already-seeded estimator is kept and marked for
    /// re-seeding instead of being replaced.
    pub fn start_tracking(
        &mut self,
        ledger: &mut PathLedger,
        continue_from_last: bool,
        now: DateTime<Utc>,
    ) -> SegmentHandle {
        let seed = if continue_from_last {
            self.last_known.map(|s| s.point)
        } else {
            None
        };
        let handle = ledger.begin_segment(seed, now);

        self.state = if !self.config.use_filter {
            GateState::Raw
        } else if self.estimator_initialized {
            GateState::FilterPendingReset {
                last_accepted_at: now,
            }
        } else {
            GateState::FilterUninitialized
        };

        tracing::info!(
            state = ?self.state,
            continued = continue_from_last,
            "tracking started"
        );
        handle
    }

    /// End the current session: close the open segment and go idle.
    ///
    /// The distance reference survives, so a back-to-back session bridges
    /// distance from where this one left off. Safe to call repeatedly.
    pub fn end_tracking(&mut self, ledger: &mut PathLedger, now: DateTime<Utc>) {
        ledger.end_segment(now);
        if !matches!(self.state, GateState::Idle) {
            tracing::info!("tracking ended");
        }
        self.state = GateState::Idle;
    }

    /// Evaluate one raw reading against the current state.
    ///
    /// Malformed samples (non-finite fields, negative accuracy) are rejected
    /// with an error and change nothing. Every valid sample refreshes the
    /// last known position; what else happens depends on the state.
    pub fn on_sample(
        &mut self,
        ledger: &mut PathLedger,
        sample: &LocationSample,
    ) -> Result<SampleOutcome> {
        sample.validate()?;
        self.last_known = Some(*sample);

        let outcome = match self.state {
            GateState::Idle => {
                // Movement while idle must not bridge into the next segment.
                self.tracking_reference = None;
                SampleOutcome::Discarded(DiscardReason::Idle)
            }

            GateState::Raw => {
                ledger.append_point(sample.point)?;
                self.bump_distance(ledger, sample.point, sample.point)?;
                SampleOutcome::AcceptedRaw
            }

            GateState::FilterUninitialized => self.seed_estimator(ledger, sample)?,

            GateState::FilterPendingReset { last_accepted_at } => {
                if sample.is_reliable(self.config.max_accuracy) {
                    self.seed_estimator(ledger, sample)?
                } else if self.is_stale(last_accepted_at, sample.timestamp) {
                    self.warn_stale(sample)
                } else {
                    SampleOutcome::Discarded(DiscardReason::Unreliable)
                }
            }

            GateState::FilterActive { last_accepted_at } => {
                let window = seconds_between(last_accepted_at, sample.timestamp);
                if sample.is_reliable(self.config.max_accuracy)
                    && window > self.config.min_time_window
                {
                    let smoothed = self.estimator.process(sample);
                    self.state = GateState::FilterActive {
                        last_accepted_at: sample.timestamp,
                    };
                    ledger.append_point(smoothed)?;
                    self.bump_distance(ledger, sample.point, smoothed)?;
                    SampleOutcome::AcceptedFiltered { smoothed }
                } else if window > self.config.max_time_window {
                    self.warn_stale(sample)
                } else if !sample.is_reliable(self.config.max_accuracy) {
                    SampleOutcome::Discarded(DiscardReason::Unreliable)
                } else {
                    SampleOutcome::Discarded(DiscardReason::TooSoon)
                }
            }
        };

        tracing::debug!(outcome = ?outcome, "sample evaluated");
        Ok(outcome)
    }

    /// Replace the thresholds; takes effect with the next sample.
    pub fn set_config(&mut self, config: GateConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Current thresholds.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Current gating state.
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Most recent valid reading seen, in any state.
    pub fn last_known(&self) -> Option<&LocationSample> {
        self.last_known.as_ref()
    }

    /// True while a tracking session is active.
    pub fn is_tracking(&self) -> bool {
        !matches!(self.state, GateState::Idle)
    }

    /// Swap the event sink.
    pub fn set_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    /// Swap the estimator. The replacement starts unseeded.
    pub fn set_estimator(&mut self, estimator: Box<dyn PositionEstimator>) {
        self.estimator = estimator;
        self.estimator_initialized = false;
    }

    /// Drop session-scoped gate state: back to idle, reference and last
    /// known position cleared. The estimator survives.
    pub fn reset(&mut self) {
        self.state = GateState::Idle;
        self.tracking_reference = None;
        self.last_known = None;
    }

    /// Seed (or re-seed) the estimator from `sample`, then accept it or hold
    /// it back on accuracy.
    fn seed_estimator(
        &mut self,
        ledger: &mut PathLedger,
        sample: &LocationSample,
    ) -> Result<SampleOutcome> {
        self.estimator.reset(sample);
        self.estimator_initialized = true;

        if sample.is_reliable(self.config.max_accuracy) {
            self.state = GateState::FilterActive {
                last_accepted_at: sample.timestamp,
            };
            // The provisional seed point is superseded by this first fix.
            ledger.replace_origin(sample.point)?;
            self.bump_distance(ledger, sample.point, sample.point)?;
            tracing::debug!(accuracy_m = sample.horizontal_accuracy, "estimator seeded");
            Ok(SampleOutcome::AcceptedRaw)
        } else {
            self.state = GateState::FilterPendingReset {
                last_accepted_at: sample.timestamp,
            };
            tracing::debug!(
                accuracy_m = sample.horizontal_accuracy,
                "estimator seeded from an unreliable fix, holding back"
            );
            Ok(SampleOutcome::Discarded(DiscardReason::Unreliable))
        }
    }

    /// Displacement gate after an accept: record distance from the reference
    /// to the accepted position when it moved at least `min_distance`, then
    /// advance the reference to the raw sample position.
    fn bump_distance(
        &mut self,
        ledger: &mut PathLedger,
        raw: GeoPoint,
        accepted: GeoPoint,
    ) -> Result<()> {
        if let Some(reference) = self.tracking_reference {
            let displacement = reference.distance_to(&accepted);
            if displacement >= self.config.min_distance {
                ledger.record_distance(displacement)?;
            }
        }
        self.tracking_reference = Some(raw);
        Ok(())
    }

    fn is_stale(&self, last_accepted_at: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        seconds_between(last_accepted_at, at) > self.config.max_time_window
    }

    /// Publish a low-accuracy warning; the state is left untouched.
    fn warn_stale(&self, sample: &LocationSample) -> SampleOutcome {
        tracing::warn!(
            accuracy_m = sample.horizontal_accuracy,
            "no reliable fix within the maximum time window"
        );
        self.sink.publish(TrackingEvent::LowAccuracyWarning {
            timestamp: sample.timestamp,
        });
        SampleOutcome::Discarded(DiscardReason::Stale)
    }
}

/// Signed seconds from `earlier` to `later`; negative when time regressed.
fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}
