//! Sample gating and position estimation.
//!
//! Implements three collaborating components:
//!
//! - **[`LocationGate`]** — per-sample state machine (idle/raw/filtered)
//! - **[`PositionEstimator`]** — smoothing seam the gate drives
//! - **[`KalmanSmoother`]** — constant-velocity filter behind that seam
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use trackgate::domain::NullSink;
//! use trackgate::ledger::PathLedger;
//! use trackgate::tracking::{GateConfig, KalmanSmoother, LocationGate};
//!
//! let mut gate = LocationGate::new(
//!     GateConfig { use_filter: true, ..GateConfig::default() },
//!     Box::new(KalmanSmoother::default()),
//!     Arc::new(NullSink),
//! ).unwrap();
//! let mut ledger = PathLedger::new();
//! gate.start_tracking(&mut ledger, false, Utc::now());
//! ```

pub mod estimator;
pub mod gate;
pub mod kalman;

pub use estimator::PositionEstimator;
pub use gate::{DiscardReason, GateConfig, GateState, LocationGate, SampleOutcome};
pub use kalman::{KalmanConfig, KalmanSmoother};
