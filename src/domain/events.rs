//! Tracking lifecycle events and the sinks that carry them out.

use chrono::{DateTime, Utc};

/// Events published by the tracking pipeline.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackingEvent {
    /// No reliable fix arrived within the configured maximum time window.
    LowAccuracyWarning {
        /// When the stale stretch was detected.
        timestamp: DateTime<Utc>,
    },

    /// A tracking session started.
    TrackingStarted {
        /// True when the new segment was seeded from the last known position.
        continued: bool,
        /// When the session started.
        timestamp: DateTime<Utc>,
    },

    /// The current tracking session ended.
    TrackingEnded {
        /// When the session ended.
        timestamp: DateTime<Utc>,
    },
}

impl TrackingEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::LowAccuracyWarning { timestamp } => *timestamp,
            Self::TrackingStarted { timestamp, .. } => *timestamp,
            Self::TrackingEnded { timestamp } => *timestamp,
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LowAccuracyWarning { .. } => "LowAccuracyWarning",
            Self::TrackingStarted { .. } => "TrackingStarted",
            Self::TrackingEnded { .. } => "TrackingEnded",
        }
    }
}

/// Egress for tracking events.
///
/// Publishing is infallible: a sink that can lose events (detached receivers,
/// full channels) drops them silently rather than disturbing the gating path.
pub trait EventSink: Send + Sync {
    /// Publish one event.
    fn publish(&self, event: TrackingEvent);
}

/// Sink that keeps every published event in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: parking_lot::RwLock<Vec<TrackingEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events in publish order.
    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events.read().clone()
    }

    /// Events at or after `timestamp`.
    pub fn since(&self, timestamp: DateTime<Utc>) -> Vec<TrackingEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.timestamp() >= timestamp)
            .cloned()
            .collect()
    }

    /// Number of events published so far.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// True when nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, event: TrackingEvent) {
        self.events.write().push(event);
    }
}

/// Sink that fans events out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: tokio::sync::broadcast::Sender<TrackingEvent>,
}

impl BroadcastSink {
    /// Create a sink with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe a new receiver.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TrackingEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: TrackingEvent) {
        // A send error means no receiver is subscribed; the event is dropped.
        let _ = self.sender.send(event);
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: TrackingEvent) {}
}
