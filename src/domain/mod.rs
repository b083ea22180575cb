//! Domain value types for track recording.
//!
//! Everything here is a plain immutable value or an event:
//! - **Value objects**: [`GeoPoint`], [`LocationSample`], [`PathSegment`]
//! - **Events**: [`TrackingEvent`] and the [`EventSink`] egress trait

pub mod events;
pub mod point;
pub mod sample;
pub mod segment;

// Re-export all domain types
pub use events::{BroadcastSink, EventSink, InMemoryEventLog, NullSink, TrackingEvent};
pub use point::GeoPoint;
pub use sample::LocationSample;
pub use segment::{DistanceUnit, PathSegment};
