//! Event — an immutable record of something that happened.
//!
//! Events are produced when devices register, measurers report, the
//! operator changes a setting, and when the controller broadcasts status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::device::DeviceIdentity;

/// UTC timestamp attached to events.
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventId(uuid::Uuid);

impl EventId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What kind of thing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DeviceRegistered,
    MeasurementReported,
    StatusReported,
    PreferenceChanged,
    AccuracyChanged,
    OutsideTemperatureChanged,
    PowerFactorRequested,
    SystemStopping,
}

/// A single event with an optional originating device and a JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub device: Option<DeviceIdentity>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(
        event_type: EventType,
        device: Option<DeviceIdentity>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            device,
            data,
            timestamp: Utc::now(),
        }
    }
}
