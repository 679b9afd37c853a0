//! Broadcast payloads and the envelope they are sealed into.
//!
//! A [`BroadcastPayload`] is what the ingress layer hands to the
//! broadcaster. It carries no timestamp; the broadcaster stamps it when it
//! seals it into an [`Envelope`], immediately before fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Discriminator for outbound events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// New exchange rates are available.
    RatesUpdate,
}

impl EventType {
    /// Returns the wire tag as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RatesUpdate => "RATES_UPDATE",
        }
    }
}

/// Immutable event to be delivered to every registered connection.
///
/// `data` is opaque to the broadcaster; its shape is owned by whoever
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastPayload {
    event_type: EventType,
    data: serde_json::Value,
}

impl BroadcastPayload {
    /// Creates a payload with the given tag and body.
    #[must_use]
    pub const fn new(event_type: EventType, data: serde_json::Value) -> Self {
        Self { event_type, data }
    }

    /// Creates a `RATES_UPDATE` payload.
    #[must_use]
    pub const fn rates_update(rates: serde_json::Value) -> Self {
        Self::new(EventType::RatesUpdate, rates)
    }

    /// Returns the event tag.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Returns the opaque body.
    #[must_use]
    pub const fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Stamps the payload with `timestamp`, producing the wire envelope.
    #[must_use]
    pub fn seal(&self, timestamp: DateTime<Utc>) -> Envelope<'_> {
        Envelope {
            event_type: self.event_type,
            data: &self.data,
            timestamp,
        }
    }
}

/// Outbound frame shape:
///
/// ```json
/// { "type": "RATES_UPDATE", "data": { "USD": 1.0 }, "timestamp": "2026-01-01T00:00:00Z" }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    /// Event tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Opaque body, borrowed from the payload.
    pub data: &'a serde_json::Value,
    /// Dispatch time.
    pub timestamp: DateTime<Utc>,
}
