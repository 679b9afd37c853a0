//! Rates service: turns upstream rate data into broadcasts.

use crate::domain::{BroadcastPayload, BroadcastReport, Broadcaster};

/// Ingress point for upstream data.
///
/// Stateless coordinator around a [`Broadcaster`]. Callers hand over data
/// that has already been fetched and validated; the service wraps it in a
/// payload and fans it out synchronously.
#[derive(Debug, Clone)]
pub struct RatesService {
    broadcaster: Broadcaster,
}

impl RatesService {
    /// Creates a new `RatesService`.
    #[must_use]
    pub const fn new(broadcaster: Broadcaster) -> Self {
        Self { broadcaster }
    }

    /// Returns a reference to the inner [`Broadcaster`].
    #[must_use]
    pub const fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Broadcasts a `RATES_UPDATE` event carrying `rates` to every
    /// connected client.
    pub fn publish_rates(&self, rates: serde_json::Value) -> BroadcastReport {
        self.publish(&BroadcastPayload::rates_update(rates))
    }

    /// Broadcasts an arbitrary payload to every connected client.
    pub fn publish(&self, payload: &BroadcastPayload) -> BroadcastReport {
        let report = self.broadcaster.broadcast(payload);
        tracing::info!(
            event_type = payload.event_type().as_str(),
            recipients = report.recipients,
            delivered = report.delivered,
            "event published"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{ConnectionHandle, ConnectionRegistry};

    #[test]
    fn publish_with_no_clients_succeeds() {
        let service = RatesService::new(Broadcaster::new(Arc::new(ConnectionRegistry::new())));
        let report = service.publish_rates(serde_json::json!({"USD": 1.0}));
        assert_eq!(report.recipients, 0);
    }

    #[tokio::test]
    async fn publish_rates_reaches_registered_client() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (handle, mut rx) = ConnectionHandle::open(None, 4);
        registry.add(Arc::new(handle));

        let service = RatesService::new(Broadcaster::new(registry));
        let before = chrono::Utc::now();
        let report = service.publish_rates(serde_json::json!({"USD": 1.0, "EUR": 0.9}));
        assert_eq!(report.delivered, 1);
        assert!(report.timestamp >= before);

        let Some(frame) = rx.recv().await else {
            panic!("expected a frame");
        };
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap_or_default();
        assert_eq!(json["type"], "RATES_UPDATE");
        assert_eq!(json["data"]["USD"], 1.0);
    }
}
