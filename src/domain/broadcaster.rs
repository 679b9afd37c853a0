//! Fan-out of broadcast payloads to every registered connection.
//!
//! [`Broadcaster::broadcast`] stamps the payload, serializes it once into a
//! shared [`Frame`], takes a registry snapshot and enqueues the frame on
//! each open handle. Delivery is fire-and-forget: a handle that is closing,
//! whose queue is full, or whose task is gone is counted and skipped, and
//! the loop moves on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::connection::{Frame, SendError};
use super::{BroadcastPayload, ConnectionHandle, ConnectionRegistry};

/// Aggregate outcome of one broadcast pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Number of handles in the snapshot.
    pub recipients: usize,
    /// Open handles a send was attempted on.
    pub attempted: usize,
    /// Handles whose queue accepted the frame.
    pub delivered: usize,
    /// Handles skipped because they were no longer open.
    pub skipped: usize,
    /// Attempted handles that rejected the frame.
    pub failed: usize,
    /// Dispatch timestamp stamped into the envelope.
    pub timestamp: DateTime<Utc>,
}

impl BroadcastReport {
    fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            recipients: 0,
            attempted: 0,
            delivered: 0,
            skipped: 0,
            failed: 0,
            timestamp,
        }
    }
}

/// Delivers payloads to a snapshot of the [`ConnectionRegistry`].
///
/// Cheap to clone; every clone shares the same registry.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Creates a broadcaster over the given registry.
    #[must_use]
    pub const fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry this broadcaster reads from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Delivers `payload` to every connection registered at call time.
    ///
    /// Never fails as a whole; per-connection failures show up only in the
    /// returned counts.
    pub fn broadcast(&self, payload: &BroadcastPayload) -> BroadcastReport {
        let timestamp = Utc::now();
        let frame: Frame = match serde_json::to_string(&payload.seal(timestamp)) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::warn!(
                    event_type = payload.event_type().as_str(),
                    error = %e,
                    "failed to serialize broadcast payload"
                );
                return BroadcastReport::empty(timestamp);
            }
        };

        let snapshot = self.registry.snapshot();
        let report = deliver(&snapshot, &frame, timestamp);
        tracing::debug!(
            event_type = payload.event_type().as_str(),
            recipients = report.recipients,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "broadcast event"
        );
        report
    }
}

/// Enqueues `frame` on every open handle of `snapshot`.
///
/// Handles that closed after the snapshot was taken are skipped.
pub fn deliver(
    snapshot: &[Arc<ConnectionHandle>],
    frame: &Frame,
    timestamp: DateTime<Utc>,
) -> BroadcastReport {
    let mut report = BroadcastReport::empty(timestamp);
    report.recipients = snapshot.len();

    for handle in snapshot {
        if !handle.is_open() {
            report.skipped += 1;
            continue;
        }
        report.attempted += 1;
        match handle.try_send(Arc::clone(frame)) {
            Ok(()) => report.delivered += 1,
            // Raced with the connection task closing the handle.
            Err(SendError::NotOpen(_)) => {
                report.attempted -= 1;
                report.skipped += 1;
            }
            Err(e @ SendError::QueueFull) => {
                report.failed += 1;
                tracing::warn!(
                    conn_id = %handle.id(),
                    dropped = handle.dropped_frames(),
                    error = %e,
                    "dropping frame for slow client"
                );
            }
            Err(e @ SendError::QueueClosed) => {
                report.failed += 1;
                tracing::debug!(conn_id = %handle.id(), error = %e, "client task already gone");
            }
        }
    }
    report
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn make_connection(capacity: usize) -> (Arc<ConnectionHandle>, mpsc::Receiver<Frame>) {
        let (handle, rx) = ConnectionHandle::open(None, capacity);
        (Arc::new(handle), rx)
    }

    fn rates() -> BroadcastPayload {
        BroadcastPayload::rates_update(serde_json::json!({"USD": 1.0, "EUR": 0.9}))
    }

    fn parse(frame: &Frame) -> serde_json::Value {
        serde_json::from_str(frame).unwrap_or_else(|e| panic!("invalid frame json: {e}"))
    }

    #[test]
    fn empty_registry_is_a_noop() {
        let broadcaster = Broadcaster::new(Arc::new(ConnectionRegistry::new()));
        let report = broadcaster.broadcast(&rates());
        assert_eq!(report.recipients, 0);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn fans_out_to_all_open_connections() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (handle, rx) = make_connection(4);
            registry.add(handle);
            receivers.push(rx);
        }

        let report = Broadcaster::new(Arc::clone(&registry)).broadcast(&rates());
        assert_eq!(report.recipients, 3);
        assert_eq!(report.delivered, 3);

        for rx in &mut receivers {
            let Ok(frame) = rx.try_recv() else {
                panic!("each connection should receive one frame");
            };
            let json = parse(&frame);
            assert_eq!(json["type"], "RATES_UPDATE");
            assert_eq!(json["data"], serde_json::json!({"USD": 1.0, "EUR": 0.9}));
            assert!(json["timestamp"].is_string());
            assert!(rx.try_recv().is_err(), "exactly one frame per broadcast");
        }
    }

    #[test]
    fn failing_connection_does_not_stop_the_others() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (first, mut rx_first) = make_connection(4);
        let (broken, rx_broken) = make_connection(4);
        let (last, mut rx_last) = make_connection(4);
        drop(rx_broken);
        registry.add(first);
        registry.add(broken);
        registry.add(last);

        let report = Broadcaster::new(registry).broadcast(&rates());
        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        assert!(rx_first.try_recv().is_ok());
        assert!(rx_last.try_recv().is_ok());
    }

    #[test]
    fn slow_connection_drops_frames_without_blocking() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (slow, _rx_slow) = make_connection(1);
        let (fast, mut rx_fast) = make_connection(8);
        registry.add(Arc::clone(&slow));
        registry.add(fast);

        let broadcaster = Broadcaster::new(registry);
        let first = broadcaster.broadcast(&rates());
        let second = broadcaster.broadcast(&rates());

        assert_eq!(first.delivered, 2);
        assert_eq!(second.delivered, 1);
        assert_eq!(second.failed, 1);
        assert_eq!(slow.dropped_frames(), 1);
        assert!(rx_fast.try_recv().is_ok());
        assert!(rx_fast.try_recv().is_ok());
    }

    #[test]
    fn removed_connection_receives_nothing_further() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (handle, mut rx) = make_connection(4);
        let id = handle.id();
        registry.add(handle);

        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        assert_eq!(broadcaster.broadcast(&rates()).delivered, 1);
        registry.remove(id);
        assert_eq!(broadcaster.broadcast(&rates()).recipients, 0);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn connection_closed_after_snapshot_is_skipped() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (h1, mut rx1) = make_connection(4);
        let (h2, mut rx2) = make_connection(4);
        registry.add(Arc::clone(&h1));
        registry.add(Arc::clone(&h2));

        let snapshot = registry.snapshot();
        h2.begin_close();
        h2.mark_closed();
        registry.remove(h2.id());

        let frame: Frame = Arc::from("{}");
        let report = deliver(&snapshot, &frame, Utc::now());
        assert_eq!(report.recipients, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn sequential_broadcasts_keep_per_connection_order() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (handle, mut rx) = make_connection(8);
        registry.add(handle);

        let broadcaster = Broadcaster::new(registry);
        for n in 0..5 {
            broadcaster.broadcast(&BroadcastPayload::rates_update(serde_json::json!({ "seq": n })));
        }
        for n in 0..5 {
            let Ok(frame) = rx.try_recv() else {
                panic!("missing frame {n}");
            };
            assert_eq!(parse(&frame)["data"]["seq"], n);
        }
    }
}
