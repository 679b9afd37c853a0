//! Handle to one live client connection.
//!
//! A [`ConnectionHandle`] does not own the socket. The per-connection task
//! owns the socket and drains the receiving half of the handle's bounded
//! outbound queue; the handle only enqueues serialized frames and exposes
//! the connection's readiness so the broadcaster can skip stale peers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ConnectionId;

/// A serialized outbound frame, shared by every recipient of a broadcast.
pub type Frame = Arc<str>;

/// Readiness of a connection, mirroring the WebSocket `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// Accepting outbound frames.
    Open,
    /// Close handshake in progress; no further frames are accepted.
    Closing,
    /// Transport is gone.
    Closed,
}

impl ReadyState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Closing => 1,
            Self::Closed => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Why a frame could not be enqueued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The connection is no longer open.
    #[error("connection is not open ({0:?})")]
    NotOpen(ReadyState),

    /// The outbound queue is at capacity; the peer is not keeping up.
    #[error("outbound queue full")]
    QueueFull,

    /// The connection task has exited and dropped its receiver.
    #[error("outbound queue closed")]
    QueueClosed,
}

/// Non-owning handle to one accepted client transport.
///
/// Shared as `Arc<ConnectionHandle>` between the registry and the
/// connection task. State transitions only move forward
/// (`Open → Closing → Closed`).
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    connected_at: DateTime<Utc>,
    state: AtomicU8,
    sender: mpsc::Sender<Frame>,
    dropped_frames: AtomicU64,
}

impl ConnectionHandle {
    /// Creates an open handle with an outbound queue of `capacity` frames.
    ///
    /// Returns the handle together with the receiving half of its queue,
    /// which the connection task forwards to the socket. A capacity of zero
    /// is raised to one.
    #[must_use]
    pub fn open(peer: Option<SocketAddr>, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            peer,
            connected_at: Utc::now(),
            state: AtomicU8::new(ReadyState::Open.as_u8()),
            sender,
            dropped_frames: AtomicU64::new(0),
        };
        (handle, receiver)
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the remote address, when the transport exposed one.
    #[must_use]
    pub const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Returns the time the connection was accepted.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns the current readiness state.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` while the handle accepts outbound frames.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Number of frames dropped because the outbound queue was full.
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Enqueues a frame without waiting.
    ///
    /// The frame is either queued whole or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotOpen`] if the handle has started closing,
    /// [`SendError::QueueFull`] if the peer's queue is at capacity, and
    /// [`SendError::QueueClosed`] if the connection task is gone.
    pub fn try_send(&self, frame: Frame) -> Result<(), SendError> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            return Err(SendError::NotOpen(state));
        }
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                Err(SendError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(SendError::QueueClosed),
        }
    }

    /// Moves `Open → Closing`. Returns `false` if the handle was not open.
    pub fn begin_close(&self) -> bool {
        self.state
            .compare_exchange(
                ReadyState::Open.as_u8(),
                ReadyState::Closing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Moves to `Closed`. Returns `true` only for the call that made the
    /// transition.
    pub fn mark_closed(&self) -> bool {
        self.state.swap(ReadyState::Closed.as_u8(), Ordering::AcqRel) != ReadyState::Closed.as_u8()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn frame(text: &str) -> Frame {
        Arc::from(text)
    }

    #[test]
    fn new_handle_is_open() {
        let (handle, _rx) = ConnectionHandle::open(None, 4);
        assert_eq!(handle.ready_state(), ReadyState::Open);
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn try_send_enqueues_frame() {
        let (handle, mut rx) = ConnectionHandle::open(None, 4);
        assert_eq!(handle.try_send(frame("hello")), Ok(()));
        let Some(received) = rx.recv().await else {
            panic!("expected a frame");
        };
        assert_eq!(&*received, "hello");
    }

    #[test]
    fn full_queue_rejects_and_counts_drop() {
        let (handle, _rx) = ConnectionHandle::open(None, 1);
        assert_eq!(handle.try_send(frame("a")), Ok(()));
        assert_eq!(handle.try_send(frame("b")), Err(SendError::QueueFull));
        assert_eq!(handle.dropped_frames(), 1);
    }

    #[test]
    fn dropped_receiver_reports_closed_queue() {
        let (handle, rx) = ConnectionHandle::open(None, 4);
        drop(rx);
        assert_eq!(handle.try_send(frame("a")), Err(SendError::QueueClosed));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (handle, _rx) = ConnectionHandle::open(None, 0);
        assert_eq!(handle.try_send(frame("a")), Ok(()));
    }

    #[test]
    fn closing_handle_rejects_sends() {
        let (handle, _rx) = ConnectionHandle::open(None, 4);
        assert!(handle.begin_close());
        assert_eq!(
            handle.try_send(frame("a")),
            Err(SendError::NotOpen(ReadyState::Closing))
        );
    }

    #[test]
    fn state_transitions_happen_once() {
        let (handle, _rx) = ConnectionHandle::open(None, 4);
        assert!(handle.begin_close());
        assert!(!handle.begin_close());
        assert!(handle.mark_closed());
        assert!(!handle.mark_closed());
        assert!(!handle.begin_close());
        assert_eq!(handle.ready_state(), ReadyState::Closed);
    }
}
