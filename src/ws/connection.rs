//! Per-connection lifecycle.
//!
//! Bridges one WebSocket to the [`ConnectionRegistry`]: registers a
//! [`ConnectionHandle`] on accept, forwards queued frames to the socket,
//! and deregisters on close or error.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::domain::{ConnectionHandle, ConnectionRegistry};

/// How a connection ended.
#[derive(Debug)]
enum Disconnect {
    /// Client sent a close frame or the stream ended.
    Closed,
    /// Reading from or writing to the socket failed.
    Error(axum::Error),
}

/// Keeps a handle registered for as long as it is alive.
///
/// Dropping the guard closes the handle and removes it from the registry,
/// so removal happens exactly once however the connection task ends.
#[derive(Debug)]
struct Registration {
    registry: Arc<ConnectionRegistry>,
    handle: Arc<ConnectionHandle>,
}

impl Registration {
    fn new(registry: Arc<ConnectionRegistry>, handle: Arc<ConnectionHandle>) -> Self {
        registry.add(Arc::clone(&handle));
        Self { registry, handle }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.handle.begin_close();
        self.handle.mark_closed();
        if self.registry.remove(self.handle.id()) {
            let connected_secs = (chrono::Utc::now() - self.handle.connected_at()).num_seconds();
            tracing::info!(
                conn_id = %self.handle.id(),
                peer = ?self.handle.peer(),
                connected_secs,
                clients = self.registry.len(),
                "client disconnected"
            );
        }
    }
}

/// Runs a single WebSocket connection until the client goes away.
///
/// - Registers the connection so broadcasts reach it.
/// - Writes every frame from the handle's outbound queue to the socket.
/// - Ignores inbound data frames; control frames are answered by axum.
/// - On close or transport error, deregisters the connection.
pub async fn run_connection(
    socket: WebSocket,
    peer: Option<SocketAddr>,
    registry: Arc<ConnectionRegistry>,
    outbound_capacity: usize,
) {
    let (handle, mut outbound_rx) = ConnectionHandle::open(peer, outbound_capacity);
    let handle = Arc::new(handle);
    let conn_id = handle.id();
    let _registration = Registration::new(Arc::clone(&registry), Arc::clone(&handle));
    tracing::info!(%conn_id, ?peer, clients = registry.len(), "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let outcome = loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break Disconnect::Closed,
                    Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                        tracing::debug!(%conn_id, "ignoring inbound client frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Disconnect::Error(e),
                }
            }
            // Frame queued by the broadcaster
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    break Disconnect::Closed;
                };
                if let Err(e) = ws_tx.send(Message::text(String::from(&*frame))).await {
                    break Disconnect::Error(e);
                }
            }
        }
    };

    handle.begin_close();
    match outcome {
        Disconnect::Closed => tracing::debug!(%conn_id, "client closed connection"),
        Disconnect::Error(e) => tracing::warn!(%conn_id, error = %e, "websocket error"),
    }
}
