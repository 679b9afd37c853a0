//! Domain layer: connection handles, the connection registry, broadcast
//! payloads and the broadcaster.
//!
//! Nothing here knows about axum or WebSocket framing. The `ws` layer
//! adapts sockets to [`ConnectionHandle`]s and the service layer turns
//! upstream data into [`BroadcastPayload`]s.

pub mod broadcaster;
pub mod connection;
pub mod connection_id;
pub mod payload;
pub mod registry;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use connection::{ConnectionHandle, ReadyState};
pub use connection_id::ConnectionId;
pub use payload::{BroadcastPayload, Envelope, EventType};
pub use registry::ConnectionRegistry;
