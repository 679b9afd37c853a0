//! WebSocket layer: upgrade handling and per-connection lifecycle.
//!
//! Clients connect to `/ws` and receive every broadcast event as a JSON
//! text frame until they disconnect. Inbound data frames are ignored.

pub mod connection;
pub mod handler;
