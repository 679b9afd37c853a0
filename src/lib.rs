//! # rates-gateway
//!
//! Real-time notification hub that fans out exchange-rate updates to every
//! connected WebSocket client.
//!
//! Clients connect to `/ws` and stay registered until they close or their
//! transport fails. Upstream data arrives through `POST /api/v1/rates`
//! (or [`service::RatesService::publish_rates`] when embedded) and is
//! broadcast as a `RATES_UPDATE` envelope to a snapshot of the registry.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)          Upstream (HTTP)
//!     │                            │
//!     ├── WS Handler (ws/)         ├── REST Handlers (api/)
//!     │                            │
//!     │                            ├── RatesService (service/)
//!     │                            │
//!     │                            ├── Broadcaster (domain/)
//!     │                            │
//!     └────────── ConnectionRegistry (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
