//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::{Broadcaster, ConnectionRegistry};
use crate::service::RatesService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ingress point for upstream rate data.
    pub rates_service: RatesService,
    /// Registry of live WebSocket connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Outbound queue capacity for each new connection.
    pub outbound_buffer: usize,
}

impl AppState {
    /// Wires a service and broadcaster around `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, outbound_buffer: usize) -> Self {
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            rates_service: RatesService::new(broadcaster),
            registry,
            outbound_buffer,
        }
    }
}
