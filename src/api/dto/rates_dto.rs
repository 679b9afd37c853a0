//! Rate publication DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EventType;
use crate::error::GatewayError;

/// Request body for `POST /api/v1/rates`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishRatesRequest {
    /// Currency code to rate, e.g. `{"USD": 1.0, "EUR": 0.9}`.
    pub rates: BTreeMap<String, f64>,
}

impl PublishRatesRequest {
    /// Checks that the table is non-empty, codes are non-blank and every
    /// rate is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty table or blank
    /// code, and [`GatewayError::InvalidRate`] for a bad value.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.rates.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "rates must not be empty".to_string(),
            ));
        }
        for (currency, &value) in &self.rates {
            if currency.trim().is_empty() {
                return Err(GatewayError::InvalidRequest(
                    "currency code must not be blank".to_string(),
                ));
            }
            if !value.is_finite() || value < 0.0 {
                return Err(GatewayError::InvalidRate {
                    currency: currency.clone(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Response body for `POST /api/v1/rates`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishRatesResponse {
    /// Tag of the broadcast event.
    pub event_type: EventType,
    /// Number of connections the event was dispatched to.
    pub recipients: usize,
    /// Dispatch timestamp carried in the event.
    pub timestamp: DateTime<Utc>,
}
