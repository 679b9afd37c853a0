//! Rate publication endpoint.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{PublishRatesRequest, PublishRatesResponse};
use crate::app_state::AppState;
use crate::domain::EventType;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /rates` — Broadcast a rate table to every connected client.
///
/// # Errors
///
/// Returns [`GatewayError`] if the body is malformed or a rate is invalid.
#[utoipa::path(
    post,
    path = "/api/v1/rates",
    tag = "Rates",
    summary = "Publish rates",
    description = "Broadcasts a RATES_UPDATE event carrying the given rate table to every connected WebSocket client.",
    request_body = PublishRatesRequest,
    responses(
        (status = 202, description = "Event dispatched", body = PublishRatesResponse),
        (status = 400, description = "Invalid rate table", body = ErrorResponse),
    )
)]
pub async fn publish_rates(
    State(state): State<AppState>,
    body: Result<Json<PublishRatesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    req.validate()?;

    let data = serde_json::to_value(&req.rates).map_err(|e| GatewayError::Internal(e.to_string()))?;
    let report = state.rates_service.publish_rates(data);

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishRatesResponse {
            event_type: EventType::RatesUpdate,
            recipients: report.recipients,
            timestamp: report.timestamp,
        }),
    ))
}

/// Rate routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/rates", post(publish_rates))
}
