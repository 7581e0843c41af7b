use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::gateways::{konnect, stripe};
use crate::AppState;

/// Konnect notifications are unsigned; the service resolves the reported
/// reference against the payments API before acting on it.
pub async fn konnect_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match state
        .payment_service
        .handle_webhook(konnect::PROVIDER, &body, None)
        .await
    {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok());
    match state
        .payment_service
        .handle_webhook(stripe::PROVIDER, &body, signature)
        .await
    {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => e.into_response(),
    }
}
