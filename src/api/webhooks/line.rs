//! LINE webhook handler
//!
//! Verifies the body signature, then hands every event to the bot before
//! acknowledging the delivery.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, http::StatusCode};

use crate::api::ApiState;
use crate::channels::line::signature::{self, SIGNATURE_HEADER};
use crate::channels::line::types::WebhookEnvelope;
use crate::events::InboundEvent;

/// Handle a LINE webhook delivery
///
/// 400 on a missing or bad signature or an unparseable body; otherwise 200
/// `OK` after all events were handled, whatever their outcome.
pub async fn handle_callback(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let Some(sig) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("webhook without signature header");
        return (StatusCode::BAD_REQUEST, "Bad Request");
    };

    if let Err(e) = signature::verify(&state.channel_secret, &body, sig) {
        tracing::warn!(error = %e, "rejected webhook");
        return (StatusCode::BAD_REQUEST, "Bad Request");
    }

    tracing::debug!(body = %String::from_utf8_lossy(&body), "request body");

    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "rejected webhook");
            return (StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    let received = envelope.events.len();
    let events: Vec<InboundEvent> = envelope
        .events
        .into_iter()
        .filter_map(InboundEvent::from_webhook)
        .collect();

    tracing::info!(
        destination = ?envelope.destination,
        received,
        handled = events.len(),
        "webhook received"
    );

    let root_url = state.root_url(&headers);
    state.bot.dispatch(events, &root_url).await;

    (StatusCode::OK, "OK")
}

fn parse_envelope(body: &[u8]) -> crate::Result<WebhookEnvelope> {
    serde_json::from_slice(body).map_err(|e| crate::Error::Payload(e.to_string()))
}
