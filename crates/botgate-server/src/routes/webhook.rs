//! Inbound webhook route
//!
//! One endpoint per messenger, addressed by its token hash. The response
//! policy follows the providers' retry behavior: only verification
//! failures and unknown addresses get error statuses; once a payload is
//! accepted, downstream failures are logged and answered with success so
//! the provider does not retry-storm an already-processed delivery.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{error, warn};

use botgate::{GatewayError, MessengerRepository};

use crate::AppState;

/// Signature header sent by Viber with every callback.
const VIBER_SIGNATURE_HEADER: &str = "X-Viber-Content-Signature";

/// Receive one platform webhook delivery.
#[utoipa::path(
    post,
    path = "/bot/{hash}",
    params(
        ("hash" = String, Path, description = "Messenger token hash")
    ),
    request_body = String,
    responses(
        (status = 200, description = "Processed, synchronous reply attached"),
        (status = 204, description = "Processed"),
        (status = 403, description = "Payload failed verification"),
        (status = 404, description = "Unknown webhook address")
    ),
    tag = "Webhook"
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let messenger = match state.messengers.find_by_hash(&hash).await {
        Ok(Some(messenger)) => messenger,
        Ok(None) => {
            warn!(%hash, "webhook for unknown messenger");
            return (StatusCode::NOT_FOUND, "Webhook not found.").into_response();
        }
        Err(error) => {
            error!(%hash, %error, "messenger lookup failed");
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    let adapter = match state.adapters.for_messenger(&messenger).await {
        Ok(adapter) => adapter,
        Err(error) => {
            error!(messenger_id = %messenger.id, %error, "adapter construction failed");
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    let signature = headers
        .get(VIBER_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    // The dispatch runs detached: a request cancelled at the transport
    // layer only loses its synchronous response, never the side effects
    // of an already-accepted delivery.
    let dispatcher = state.dispatcher.clone();
    let messenger_id = messenger.id;
    let task = tokio::spawn(async move {
        let result = dispatcher
            .dispatch(&messenger, adapter.as_ref(), &body, signature.as_deref())
            .await;
        (result, messenger)
    });

    let (result, messenger) = match task.await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!(messenger_id = %messenger_id, %join_error, "webhook dispatch panicked");
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    match result {
        Ok(Some(reply)) => (StatusCode::OK, Json(reply)).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(GatewayError::Verification(reason)) => {
            warn!(messenger_id = %messenger.id, %reason, "webhook payload rejected");
            (StatusCode::FORBIDDEN, "Verification failed.").into_response()
        }
        Err(error) => {
            error!(
                messenger_id = %messenger.id,
                platform = %messenger.platform,
                %error,
                "webhook dispatch failed"
            );
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/bot/:hash", post(receive_webhook))
}
