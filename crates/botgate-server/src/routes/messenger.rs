//! Operator routes for messenger webhook switching and diagnostics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use botgate::MessengerRepository;

use crate::models::{MessengerResponse, ProfileResponse};
use crate::AppState;

/// Register the messenger's webhook with its provider.
#[utoipa::path(
    post,
    path = "/messengers/{id}/activate",
    params(
        ("id" = Uuid, Path, description = "Messenger ID")
    ),
    responses(
        (status = 200, description = "Webhook registered", body = MessengerResponse),
        (status = 404, description = "Messenger not found"),
        (status = 502, description = "Provider rejected the registration"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Messenger"
)]
pub async fn activate_messenger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessengerResponse>, (StatusCode, String)> {
    let mut messenger = find_messenger(&state, id).await?;

    let adapter = state
        .adapters
        .for_messenger(&messenger)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let url = format!("{}{}", state.public_url, messenger.webhook_path());
    adapter
        .enable_webhook(&url)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    state
        .messengers
        .set_active(id, true)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    messenger.is_active = true;

    info!(messenger_id = %id, %url, "webhook activated");
    Ok(Json(MessengerResponse::from_domain(messenger)))
}

/// Remove the messenger's webhook registration from its provider.
#[utoipa::path(
    post,
    path = "/messengers/{id}/deactivate",
    params(
        ("id" = Uuid, Path, description = "Messenger ID")
    ),
    responses(
        (status = 200, description = "Webhook removed", body = MessengerResponse),
        (status = 404, description = "Messenger not found"),
        (status = 502, description = "Provider rejected the removal"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Messenger"
)]
pub async fn deactivate_messenger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessengerResponse>, (StatusCode, String)> {
    let mut messenger = find_messenger(&state, id).await?;

    let adapter = state
        .adapters
        .for_messenger(&messenger)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    adapter
        .disable_webhook()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    state
        .messengers
        .set_active(id, false)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    messenger.is_active = false;

    // The token may be rotated while the webhook is down; rebuild the
    // adapter on the next use.
    state.adapters.invalidate(id).await;

    info!(messenger_id = %id, "webhook deactivated");
    Ok(Json(MessengerResponse::from_domain(messenger)))
}

/// Provider-side bot profile, for diagnostics.
#[utoipa::path(
    get,
    path = "/messengers/{id}/profile",
    params(
        ("id" = Uuid, Path, description = "Messenger ID")
    ),
    responses(
        (status = 200, description = "Provider profile", body = ProfileResponse),
        (status = 404, description = "Messenger not found"),
        (status = 502, description = "Provider call failed"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Messenger"
)]
pub async fn messenger_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let messenger = find_messenger(&state, id).await?;

    let adapter = state
        .adapters
        .for_messenger(&messenger)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let profile = adapter
        .account_info()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(ProfileResponse::from_domain(profile)))
}

async fn find_messenger(
    state: &AppState,
    id: Uuid,
) -> Result<botgate::Messenger, (StatusCode, String)> {
    state
        .messengers
        .find_by_id(id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Messenger not found".to_string()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messengers/:id/activate", post(activate_messenger))
        .route("/messengers/:id/deactivate", post(deactivate_messenger))
        .route("/messengers/:id/profile", get(messenger_profile))
}
