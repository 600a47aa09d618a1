//! Operator API DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use botgate::{Messenger, ProfileInfo};

/// Messenger state as returned by the operator routes. The token itself
/// never leaves the server; only its hash (the webhook address) does.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessengerResponse {
    pub id: Uuid,
    pub title: String,
    pub platform: String,
    /// Webhook path under the public base URL.
    pub webhook_path: String,
    /// Whether the provider-side webhook is currently registered.
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl MessengerResponse {
    pub fn from_domain(messenger: Messenger) -> Self {
        Self {
            id: messenger.id,
            title: messenger.title.clone(),
            platform: messenger.platform.to_string(),
            webhook_path: messenger.webhook_path(),
            is_active: messenger.is_active,
            updated_at: messenger.updated_at,
        }
    }
}

/// Provider profile passthrough for diagnostics.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    /// Raw provider payload.
    #[schema(value_type = Object)]
    pub info: serde_json::Value,
}

impl ProfileResponse {
    pub fn from_domain(profile: ProfileInfo) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            avatar: profile.avatar,
            info: profile.info,
        }
    }
}
