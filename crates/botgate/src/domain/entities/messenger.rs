//! Messenger Entity
//!
//! Per-tenant platform binding: one configured bot on one platform,
//! addressed from outside by the stable hash of its token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::value_objects::PlatformType;

/// A configured bot instance on one messaging platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messenger {
    pub id: Uuid,
    /// Used as the sender name on platforms that display one.
    pub title: String,
    pub platform: PlatformType,
    /// Provider bot token / secret key. Also the HMAC key for platforms
    /// that sign webhook bodies.
    pub token: String,
    /// Optional outbound proxy URI.
    pub proxy: Option<String>,
    /// Avatar/logo URL; required by some platforms (Viber).
    pub logo: Option<String>,
    /// Sent in response to a conversation-opened event when set.
    pub welcome_text: Option<String>,
    /// Fallback handler for messages that hit no menu or button.
    pub handler: String,
    /// Root menu assigned to newly created accounts.
    pub menu_id: Option<Uuid>,
    /// Stable hash of the token, used as the webhook path segment.
    pub token_hash: String,
    /// Mirrors whether the provider-side webhook is currently registered.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Messenger {
    pub fn new(
        title: impl Into<String>,
        platform: PlatformType,
        token: impl Into<String>,
    ) -> Self {
        let token = token.into();
        let token_hash = hash_token(&token);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            platform,
            token,
            proxy: None,
            logo: None,
            welcome_text: None,
            handler: crate::registry::ECHO_HANDLER.to_string(),
            menu_id: None,
            token_hash,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    pub fn with_welcome_text(mut self, welcome_text: impl Into<String>) -> Self {
        self.welcome_text = Some(welcome_text.into());
        self
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = handler.into();
        self
    }

    pub fn with_root_menu(mut self, menu_id: Uuid) -> Self {
        self.menu_id = Some(menu_id);
        self
    }

    /// Webhook path for this messenger under the public base URL.
    pub fn webhook_path(&self) -> String {
        format!("/bot/{}", self.token_hash)
    }
}

/// SHA-256 hex of the token. Stable across restarts, safe to expose in URLs.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_is_stable_hex() {
        let a = Messenger::new("Support", PlatformType::Telegram, "123:abc");
        let b = Messenger::new("Other", PlatformType::Viber, "123:abc");

        assert_eq!(a.token_hash, b.token_hash);
        assert_eq!(a.token_hash.len(), 64);
        assert!(a.token_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_webhook_path_uses_token_hash() {
        let messenger = Messenger::new("Support", PlatformType::Telegram, "123:abc");
        assert_eq!(
            messenger.webhook_path(),
            format!("/bot/{}", messenger.token_hash)
        );
    }
}
