//! Account Entity
//!
//! One user's conversation state on one messenger platform. Created on the
//! first inbound message from an unseen (platform, user id) pair; never
//! hard-deleted by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::PlatformType;

/// Per-user, per-platform conversation state record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Platform this account lives on; (platform, user_id) is unique.
    pub platform: PlatformType,
    /// Platform-specific user id.
    pub user_id: String,
    pub username: Option<String>,
    /// Free-form profile map filled from the provider's user lookup.
    #[serde(default)]
    pub info: serde_json::Value,
    /// Conversation-local key/value scratch space for handlers.
    #[serde(default)]
    pub context: serde_json::Value,
    /// Owning messenger; survives messenger deletion as history.
    pub messenger_id: Option<Uuid>,
    /// Current menu pointer; None means "no active menu, use the
    /// messenger's fallback handler".
    pub menu_id: Option<Uuid>,
    /// Cleared when the platform reports the user unsubscribed.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(platform: PlatformType, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            platform,
            user_id: user_id.into(),
            username: None,
            info: serde_json::json!({}),
            context: serde_json::json!({}),
            messenger_id: None,
            menu_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_messenger(mut self, messenger_id: Uuid) -> Self {
        self.messenger_id = Some(messenger_id);
        self
    }

    pub fn with_menu(mut self, menu_id: Option<Uuid>) -> Self {
        self.menu_id = menu_id;
        self
    }

    /// Whether a provider profile has been stored yet.
    pub fn has_profile(&self) -> bool {
        self.info.as_object().is_some_and(|m| !m.is_empty())
    }

    pub fn avatar(&self) -> Option<&str> {
        self.info.get("avatar").and_then(|v| v.as_str())
    }

    /// Boolean flag from the conversation context, defaulting to false.
    pub fn context_flag(&self, key: &str) -> bool {
        self.context
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Display name: username when known, platform id otherwise.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.user_id)
    }
}

/// Defaults applied when an account is created by `get_or_create`.
#[derive(Debug, Clone, Default)]
pub struct AccountDefaults {
    pub username: Option<String>,
    pub messenger_id: Option<Uuid>,
    /// The messenger's root menu.
    pub menu_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_active_without_profile() {
        let account = Account::new(PlatformType::Telegram, "42");
        assert!(account.is_active);
        assert!(!account.has_profile());
        assert_eq!(account.display_name(), "42");
    }

    #[test]
    fn test_context_flag_defaults_false() {
        let mut account = Account::new(PlatformType::Viber, "abc=");
        assert!(!account.context_flag("reply"));

        account.context = serde_json::json!({ "reply": true });
        assert!(account.context_flag("reply"));
    }
}
