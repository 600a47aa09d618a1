//! ProfileInfo - provider account/user profile payload

use serde::{Deserialize, Serialize};

/// Profile data returned by a provider for a bot account or a user.
///
/// `info` carries the provider's raw payload so callers can keep fields
/// the gateway does not model (avatar variants, locale, device info, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInfo {
    /// Platform-specific account/user id
    pub id: Option<String>,
    /// Display or user name
    pub username: Option<String>,
    /// Avatar URL when the platform exposes one
    pub avatar: Option<String>,
    /// Raw provider payload
    #[serde(default)]
    pub info: serde_json::Value,
}

impl ProfileInfo {
    pub fn new(id: impl Into<String>, username: Option<String>) -> Self {
        Self {
            id: Some(id.into()),
            username,
            avatar: None,
            info: serde_json::Value::Null,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        self.info = info;
        self
    }
}
