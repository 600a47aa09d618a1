//! Account Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{Account, AccountDefaults};
use crate::domain::errors::GatewayError;
use crate::domain::value_objects::PlatformType;

/// Repository interface for Account records.
///
/// Mutations are atomic per account: overlapping webhook deliveries for
/// the same user must not lose writes, so `merge_context` (and the `set_*`
/// updates) must be a single-statement update or run under a per-account
/// lock. Serialization across *different* accounts is explicitly not
/// required; implementations must not take a global lock.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Fetch the account for (platform, user_id), creating it with
    /// `defaults` when unseen. Returns the account and whether it was
    /// created by this call.
    async fn get_or_create(
        &self,
        platform: PlatformType,
        user_id: &str,
        defaults: AccountDefaults,
    ) -> Result<(Account, bool), GatewayError>;

    async fn find(
        &self,
        platform: PlatformType,
        user_id: &str,
    ) -> Result<Option<Account>, GatewayError>;

    /// Move the account to another menu (None clears the pointer).
    async fn set_menu(&self, id: Uuid, menu_id: Option<Uuid>) -> Result<(), GatewayError>;

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), GatewayError>;

    /// Store the provider profile (username + info map).
    async fn set_profile(
        &self,
        id: Uuid,
        username: Option<String>,
        info: serde_json::Value,
    ) -> Result<(), GatewayError>;

    /// Merge `patch` into the conversation context map, key by key.
    async fn merge_context(&self, id: Uuid, patch: serde_json::Value)
        -> Result<(), GatewayError>;
}
