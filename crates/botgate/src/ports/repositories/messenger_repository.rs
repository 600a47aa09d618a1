//! Messenger Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::Messenger;
use crate::domain::errors::GatewayError;

/// Repository interface for configured messengers.
#[async_trait]
pub trait MessengerRepository: Send + Sync {
    /// Lookup by token hash, the inbound webhook address.
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Messenger>, GatewayError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Messenger>, GatewayError>;

    /// Record whether the provider-side webhook is registered.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), GatewayError>;
}
