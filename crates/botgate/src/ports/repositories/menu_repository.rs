//! Menu Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{Button, Menu};
use crate::domain::errors::GatewayError;

/// Repository interface for the menu/button graph.
///
/// Menus come back with their buttons eagerly loaded in configured order;
/// the order is significant for keyboard layout and match precedence.
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Menu>, GatewayError>;

    /// Global button lookup by command or display text, active buttons
    /// only. Used as the fallback when the current menu has no match.
    async fn find_buttons_by_command_or_text(
        &self,
        needle: &str,
    ) -> Result<Vec<Button>, GatewayError>;
}
