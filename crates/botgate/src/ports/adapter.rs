//! Platform Adapter Port
//!
//! Abstract interface for translating between the canonical message model
//! and one messaging platform's wire format and REST API.
//!
//! Implementations of this trait live in separate crates
//! (e.g., botgate-integration-telegram, botgate-integration-viber).

use async_trait::async_trait;

use crate::domain::entities::{Menu, Message};
use crate::domain::errors::GatewayError;
use crate::domain::value_objects::{PlatformType, ProfileInfo};

/// Result of a (possibly multi-part) outbound send.
///
/// Delivery is best-effort and in order: a failure partway through keeps
/// the ids already delivered and reports the error alongside them;
/// nothing is rolled back.
#[derive(Debug, Default)]
pub struct SendOutcome {
    /// One delivered message id per constituent, in send order.
    pub delivered: Vec<String>,
    /// The error that stopped delivery, if any.
    pub error: Option<GatewayError>,
}

impl SendOutcome {
    pub fn ok(delivered: Vec<String>) -> Self {
        Self {
            delivered,
            error: None,
        }
    }

    pub fn failed(delivered: Vec<String>, error: GatewayError) -> Self {
        Self {
            delivered,
            error: Some(error),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Platform integration interface
///
/// One implementation per messenger platform. Each instance is bound to a
/// single configured bot (token, sender name, avatar); the adapter owns
/// all wire-format knowledge and all calls to the provider's API.
///
/// All network methods must carry a bounded timeout; an outbound call
/// failure must not hang an inbound dispatch.
#[async_trait]
pub trait MessengerAdapter: Send + Sync {
    /// Platform this adapter speaks for.
    fn platform(&self) -> PlatformType;

    /// Register the webhook URL with the provider. Idempotent.
    async fn enable_webhook(&self, url: &str) -> Result<(), GatewayError>;

    /// Remove the provider-side webhook registration. Idempotent.
    async fn disable_webhook(&self) -> Result<(), GatewayError>;

    /// Bot account profile, for diagnostics only.
    async fn account_info(&self) -> Result<ProfileInfo, GatewayError>;

    /// User profile lookup. Fails with [`GatewayError::RateLimited`] when
    /// the provider signals throttling.
    async fn user_info(&self, user_id: &str) -> Result<ProfileInfo, GatewayError>;

    /// Pure function from the raw webhook body to a canonical [`Message`].
    ///
    /// Unrecognized payload shapes, including bodies that do not parse at
    /// all, map to the `Undefined` kind rather than failing; only an
    /// explicit integrity check failure returns
    /// [`GatewayError::Verification`].
    fn parse_message(&self, body: &[u8], signature: Option<&str>)
        -> Result<Message, GatewayError>;

    /// Whether this platform needs contextual reinterpretation of parsed
    /// messages (e.g. Telegram reply-keyboard presses arrive as plain text).
    fn needs_preprocessing(&self) -> bool {
        false
    }

    /// Contextual reinterpretation against the account's current menu:
    /// a Text message equal to an active button's display text is retagged
    /// as a Button press carrying that button's command.
    fn preprocess_message(&self, message: Message, _menu: Option<&Menu>) -> Message {
        message
    }

    /// Send messages to `receiver` in order, one delivered id per
    /// constituent. See [`SendOutcome`] for partial-delivery semantics.
    async fn send_message(&self, receiver: &str, messages: Vec<Message>) -> SendOutcome;

    /// Synchronous-reply envelope some platforms require in the webhook
    /// response instead of an async send; None when the platform has no
    /// such mechanism.
    fn welcome_message(&self, _text: &str) -> Option<serde_json::Value> {
        None
    }
}
