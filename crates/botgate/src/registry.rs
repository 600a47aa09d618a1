//! Handler Registry
//!
//! Process-wide mapping from string identifiers (`module.function`
//! convention) to message-processing functions supplied by the bot author.
//! Populated once at startup before any dispatch begins and read-only
//! afterwards, so lookups need no locking. Unknown identifiers fail with
//! [`GatewayError::HandlerNotFound`], and the set of reachable handlers is
//! statically auditable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::{Account, Message};
use crate::domain::errors::GatewayError;
use crate::services::Outbox;

/// Default fallback handler for new messengers.
pub const ECHO_HANDLER: &str = "builtin.echo";
/// Handler that acknowledges without responding.
pub const SILENT_HANDLER: &str = "builtin.silent";

/// A bot-author-supplied message processing function.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        message: &Message,
        account: &Account,
        outbox: &Outbox<'_>,
    ) -> Result<(), GatewayError>;
}

/// Registry of named handlers, immutable after startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ECHO_HANDLER, Arc::new(EchoHandler));
        registry.register(SILENT_HANDLER, Arc::new(SilentHandler));
        registry
    }

    /// Register a handler under `id`. Last registration wins.
    pub fn register(&mut self, id: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        self.handlers.insert(id.into(), handler);
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<dyn MessageHandler>, GatewayError> {
        self.handlers
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::HandlerNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }
}

/// Echoes the inbound message back to its sender. When the account's
/// context sets a truthy `reply` flag, the echo is threaded as a reply.
pub struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn handle(
        &self,
        message: &Message,
        account: &Account,
        outbox: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        let mut echo = message.clone();
        if account.context_flag("reply") {
            if let Some(id) = &message.id {
                echo = echo.with_reply_to(id.clone());
            }
        }
        outbox.send(account, echo).await;
        Ok(())
    }
}

/// Acknowledges the message with no response and no action.
pub struct SilentHandler;

#[async_trait]
impl MessageHandler for SilentHandler {
    async fn handle(
        &self,
        _message: &Message,
        _account: &Account,
        _outbox: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        Ok(())
    }
}
