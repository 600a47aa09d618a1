//! Gateway Errors
//!
//! Error taxonomy for dispatch, adapters, and storage.

use thiserror::Error;
use uuid::Uuid;

/// Gateway layer errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Inbound payload failed an integrity/signature check.
    /// Aborts dispatch before account resolution.
    #[error("verification failed: {0}")]
    Verification(String),

    /// A provider API call failed (network, malformed response, provider
    /// error status). Carries the provider's raw error text.
    #[error("messenger API error: {0}")]
    Adapter(String),

    /// The provider signaled throttling on a profile lookup.
    /// Soft failure: the calling flow proceeds without profile info.
    #[error("provider rate limit exceeded: {0}")]
    RateLimited(String),

    /// The provider reports the receiver is not currently reachable.
    #[error("receiver is not subscribed")]
    NotSubscribed,

    /// Unknown handler identifier, a configuration error.
    #[error("handler not found: {0}")]
    HandlerNotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },
}

impl GatewayError {
    pub fn not_found<T: AsRef<str>>(entity_type: T, id: Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.as_ref().to_string(),
            id: id.to_string(),
        }
    }

    pub fn not_found_str<T: AsRef<str>>(entity_type: T, id: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.as_ref().to_string(),
            id: id.to_string(),
        }
    }
}
