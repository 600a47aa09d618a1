//! Viber REST API client
//!
//! Thin reqwest wrapper around `https://chatapi.viber.com/pa/<path>` with
//! the `X-Viber-Auth-Token` header and the `{status, status_message}`
//! response envelope.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::debug;

use botgate::GatewayError;

use crate::config::ViberConfig;

/// Status code Viber uses for "receiver not subscribed".
const STATUS_NOT_SUBSCRIBED: i64 = 6;
/// Status code Viber uses for "too many requests".
const STATUS_TOO_MANY_REQUESTS: i64 = 12;

/// Viber public-account API client bound to one auth token.
pub struct ViberClient {
    http: Client,
    api_base: String,
    token: String,
}

impl ViberClient {
    pub fn new(config: &ViberConfig) -> Result<Self, GatewayError> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Adapter(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
        })
    }

    /// Invoke an API endpoint, returning the full response envelope.
    pub async fn post(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}/{}", self.api_base, path);
        debug!(path, "calling Viber API");

        let response = self
            .http
            .post(&url)
            .header("X-Viber-Auth-Token", &self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Adapter(format!("viber {} request failed: {}", path, e)))?;

        let envelope: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Adapter(format!("viber {} decode failed: {}", path, e)))?;

        interpret_envelope(path, envelope)
    }

    /// Register the webhook URL. An empty URL removes the registration.
    pub async fn set_webhook(&self, url: &str) -> Result<(), GatewayError> {
        let payload = if url.is_empty() {
            serde_json::json!({ "url": "" })
        } else {
            serde_json::json!({
                "url": url,
                "send_name": true,
                "send_photo": true,
            })
        };
        self.post("set_webhook", payload).await.map(|_| ())
    }

    pub async fn get_account_info(&self) -> Result<serde_json::Value, GatewayError> {
        self.post("get_account_info", serde_json::json!({})).await
    }

    pub async fn get_user_details(&self, user_id: &str) -> Result<serde_json::Value, GatewayError> {
        self.post("get_user_details", serde_json::json!({ "id": user_id }))
            .await
    }

    /// Send one message payload, returning the provider message token.
    pub async fn send_message(
        &self,
        payload: serde_json::Value,
    ) -> Result<String, GatewayError> {
        let envelope = self.post("send_message", payload).await?;
        Ok(envelope
            .get("message_token")
            .map(|v| v.to_string())
            .unwrap_or_default())
    }
}

/// Map the Viber envelope: status 0 is success, 12 is throttling, 6 is an
/// unreachable receiver; everything else carries the provider message.
pub(crate) fn interpret_envelope(
    path: &str,
    envelope: serde_json::Value,
) -> Result<serde_json::Value, GatewayError> {
    let status = envelope.get("status").and_then(|v| v.as_i64()).unwrap_or(-1);
    if status == 0 {
        return Ok(envelope);
    }

    let status_message = envelope
        .get("status_message")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_string();

    match status {
        STATUS_TOO_MANY_REQUESTS => Err(GatewayError::RateLimited(format!(
            "viber {} failed with status: {}, message: {}",
            path, status, status_message
        ))),
        STATUS_NOT_SUBSCRIBED => Err(GatewayError::NotSubscribed),
        _ if status_message.contains("notSubscribed") => Err(GatewayError::NotSubscribed),
        _ => Err(GatewayError::Adapter(format!(
            "viber {} failed with status: {}, message: {}",
            path, status, status_message
        ))),
    }
}
