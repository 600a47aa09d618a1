//! Telegram Bot API client
//!
//! Thin reqwest wrapper around `https://api.telegram.org/bot<token>/<method>`
//! with the `{ok, result, description, error_code}` response envelope.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::debug;

use botgate::GatewayError;

use crate::config::TelegramConfig;

/// Telegram Bot API client bound to one bot token.
pub struct TelegramClient {
    http: Client,
    /// `<api_base>/bot<token>`
    base_url: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, GatewayError> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| GatewayError::Adapter(format!("invalid telegram proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| GatewayError::Adapter(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", config.api_base, config.token),
        })
    }

    /// Invoke a Bot API method, returning the `result` payload.
    pub async fn call(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}/{}", self.base_url, method);
        debug!(method, "calling Telegram Bot API");

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Adapter(format!("telegram {} request failed: {}", method, e)))?;

        let envelope: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Adapter(format!("telegram {} decode failed: {}", method, e)))?;

        interpret_envelope(method, envelope)
    }

    pub async fn set_webhook(&self, url: &str) -> Result<(), GatewayError> {
        self.call("setWebhook", serde_json::json!({ "url": url }))
            .await
            .map(|_| ())
    }

    pub async fn delete_webhook(&self) -> Result<(), GatewayError> {
        self.call("deleteWebhook", serde_json::json!({}))
            .await
            .map(|_| ())
    }

    pub async fn get_me(&self) -> Result<serde_json::Value, GatewayError> {
        self.call("getMe", serde_json::json!({})).await
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<serde_json::Value, GatewayError> {
        self.call("getChat", serde_json::json!({ "chat_id": chat_id }))
            .await
    }
}

/// Map the Bot API envelope: `ok=true` yields `result`, HTTP 429 maps to
/// the throttling error, everything else carries the provider description.
pub(crate) fn interpret_envelope(
    method: &str,
    envelope: serde_json::Value,
) -> Result<serde_json::Value, GatewayError> {
    let ok = envelope.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    if ok {
        return Ok(envelope
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null));
    }

    let description = envelope
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_string();
    let error_code = envelope.get("error_code").and_then(|v| v.as_u64());

    if error_code == Some(429) {
        return Err(GatewayError::RateLimited(format!(
            "telegram {}: {}",
            method, description
        )));
    }

    Err(GatewayError::Adapter(format!(
        "telegram {} failed: {}",
        method, description
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ok_returns_result() {
        let result = interpret_envelope(
            "sendMessage",
            serde_json::json!({ "ok": true, "result": { "message_id": 7 } }),
        )
        .unwrap();
        assert_eq!(result["message_id"], 7);
    }

    #[test]
    fn test_envelope_429_maps_to_rate_limited() {
        let err = interpret_envelope(
            "getChat",
            serde_json::json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 14"
            }),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited(_)));
    }

    #[test]
    fn test_envelope_error_carries_description() {
        let err = interpret_envelope(
            "setWebhook",
            serde_json::json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            }),
        )
        .unwrap_err();
        match err {
            GatewayError::Adapter(text) => assert!(text.contains("Unauthorized")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
