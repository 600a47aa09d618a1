//! Botgate API Client

use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

/// API Client for a running Botgate server
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

// ============================================
// API Response Types
// ============================================

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct MessengerResponse {
    pub id: Uuid,
    pub title: String,
    pub platform: String,
    pub webhook_path: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    pub id: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub info: serde_json::Value,
}

impl GatewayClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.request(reqwest::Method::GET, "/health").send().await?;
        if !response.status().is_success() {
            bail!("health check failed: {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn activate(&self, id: Uuid) -> Result<MessengerResponse> {
        self.switch(id, "activate").await
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<MessengerResponse> {
        self.switch(id, "deactivate").await
    }

    async fn switch(&self, id: Uuid, action: &str) -> Result<MessengerResponse> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/messengers/{}/{}", id, action),
            )
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("{} failed ({}): {}", action, status, response.text().await?);
        }
        Ok(response.json().await?)
    }

    pub async fn profile(&self, id: Uuid) -> Result<ProfileResponse> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/messengers/{}/profile", id),
            )
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("profile lookup failed ({}): {}", status, response.text().await?);
        }
        Ok(response.json().await?)
    }
}
