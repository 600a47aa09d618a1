//! Server configuration from environment variables

use anyhow::{Context, Result};

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Public base URL registered with the providers,
    /// e.g. `https://bots.example.com`.
    pub public_url: String,
    /// Bearer token for operator routes; None disables authentication.
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr =
            std::env::var("BOTGATE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let public_url =
            std::env::var("BOTGATE_PUBLIC_URL").context("BOTGATE_PUBLIC_URL must be set")?;
        let api_key = std::env::var("BOTGATE_API_KEY").ok().filter(|k| !k.is_empty());

        Ok(Self {
            database_url,
            bind_addr,
            public_url: public_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}
