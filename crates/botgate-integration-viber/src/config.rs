//! Viber adapter configuration

/// Default public-account API host.
pub const DEFAULT_API_BASE: &str = "https://chatapi.viber.com/pa";

/// Configuration for one Viber public account.
#[derive(Debug, Clone)]
pub struct ViberConfig {
    /// Public account auth token; also the HMAC key for inbound
    /// content signatures.
    pub token: String,
    /// Sender name shown to users (Viber requires one on every send).
    pub name: String,
    /// Sender avatar URL.
    pub avatar: Option<String>,
    /// API host override, mainly for tests.
    pub api_base: String,
    /// Total per-request timeout for provider calls.
    pub timeout_secs: u64,
}

impl ViberConfig {
    pub fn new(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            avatar: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ViberConfig::new("viber-token", "Support Bot")
            .with_avatar("https://example.com/logo.png")
            .with_timeout_secs(15);

        assert_eq!(config.token, "viber-token");
        assert_eq!(config.name, "Support Bot");
        assert_eq!(config.avatar.as_deref(), Some("https://example.com/logo.png"));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout_secs, 15);
    }
}
