//! Per-messenger platform adapter construction
//!
//! Builds the right `MessengerAdapter` for a messenger's platform from its
//! stored configuration (token, proxy, sender name, logo) and caches the
//! instance so the underlying HTTP client pool is reused across webhooks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use botgate::{GatewayError, Messenger, MessengerAdapter, PlatformType};
use botgate_integration_telegram::{TelegramAdapter, TelegramConfig};
use botgate_integration_viber::{ViberAdapter, ViberConfig};

/// Cache of constructed adapters keyed by messenger id.
#[derive(Default)]
pub struct AdapterFactory {
    cache: RwLock<HashMap<Uuid, Arc<dyn MessengerAdapter>>>,
}

impl AdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn for_messenger(
        &self,
        messenger: &Messenger,
    ) -> Result<Arc<dyn MessengerAdapter>, GatewayError> {
        if let Some(adapter) = self.cache.read().await.get(&messenger.id) {
            return Ok(adapter.clone());
        }

        let adapter = build_adapter(messenger)?;
        self.cache
            .write()
            .await
            .insert(messenger.id, adapter.clone());
        Ok(adapter)
    }

    /// Drop a cached adapter, e.g. after a token change.
    pub async fn invalidate(&self, messenger_id: Uuid) {
        self.cache.write().await.remove(&messenger_id);
    }
}

fn build_adapter(messenger: &Messenger) -> Result<Arc<dyn MessengerAdapter>, GatewayError> {
    match messenger.platform {
        PlatformType::Telegram => {
            let mut config = TelegramConfig::new(messenger.token.clone());
            if let Some(proxy) = &messenger.proxy {
                config = config.with_proxy(proxy.clone());
            }
            Ok(Arc::new(TelegramAdapter::new(config)?))
        }
        PlatformType::Viber => {
            let mut config = ViberConfig::new(messenger.token.clone(), messenger.title.clone());
            if let Some(logo) = &messenger.logo {
                config = config.with_avatar(logo.clone());
            }
            Ok(Arc::new(ViberAdapter::new(config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_adapters_are_cached_per_messenger() {
        let factory = AdapterFactory::new();
        let messenger = Messenger::new("Support", PlatformType::Telegram, "123:abc");

        let first = factory.for_messenger(&messenger).await.unwrap();
        let second = factory.for_messenger(&messenger).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invalidate_rebuilds_adapter() {
        let factory = AdapterFactory::new();
        let messenger = Messenger::new("Support", PlatformType::Viber, "viber-token");

        let first = factory.for_messenger(&messenger).await.unwrap();
        factory.invalidate(messenger.id).await;
        let second = factory.for_messenger(&messenger).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_builds_platform_specific_adapter() {
        let telegram = Messenger::new("Support", PlatformType::Telegram, "123:abc");
        let viber = Messenger::new("Support", PlatformType::Viber, "viber-token");

        assert_eq!(
            build_adapter(&telegram).unwrap().platform(),
            PlatformType::Telegram
        );
        assert_eq!(
            build_adapter(&viber).unwrap().platform(),
            PlatformType::Viber
        );
    }
}
