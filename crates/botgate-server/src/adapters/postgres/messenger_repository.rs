//! PostgreSQL implementation of MessengerRepository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use botgate::{GatewayError, Messenger, MessengerRepository, PlatformType};

/// PostgreSQL implementation of MessengerRepository
pub struct PgMessengerRepository {
    pool: PgPool,
}

impl PgMessengerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct MessengerRow {
    id: Uuid,
    title: String,
    platform: String,
    token: String,
    proxy: Option<String>,
    logo: Option<String>,
    welcome_text: Option<String>,
    handler: String,
    menu_id: Option<Uuid>,
    token_hash: String,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<MessengerRow> for Messenger {
    fn from(row: MessengerRow) -> Self {
        let platform: PlatformType = row
            .platform
            .parse()
            .expect("invalid platform stored in messengers table");
        Self {
            id: row.id,
            title: row.title,
            platform,
            token: row.token,
            proxy: row.proxy,
            logo: row.logo,
            welcome_text: row.welcome_text,
            handler: row.handler,
            menu_id: row.menu_id,
            token_hash: row.token_hash,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl MessengerRepository for PgMessengerRepository {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Messenger>, GatewayError> {
        let row = sqlx::query_as::<_, MessengerRow>(
            "SELECT * FROM messengers WHERE token_hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::Repository(e.to_string()))?;

        Ok(row.map(Messenger::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Messenger>, GatewayError> {
        let row = sqlx::query_as::<_, MessengerRow>("SELECT * FROM messengers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GatewayError::Repository(e.to_string()))?;

        Ok(row.map(Messenger::from))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), GatewayError> {
        sqlx::query("UPDATE messengers SET is_active = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Repository(e.to_string()))?;
        Ok(())
    }
}
