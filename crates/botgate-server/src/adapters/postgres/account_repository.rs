//! PostgreSQL implementation of AccountRepository
//!
//! Per-account write safety comes from single-statement updates: the
//! `context` merge is one jsonb concatenation, so overlapping webhook
//! deliveries for the same user cannot lose each other's keys. There is
//! no table-level or cross-account locking.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use botgate::{Account, AccountDefaults, AccountRepository, GatewayError, PlatformType};

/// PostgreSQL implementation of AccountRepository
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    platform: String,
    user_id: String,
    username: Option<String>,
    info: serde_json::Value,
    context: serde_json::Value,
    messenger_id: Option<Uuid>,
    menu_id: Option<Uuid>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        let platform: PlatformType = row
            .platform
            .parse()
            .expect("invalid platform stored in accounts table");
        Self {
            id: row.id,
            platform,
            user_id: row.user_id,
            username: row.username,
            info: row.info,
            context: row.context,
            messenger_id: row.messenger_id,
            menu_id: row.menu_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn get_or_create(
        &self,
        platform: PlatformType,
        user_id: &str,
        defaults: AccountDefaults,
    ) -> Result<(Account, bool), GatewayError> {
        if let Some(existing) = self.find(platform, user_id).await? {
            return Ok((existing, false));
        }

        // Two deliveries can race here; ON CONFLICT makes the insert a
        // no-op for the loser, which then reads the winner's row.
        let inserted = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts
                (id, platform, user_id, username, info, context,
                 messenger_id, menu_id, is_active)
            VALUES ($1, $2, $3, $4, '{}'::jsonb, '{}'::jsonb, $5, $6, TRUE)
            ON CONFLICT (platform, user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(platform.to_string())
        .bind(user_id)
        .bind(&defaults.username)
        .bind(defaults.messenger_id)
        .bind(defaults.menu_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::Repository(e.to_string()))?;

        match inserted {
            Some(row) => Ok((row.into(), true)),
            None => {
                let existing = self
                    .find(platform, user_id)
                    .await?
                    .ok_or_else(|| GatewayError::not_found_str("Account", user_id))?;
                Ok((existing, false))
            }
        }
    }

    async fn find(
        &self,
        platform: PlatformType,
        user_id: &str,
    ) -> Result<Option<Account>, GatewayError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE platform = $1 AND user_id = $2",
        )
        .bind(platform.to_string())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::Repository(e.to_string()))?;

        Ok(row.map(Account::from))
    }

    async fn set_menu(&self, id: Uuid, menu_id: Option<Uuid>) -> Result<(), GatewayError> {
        sqlx::query("UPDATE accounts SET menu_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(menu_id)
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), GatewayError> {
        sqlx::query("UPDATE accounts SET is_active = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn set_profile(
        &self,
        id: Uuid,
        username: Option<String>,
        info: serde_json::Value,
    ) -> Result<(), GatewayError> {
        sqlx::query(
            "UPDATE accounts SET username = $2, info = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(username)
        .bind(info)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn merge_context(
        &self,
        id: Uuid,
        patch: serde_json::Value,
    ) -> Result<(), GatewayError> {
        sqlx::query(
            "UPDATE accounts SET context = context || $2::jsonb, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(patch)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Repository(e.to_string()))?;
        Ok(())
    }
}
