//! PostgreSQL implementation of MenuRepository
//!
//! Menus are returned with their buttons eagerly loaded through the
//! ordered `menu_buttons` join table; the explicit `position` column is
//! what makes button order (and therefore keyboard layout) significant.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use botgate::{Button, GatewayError, Menu, MenuRepository};

/// PostgreSQL implementation of MenuRepository
pub struct PgMenuRepository {
    pool: PgPool,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct MenuRow {
    id: Uuid,
    title: String,
    message: Option<String>,
    handler: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct ButtonRow {
    id: Uuid,
    title: String,
    text: String,
    message: Option<String>,
    handler: Option<String>,
    next_menu_id: Option<Uuid>,
    command: String,
    for_staff: bool,
    for_admin: bool,
    is_inline: bool,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ButtonRow> for Button {
    fn from(row: ButtonRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            text: row.text,
            message: row.message,
            handler: row.handler,
            next_menu_id: row.next_menu_id,
            command: row.command,
            for_staff: row.for_staff,
            for_admin: row.for_admin,
            is_inline: row.is_inline,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl MenuRepository for PgMenuRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Menu>, GatewayError> {
        let row = sqlx::query_as::<_, MenuRow>("SELECT * FROM menus WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GatewayError::Repository(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let buttons = sqlx::query_as::<_, ButtonRow>(
            r#"
            SELECT b.*
            FROM buttons b
            JOIN menu_buttons mb ON mb.button_id = b.id
            WHERE mb.menu_id = $1
            ORDER BY mb.position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::Repository(e.to_string()))?;

        Ok(Some(Menu {
            id: row.id,
            title: row.title,
            message: row.message,
            handler: row.handler,
            buttons: buttons.into_iter().map(Button::from).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn find_buttons_by_command_or_text(
        &self,
        needle: &str,
    ) -> Result<Vec<Button>, GatewayError> {
        let rows = sqlx::query_as::<_, ButtonRow>(
            r#"
            SELECT *
            FROM buttons
            WHERE (command = $1 OR text = $1) AND is_active = TRUE
            ORDER BY created_at
            "#,
        )
        .bind(needle)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::Repository(e.to_string()))?;

        Ok(rows.into_iter().map(Button::from).collect())
    }
}
