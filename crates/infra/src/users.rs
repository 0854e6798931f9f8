//! Display identities of the users that appear in audit history.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use fablab_core::UserId;
use fablab_inventory::UserSummary;

use crate::store::StoreError;
use crate::store::postgres_error as map_sqlx_error;

/// Resolves user ids to display identities.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up every known id; unknown ids are simply absent from the map.
    async fn summaries(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserSummary>, StoreError>;
}

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserSummary>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user: UserSummary) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn summaries(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserSummary>, StoreError> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}

/// User directory backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a user row.
    pub async fn register(&self, user: &UserSummary, role: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                role = EXCLUDED.role
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("register_user", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn summaries(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserSummary>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let rows = sqlx::query(
            "SELECT id, first_name, last_name, email FROM users WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("user_summaries", e))?;

        rows.iter()
            .map(|row| {
                let id = UserId::from_uuid(
                    row.try_get("id")
                        .map_err(|e| map_sqlx_error("user_summaries", e))?,
                );
                let summary = UserSummary {
                    id,
                    first_name: row
                        .try_get("first_name")
                        .map_err(|e| map_sqlx_error("user_summaries", e))?,
                    last_name: row
                        .try_get("last_name")
                        .map_err(|e| map_sqlx_error("user_summaries", e))?,
                    email: row
                        .try_get("email")
                        .map_err(|e| map_sqlx_error("user_summaries", e))?,
                };
                Ok::<_, StoreError>((id, summary))
            })
            .collect()
    }
}
