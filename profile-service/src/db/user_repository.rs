use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

/// Access to user rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;

    /// Set the profile picture URL of a user and return the refreshed row.
    ///
    /// Returns `Ok(None)` when no user has this ID. Errors from the update
    /// itself are returned before any read is attempted.
    async fn update_profile_picture_url(
        &self,
        id: Uuid,
        url: &str,
    ) -> Result<Option<User>, sqlx::Error>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, profile_picture_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile_picture_url(
        &self,
        id: Uuid,
        url: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET profile_picture_url = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("No user row updated for id={}", id);
            return Ok(None);
        }

        tracing::info!("Updated profile picture for user {}", id);
        self.get_by_id(id).await
    }
}
