//! The durable user repository.
//!
//! Users are created on first successful phone verification (spec.md §3);
//! that entry point itself is an external OTP-verification collaborator,
//! out of scope here. `upsert_verified` is the seam that collaborator
//! calls into.

use std::collections::HashMap;

use async_trait::async_trait;
use bundl_types::{BundlError, User, UserId};
use sqlx::PgPool;
use sqlx::Row;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<User>, BundlError>;

    async fn get_by_phone(&self, phone_number: &str) -> Result<Option<User>, BundlError>;

    /// Create the user if `phone_number` is new, seeding
    /// `DEFAULT_USER_CREDITS`; otherwise update `push_token` on the
    /// existing row. Returns the resulting user either way.
    async fn upsert_verified(
        &self,
        phone_number: &str,
        push_token: Option<String>,
        default_credits: i64,
    ) -> Result<User, BundlError>;
}

/// Postgres-backed [`UserRepository`].
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: sqlx::postgres::PgRow) -> Result<User, BundlError> {
    Ok(User {
        id: UserId(row.try_get("id").map_err(|e| BundlError::Io(e.to_string()))?),
        phone_number: row.try_get("phone_number").map_err(|e| BundlError::Io(e.to_string()))?,
        push_token: row.try_get("push_token").map_err(|e| BundlError::Io(e.to_string()))?,
        credits: row.try_get("credits").map_err(|e| BundlError::Io(e.to_string()))?,
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get(&self, user_id: UserId) -> Result<Option<User>, BundlError> {
        let row = sqlx::query(r#"SELECT * FROM "user" WHERE id = $1"#)
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        row.map(row_to_user).transpose()
    }

    async fn get_by_phone(&self, phone_number: &str) -> Result<Option<User>, BundlError> {
        let row = sqlx::query(r#"SELECT * FROM "user" WHERE phone_number = $1"#)
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        row.map(row_to_user).transpose()
    }

    async fn upsert_verified(
        &self,
        phone_number: &str,
        push_token: Option<String>,
        default_credits: i64,
    ) -> Result<User, BundlError> {
        let row = sqlx::query(
            r#"INSERT INTO "user" (id, phone_number, push_token, credits)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (phone_number) DO UPDATE SET push_token = EXCLUDED.push_token
               RETURNING *"#,
        )
        .bind(UserId::new().0)
        .bind(phone_number)
        .bind(push_token)
        .bind(default_credits)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

        row_to_user(row)
    }
}

/// In-memory [`UserRepository`] for engine tests.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: tokio::sync::Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, user: User) {
        self.users.lock().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, user_id: UserId) -> Result<Option<User>, BundlError> {
        Ok(self.users.lock().await.get(&user_id).cloned())
    }

    async fn get_by_phone(&self, phone_number: &str) -> Result<Option<User>, BundlError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.phone_number == phone_number)
            .cloned())
    }

    async fn upsert_verified(
        &self,
        phone_number: &str,
        push_token: Option<String>,
        default_credits: i64,
    ) -> Result<User, BundlError> {
        let mut users = self.users.lock().await;
        if let Some(existing) = users.values_mut().find(|u| u.phone_number == phone_number) {
            existing.push_token = push_token;
            return Ok(existing.clone());
        }

        let mut user = User::new(phone_number, default_credits);
        user.push_token = push_token;
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_verified_creates_new_user() {
        let repo = InMemoryUserRepository::new();
        let user = repo.upsert_verified("+15551234567", None, 5).await.unwrap();
        assert_eq!(user.credits, 5);
        assert_eq!(user.phone_number, "+15551234567");
    }

    #[tokio::test]
    async fn upsert_verified_updates_push_token_not_credits() {
        let repo = InMemoryUserRepository::new();
        let first = repo.upsert_verified("+15551234567", None, 5).await.unwrap();
        let second = repo
            .upsert_verified("+15551234567", Some("token-1".to_string()), 5)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.push_token, Some("token-1".to_string()));
        assert_eq!(second.credits, 5);
    }

    #[tokio::test]
    async fn get_by_phone_misses_unknown_number() {
        let repo = InMemoryUserRepository::new();
        assert!(repo.get_by_phone("+10000000000").await.unwrap().is_none());
    }
}
