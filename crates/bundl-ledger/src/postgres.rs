//! Postgres-backed credit ledger. Guards per-user mutation with a
//! `SELECT ... FOR UPDATE` row lock inside a transaction, matching the
//! spec's "row-level lock or equivalent CAS with retry" requirement.

use async_trait::async_trait;
use bundl_types::{BundlError, UserId};
use sqlx::PgPool;

use crate::ledger::CreditLedger;

/// A [`CreditLedger`] backed by the `"user"` table's `credits` column.
pub struct PgCreditLedger {
    pool: PgPool,
}

impl PgCreditLedger {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn try_debit(&self, user_id: UserId, n: i64) -> Result<bool, BundlError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        let row: Option<(i64,)> = sqlx::query_as(r#"SELECT credits FROM "user" WHERE id = $1 FOR UPDATE"#)
            .bind(user_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        let Some((credits,)) = row else {
            return Err(BundlError::UnknownUser(user_id));
        };

        if credits < n {
            // Explicit rollback: the transaction's row lock is released
            // without any write, satisfying "no side effect on failure".
            tx.rollback().await.map_err(|e| BundlError::Io(e.to_string()))?;
            return Ok(false);
        }

        sqlx::query(r#"UPDATE "user" SET credits = credits - $2 WHERE id = $1"#)
            .bind(user_id.0)
            .bind(n)
            .execute(&mut *tx)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        tx.commit().await.map_err(|e| BundlError::Io(e.to_string()))?;
        Ok(true)
    }

    async fn credit(&self, user_id: UserId, n: i64) -> Result<(), BundlError> {
        let result = sqlx::query(r#"UPDATE "user" SET credits = credits + $2 WHERE id = $1"#)
            .bind(user_id.0)
            .bind(n)
            .execute(&self.pool)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(BundlError::UnknownUser(user_id));
        }
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<i64, BundlError> {
        let row: Option<(i64,)> = sqlx::query_as(r#"SELECT credits FROM "user" WHERE id = $1"#)
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        row.map(|(credits,)| credits)
            .ok_or(BundlError::UnknownUser(user_id))
    }

    async fn credit_idempotent(
        &self,
        user_id: UserId,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), BundlError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        let inserted = sqlx::query(
            r#"INSERT INTO credit_topups (user_id, idempotency_key, amount)
               VALUES ($1, $2, $3)
               ON CONFLICT (user_id, idempotency_key) DO NOTHING"#,
        )
        .bind(user_id.0)
        .bind(idempotency_key)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

        if inserted.rows_affected() == 0 {
            // Already applied for this key; nothing further to do.
            tx.rollback().await.map_err(|e| BundlError::Io(e.to_string()))?;
            return Ok(());
        }

        sqlx::query(r#"UPDATE "user" SET credits = credits + $2 WHERE id = $1"#)
            .bind(user_id.0)
            .bind(amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        tx.commit().await.map_err(|e| BundlError::Io(e.to_string()))?;
        Ok(())
    }
}
