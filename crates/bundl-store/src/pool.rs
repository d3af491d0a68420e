//! Postgres pool construction.

use async_trait::async_trait;
use bundl_types::{BundlError, HealthCheck};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect a pool against `database_url` and run pending migrations.
pub async fn connect(database_url: &str) -> Result<PgPool, BundlError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

    Ok(pool)
}

/// `GET /healthz` liveness check: `SELECT 1` against the pool.
pub struct PgHealthCheck(pub PgPool);

#[async_trait]
impl HealthCheck for PgHealthCheck {
    async fn ping(&self) -> Result<(), BundlError> {
        sqlx::query("SELECT 1").execute(&self.0).await.map_err(|e| BundlError::Io(e.to_string()))?;
        Ok(())
    }
}
