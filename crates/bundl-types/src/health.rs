//! The liveness-check seam `GET /healthz` polls. Kept here, rather than in
//! `bundl-api`, so the Postgres pool and Redis connection manager can
//! implement it directly in the crates that own them without a dependency
//! cycle back through the HTTP surface.

use async_trait::async_trait;

use crate::error::BundlError;

/// Something `GET /healthz` can ping. `Err` means unhealthy; the `Ok` value
/// carries no payload.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), BundlError>;
}
