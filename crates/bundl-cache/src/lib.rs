//! # bundl-cache
//!
//! The live order cache (component C3): the in-memory representation of
//! *active* orders — serialized snapshot, geo index, participant set — and
//! the scripted atomic pledge operation that is this crate's reason for
//! existing.
//!
//! Kept as a side-effect-isolated compute boundary: every mutation to
//! Redis happens behind one of the functions in [`snapshot`], [`geo`],
//! [`participants`], or [`pledge`] — nothing in [`bundl-engine`] talks to a
//! `ConnectionManager` directly.

pub mod backend;
pub mod geo;
pub mod keys;
pub mod memory;
pub mod participants;
pub mod pledge;
pub mod snapshot;

use async_trait::async_trait;
use bundl_types::{BundlError, HealthCheck, Order, OrderId, UserId};
use redis::aio::ConnectionManager;
use rust_decimal::Decimal;

pub use backend::OrderCacheBackend;
pub use keys::KeySpace;
pub use memory::InMemoryOrderCache;
pub use pledge::{PledgeOutcome, PledgeRejection};

/// The live order cache, composing the snapshot/geo/participants/pledge
/// primitives behind the operations spec.md §4.3 names.
///
/// `ConnectionManager` is itself cheaply `Clone` and safe to use from many
/// concurrent callers (each clone multiplexes over the same underlying
/// connection with automatic reconnect), so every operation clones it
/// rather than holding the struct behind an external lock.
pub struct OrderCache {
    conn: ConnectionManager,
    keys: KeySpace,
}

impl OrderCache {
    #[must_use]
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self { conn, keys: KeySpace::new(key_prefix) }
    }
}

#[async_trait]
impl OrderCacheBackend for OrderCache {
    /// Write the snapshot, geo entry, and (if non-empty) participants set
    /// for a freshly-created ACTIVE order, all with TTL = `ttl_seconds`
    /// except the geo entry, which persists until explicit removal.
    async fn create(&self, order: &Order, ttl_seconds: u64) -> Result<(), BundlError> {
        let mut conn = self.conn.clone();
        snapshot::set(&mut conn, &self.keys, order, ttl_seconds).await?;
        geo::add(&mut conn, &self.keys, order).await?;
        let initial_members: Vec<UserId> = order.pledge_map.keys().copied().collect();
        participants::init(&mut conn, &self.keys, order.id, &initial_members, ttl_seconds).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, BundlError> {
        let mut conn = self.conn.clone();
        snapshot::get(&mut conn, &self.keys, order_id).await
    }

    /// Remove all three correlated entries. Idempotent.
    async fn delete(&self, order_id: OrderId) -> Result<(), BundlError> {
        let mut conn = self.conn.clone();
        snapshot::delete(&mut conn, &self.keys, order_id).await?;
        participants::delete(&mut conn, &self.keys, order_id).await?;
        geo::remove(&mut conn, &self.keys, order_id).await
    }

    async fn find_near(&self, latitude: f64, longitude: f64, radius_km: f64) -> Result<Vec<Order>, BundlError> {
        let mut conn = self.conn.clone();
        let candidate_ids = geo::search_near(&mut conn, &self.keys, latitude, longitude, radius_km).await?;
        let mut orders = Vec::with_capacity(candidate_ids.len());
        for id in candidate_ids {
            if let Some(order) = self.get(id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn pledge(&self, order_id: OrderId, user_id: UserId, pledge_amount: Decimal) -> Result<PledgeOutcome, BundlError> {
        let mut conn = self.conn.clone();
        pledge::pledge(&mut conn, &self.keys, order_id, user_id, pledge_amount).await
    }
}

/// `GET /healthz` liveness check: `PING` against the shared connection.
pub struct RedisHealthCheck(pub ConnectionManager);

#[async_trait]
impl HealthCheck for RedisHealthCheck {
    async fn ping(&self) -> Result<(), BundlError> {
        let mut conn = self.0.clone();
        let _: String =
            redis::cmd("PING").query_async(&mut conn).await.map_err(|e| BundlError::Io(e.to_string()))?;
        Ok(())
    }
}
