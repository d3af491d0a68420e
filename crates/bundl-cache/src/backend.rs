//! The cache contract `bundl-engine` depends on, so it can be exercised
//! against [`crate::InMemoryOrderCache`] in tests without a running Redis.

use async_trait::async_trait;
use bundl_types::{BundlError, Order, OrderId, UserId};
use rust_decimal::Decimal;

use crate::pledge::PledgeOutcome;

#[async_trait]
pub trait OrderCacheBackend: Send + Sync {
    async fn create(&self, order: &Order, ttl_seconds: u64) -> Result<(), BundlError>;

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, BundlError>;

    async fn delete(&self, order_id: OrderId) -> Result<(), BundlError>;

    async fn find_near(&self, latitude: f64, longitude: f64, radius_km: f64) -> Result<Vec<Order>, BundlError>;

    async fn pledge(&self, order_id: OrderId, user_id: UserId, pledge_amount: Decimal) -> Result<PledgeOutcome, BundlError>;
}
