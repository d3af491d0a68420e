//! An in-memory [`OrderCacheBackend`], so `bundl-engine` can be exercised in
//! tests without a running Redis. Re-implements the scripted pledge's
//! transition logic (see [`crate::pledge`]'s Lua script) in plain Rust —
//! same steps, same rejections, same all-or-nothing visibility, just behind
//! a `tokio::sync::Mutex` instead of a single `EVAL`.

use std::collections::HashMap;

use bundl_types::{BundlError, Order, OrderId, UserId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::Mutex;

use crate::backend::OrderCacheBackend;
use crate::pledge::{PledgeOutcome, PledgeRejection};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two (lat, lon) points in kilometers.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (lat1.to_radians(), lon1.to_radians(), lat2.to_radians(), lon2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[derive(Default)]
struct Store {
    orders: HashMap<OrderId, Order>,
}

/// A `Mutex<HashMap<..>>`-backed fake of the live cache. TTL expiry is not
/// simulated — tests that need expiry behavior drive it through
/// `OrderEngine::handle_expiry` directly rather than waiting on a clock.
#[derive(Default)]
pub struct InMemoryOrderCache {
    store: Mutex<Store>,
}

impl InMemoryOrderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OrderCacheBackend for InMemoryOrderCache {
    async fn create(&self, order: &Order, _ttl_seconds: u64) -> Result<(), BundlError> {
        let mut store = self.store.lock().await;
        store.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, BundlError> {
        let store = self.store.lock().await;
        Ok(store.orders.get(&order_id).cloned())
    }

    async fn delete(&self, order_id: OrderId) -> Result<(), BundlError> {
        let mut store = self.store.lock().await;
        store.orders.remove(&order_id);
        Ok(())
    }

    async fn find_near(&self, latitude: f64, longitude: f64, radius_km: f64) -> Result<Vec<Order>, BundlError> {
        let store = self.store.lock().await;
        let mut matches = Vec::new();
        for order in store.orders.values() {
            let lat = order
                .latitude
                .to_f64()
                .ok_or_else(|| BundlError::Internal("order latitude does not fit in f64".to_string()))?;
            let lon = order
                .longitude
                .to_f64()
                .ok_or_else(|| BundlError::Internal("order longitude does not fit in f64".to_string()))?;
            if haversine_km(latitude, longitude, lat, lon) <= radius_km {
                matches.push(order.clone());
            }
        }
        Ok(matches)
    }

    async fn pledge(&self, order_id: OrderId, user_id: UserId, pledge_amount: Decimal) -> Result<PledgeOutcome, BundlError> {
        let mut store = self.store.lock().await;

        let Some(order) = store.orders.get_mut(&order_id) else {
            return Ok(PledgeOutcome::Rejected { reason: PledgeRejection::NotFound });
        };
        if !order.is_active() {
            return Ok(PledgeOutcome::Rejected { reason: PledgeRejection::NotActive });
        }
        if order.meets_threshold() {
            return Ok(PledgeOutcome::Rejected { reason: PledgeRejection::AlreadyComplete });
        }

        let is_new = !order.pledge_map.contains_key(&user_id);
        *order.pledge_map.entry(user_id).or_insert(Decimal::ZERO) += pledge_amount;
        order.total_pledge += pledge_amount;
        if is_new {
            order.total_users += 1;
        }

        let transitioned = order.meets_threshold();
        if transitioned {
            order.status = bundl_types::OrderStatus::Completed;
        }

        let result = order.clone();
        if transitioned {
            store.orders.remove(&order_id);
        }

        Ok(PledgeOutcome::Accepted { order: result, transitioned_to_completed: transitioned })
    }
}
