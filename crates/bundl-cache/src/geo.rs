//! `orders:geo` — a single geo-indexed set mapping `order:{id}` members to
//! (lat, lon), shared across all ACTIVE orders.

use bundl_types::{BundlError, Order, OrderId};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::geo::{RadiusOptions, Unit};
use rust_decimal::prelude::ToPrimitive;

use crate::keys::KeySpace;

/// Add an order's coordinates to the geo index. The geo entry persists
/// until explicit removal — it carries no TTL of its own.
pub async fn add(conn: &mut ConnectionManager, keys: &KeySpace, order: &Order) -> Result<(), BundlError> {
    let lon = order
        .longitude
        .to_f64()
        .ok_or_else(|| BundlError::Internal("order longitude does not fit in f64".to_string()))?;
    let lat = order
        .latitude
        .to_f64()
        .ok_or_else(|| BundlError::Internal("order latitude does not fit in f64".to_string()))?;

    conn.geo_add::<_, _, ()>(keys.geo_index(), (lon, lat, keys.geo_member(order.id)))
        .await
        .map_err(|e| BundlError::Io(e.to_string()))
}

/// Remove an order from the geo index. Idempotent.
pub async fn remove(conn: &mut ConnectionManager, keys: &KeySpace, order_id: OrderId) -> Result<(), BundlError> {
    conn.zrem::<_, _, ()>(keys.geo_index(), keys.geo_member(order_id))
        .await
        .map_err(|e| BundlError::Io(e.to_string()))
}

/// All order ids within `radius_km` of (lat, lon). Best-effort: a geo hit
/// whose snapshot has since expired is simply absent from the cache and
/// must be filtered out by the caller after a snapshot read.
pub async fn search_near(
    conn: &mut ConnectionManager,
    keys: &KeySpace,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Result<Vec<OrderId>, BundlError> {
    let members: Vec<String> = conn
        .geo_radius(
            keys.geo_index(),
            longitude,
            latitude,
            radius_km,
            Unit::Kilometers,
            RadiusOptions::default(),
        )
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

    Ok(members
        .into_iter()
        .filter_map(|member| member.strip_prefix("order:").and_then(|id| id.parse().ok()))
        .collect())
}
