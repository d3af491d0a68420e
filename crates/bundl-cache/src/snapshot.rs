//! Serialized order snapshot storage: `order:{id}` → JSON, TTL-bearing.

use bundl_types::{BundlError, Order, OrderId};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::keys::KeySpace;

/// Write a freshly-created order's snapshot with the given TTL.
pub async fn set(
    conn: &mut ConnectionManager,
    keys: &KeySpace,
    order: &Order,
    ttl_seconds: u64,
) -> Result<(), BundlError> {
    let payload = serde_json::to_string(order)?;
    conn.set_ex::<_, _, ()>(keys.snapshot(order.id), payload, ttl_seconds)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))
}

/// Read a snapshot, if present. A miss (absent or expired between the
/// caller's earlier lookup and this read) returns `Ok(None)`, never an
/// error — callers decide whether that's a hard miss or a fallback-to-store
/// case.
pub async fn get(conn: &mut ConnectionManager, keys: &KeySpace, order_id: OrderId) -> Result<Option<Order>, BundlError> {
    let raw: Option<String> = conn
        .get(keys.snapshot(order_id))
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

    raw.map(|json| serde_json::from_str(&json).map_err(BundlError::from))
        .transpose()
}

/// Remove the snapshot key. Idempotent — deleting an absent key is a no-op.
pub async fn delete(conn: &mut ConnectionManager, keys: &KeySpace, order_id: OrderId) -> Result<(), BundlError> {
    conn.del::<_, ()>(keys.snapshot(order_id))
        .await
        .map_err(|e| BundlError::Io(e.to_string()))
}
