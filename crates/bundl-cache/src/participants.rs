//! `order:{id}:participants` — set of user ids who have ever pledged,
//! kept TTL-aligned with the order snapshot.

use bundl_types::{BundlError, OrderId, UserId};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::keys::KeySpace;

/// Initialize the participants set with the order's starting pledgers
/// (possibly empty, for a fresh order with no initial pledge) and a TTL
/// matching the snapshot.
pub async fn init(
    conn: &mut ConnectionManager,
    keys: &KeySpace,
    order_id: OrderId,
    initial_members: &[UserId],
    ttl_seconds: u64,
) -> Result<(), BundlError> {
    if initial_members.is_empty() {
        // An empty set and an absent key are equivalent in Redis; nothing
        // to create or expire.
        return Ok(());
    }

    let key = keys.participants(order_id);
    let members: Vec<String> = initial_members.iter().map(ToString::to_string).collect();
    conn.sadd::<_, _, ()>(&key, members)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

    conn.expire::<_, ()>(&key, ttl_seconds as i64)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))
}

/// Remove the participants set. Idempotent.
pub async fn delete(conn: &mut ConnectionManager, keys: &KeySpace, order_id: OrderId) -> Result<(), BundlError> {
    conn.del::<_, ()>(keys.participants(order_id))
        .await
        .map_err(|e| BundlError::Io(e.to_string()))
}
