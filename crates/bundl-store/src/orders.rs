//! The durable order repository (spec §4.2).

use std::collections::HashMap;

use async_trait::async_trait;
use bundl_types::{BundlError, Order, OrderId, OrderStatus, PledgeMap, UserId};
use sqlx::PgPool;
use sqlx::Row;

/// Authoritative record of orders and their terminal state.
///
/// Concurrent mutations are serialized upstream by the cache's scripted
/// pledge (§4.3); a last-writer-wins update here is acceptable per spec.md
/// §4.2.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Create the row in ACTIVE state with the order's initial pledge_map.
    async fn insert(&self, order: &Order) -> Result<(), BundlError>;

    /// Replace the mutable fields after a successful pledge.
    async fn update_pledge(
        &self,
        order_id: OrderId,
        pledge_map: &PledgeMap,
        total_pledge: rust_decimal::Decimal,
        total_users: usize,
        status: OrderStatus,
    ) -> Result<(), BundlError>;

    /// Used on expiry; a no-op if already in the target status.
    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), BundlError>;

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, BundlError>;

    /// All orders currently in ACTIVE state, for boot-time reconciliation.
    async fn list_active(&self) -> Result<Vec<Order>, BundlError>;
}

fn status_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Active => "ACTIVE",
        OrderStatus::Completed => "COMPLETED",
        OrderStatus::Expired => "EXPIRED",
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, BundlError> {
    match raw {
        "ACTIVE" => Ok(OrderStatus::Active),
        "COMPLETED" => Ok(OrderStatus::Completed),
        "EXPIRED" => Ok(OrderStatus::Expired),
        other => Err(BundlError::Internal(format!("unknown order status in store: {other}"))),
    }
}

fn row_to_order(row: sqlx::postgres::PgRow) -> Result<Order, BundlError> {
    let pledge_map_json: serde_json::Value = row.try_get("pledge_map").map_err(|e| BundlError::Io(e.to_string()))?;
    let pledge_map: PledgeMap = serde_json::from_value(pledge_map_json)?;
    let status: String = row.try_get("status").map_err(|e| BundlError::Io(e.to_string()))?;

    Ok(Order {
        id: OrderId(row.try_get("id").map_err(|e| BundlError::Io(e.to_string()))?),
        status: parse_status(&status)?,
        creator_id: UserId(row.try_get("creator_id").map_err(|e| BundlError::Io(e.to_string()))?),
        amount_needed: row.try_get("amount_needed").map_err(|e| BundlError::Io(e.to_string()))?,
        pledge_map,
        total_pledge: row.try_get("total_pledge").map_err(|e| BundlError::Io(e.to_string()))?,
        total_users: {
            let n: i32 = row.try_get("total_users").map_err(|e| BundlError::Io(e.to_string()))?;
            n as usize
        },
        platform: row.try_get("platform").map_err(|e| BundlError::Io(e.to_string()))?,
        latitude: row.try_get("latitude").map_err(|e| BundlError::Io(e.to_string()))?,
        longitude: row.try_get("longitude").map_err(|e| BundlError::Io(e.to_string()))?,
    })
}

/// Postgres-backed [`OrderRepository`].
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), BundlError> {
        sqlx::query(
            r#"INSERT INTO "order"
               (id, status, creator_id, amount_needed, pledge_map, total_pledge, total_users, platform, latitude, longitude)
               VALUES ($1, $2::order_status, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(order.id.0)
        .bind(status_str(order.status))
        .bind(order.creator_id.0)
        .bind(order.amount_needed)
        .bind(serde_json::to_value(&order.pledge_map)?)
        .bind(order.total_pledge)
        .bind(order.total_users as i32)
        .bind(&order.platform)
        .bind(order.latitude)
        .bind(order.longitude)
        .execute(&self.pool)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

        Ok(())
    }

    async fn update_pledge(
        &self,
        order_id: OrderId,
        pledge_map: &PledgeMap,
        total_pledge: rust_decimal::Decimal,
        total_users: usize,
        status: OrderStatus,
    ) -> Result<(), BundlError> {
        sqlx::query(
            r#"UPDATE "order" SET pledge_map = $2, total_pledge = $3, total_users = $4, status = $5::order_status
               WHERE id = $1"#,
        )
        .bind(order_id.0)
        .bind(serde_json::to_value(pledge_map)?)
        .bind(total_pledge)
        .bind(total_users as i32)
        .bind(status_str(status))
        .execute(&self.pool)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

        Ok(())
    }

    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), BundlError> {
        sqlx::query(r#"UPDATE "order" SET status = $2::order_status WHERE id = $1"#)
            .bind(order_id.0)
            .bind(status_str(status))
            .execute(&self.pool)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, BundlError> {
        let row = sqlx::query(r#"SELECT * FROM "order" WHERE id = $1"#)
            .bind(order_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        row.map(row_to_order).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Order>, BundlError> {
        let rows = sqlx::query(r#"SELECT * FROM "order" WHERE status = 'ACTIVE'::order_status"#)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BundlError::Io(e.to_string()))?;

        rows.into_iter().map(row_to_order).collect()
    }
}

/// In-memory [`OrderRepository`] for engine tests.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: tokio::sync::Mutex<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), BundlError> {
        self.orders.lock().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_pledge(
        &self,
        order_id: OrderId,
        pledge_map: &PledgeMap,
        total_pledge: rust_decimal::Decimal,
        total_users: usize,
        status: OrderStatus,
    ) -> Result<(), BundlError> {
        let mut orders = self.orders.lock().await;
        let order = orders.get_mut(&order_id).ok_or(BundlError::OrderNotFound)?;
        order.pledge_map = pledge_map.clone();
        order.total_pledge = total_pledge;
        order.total_users = total_users;
        order.status = status;
        Ok(())
    }

    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), BundlError> {
        let mut orders = self.orders.lock().await;
        let order = orders.get_mut(&order_id).ok_or(BundlError::OrderNotFound)?;
        order.status = status;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, BundlError> {
        Ok(self.orders.lock().await.get(&order_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Order>, BundlError> {
        Ok(self
            .orders
            .lock()
            .await
            .values()
            .filter(|o| o.is_active())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let repo = InMemoryOrderRepository::new();
        let order = Order::dummy_active(Decimal::new(100, 0));
        repo.insert(&order).await.unwrap();
        let fetched = repo.get(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, order.id);
        assert!(fetched.is_active());
    }

    #[tokio::test]
    async fn update_pledge_then_list_active_reflects_completion() {
        let repo = InMemoryOrderRepository::new();
        let order = Order::dummy_active(Decimal::new(100, 0));
        repo.insert(&order).await.unwrap();

        let mut map = PledgeMap::new();
        let user = UserId::new();
        map.insert(user, Decimal::new(100, 0));
        repo.update_pledge(order.id, &map, Decimal::new(100, 0), 1, OrderStatus::Completed)
            .await
            .unwrap();

        assert!(repo.list_active().await.unwrap().is_empty());
        let fetched = repo.get(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn set_status_on_unknown_order_errors() {
        let repo = InMemoryOrderRepository::new();
        let err = repo.set_status(OrderId::new(), OrderStatus::Expired).await.unwrap_err();
        assert!(matches!(err, BundlError::OrderNotFound));
    }
}
