//! Fire-and-forget lifecycle events posted by the engine to the
//! notification dispatcher. Not durable; must never gate correctness.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Order, OrderId, UserId};

/// One lifecycle moment the engine wants fanned out as a push notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A new order was created and persisted.
    OrderCreated { order: Order },

    /// A pledge was accepted by the scripted cache operation.
    PledgeSuccess {
        order: Order,
        user_id: UserId,
        pledge_amount: Decimal,
    },

    /// A pledge was rejected (not found, not active, already complete).
    PledgeFailed { user_id: UserId, reason: String },

    /// An order crossed its completion threshold.
    OrderCompleted { order: Order },

    /// An order's TTL elapsed before completion.
    OrderExpired { order: Order },

    /// A new order appeared within a geohash cell; broadcast to users
    /// subscribed to nearby discovery for that cell.
    NearbyBroadcast { order_id: OrderId, geohash: String },
}

impl EngineEvent {
    /// The order, if this event carries one, for dispatcher logging.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::OrderCreated { order }
            | Self::PledgeSuccess { order, .. }
            | Self::OrderCompleted { order }
            | Self::OrderExpired { order } => Some(order.id),
            Self::PledgeFailed { .. } => None,
            Self::NearbyBroadcast { order_id, .. } => Some(*order_id),
        }
    }
}
