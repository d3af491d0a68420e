//! Order types for the Bundl group-order coordination engine.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, UserId};

/// Additive per-user pledge amounts. Invariant I6: a user appears at most
/// once as a key.
pub type PledgeMap = HashMap<UserId, Decimal>;

/// Lifecycle status of an order (spec.md §4.5.6: ACTIVE -> {COMPLETED, EXPIRED}).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Completed,
    Expired,
}

impl OrderStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A pending collective purchase (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub creator_id: UserId,
    pub amount_needed: Decimal,
    pub pledge_map: PledgeMap,
    pub total_pledge: Decimal,
    pub total_users: usize,
    pub platform: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl Order {
    /// Construct a freshly-created ACTIVE order with an empty pledge map.
    #[must_use]
    pub fn new(
        creator_id: UserId,
        amount_needed: Decimal,
        platform: impl Into<String>,
        latitude: Decimal,
        longitude: Decimal,
    ) -> Self {
        Self {
            id: OrderId::new(),
            status: OrderStatus::Active,
            creator_id,
            amount_needed,
            pledge_map: PledgeMap::new(),
            total_pledge: Decimal::ZERO,
            total_users: 0,
            platform: platform.into(),
            latitude,
            longitude,
        }
    }

    /// Record the creator's own initial pledge (spec.md §4.5.1 step 2).
    /// Only meaningful to call once, immediately after [`Order::new`].
    pub fn set_initial_pledge(&mut self, amount: Decimal) {
        if amount.is_sign_positive() && !amount.is_zero() {
            self.pledge_map.insert(self.creator_id, amount);
            self.total_pledge = amount;
            self.total_users = 1;
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Invariant I3: a COMPLETED order satisfies `total_pledge >= amount_needed`.
    #[must_use]
    pub fn meets_threshold(&self) -> bool {
        self.total_pledge >= self.amount_needed
    }

    #[must_use]
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.pledge_map.contains_key(&user_id)
    }

    /// Redact the pledge map down to a single caller's own entry, per
    /// spec.md §4.5.4 step 4 (ACTIVE orders never reveal other pledgers).
    #[must_use]
    pub fn redacted_for(&self, caller: UserId) -> PledgeMap {
        let mut redacted = PledgeMap::new();
        if let Some(amount) = self.pledge_map.get(&caller) {
            redacted.insert(caller, *amount);
        }
        redacted
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// An ACTIVE order with no pledges yet, for use in tests.
    pub fn dummy_active(amount_needed: Decimal) -> Self {
        Self::new(
            UserId::new(),
            amount_needed,
            "doordash",
            Decimal::new(377_749, 4),
            Decimal::new(-1_224_194, 4),
        )
    }

    /// An ACTIVE order created by `creator_id` with an initial pledge applied.
    pub fn dummy_with_creator_pledge(
        creator_id: UserId,
        amount_needed: Decimal,
        initial_pledge: Decimal,
    ) -> Self {
        let mut order = Self::new(
            creator_id,
            amount_needed,
            "doordash",
            Decimal::new(377_749, 4),
            Decimal::new(-1_224_194, 4),
        );
        order.set_initial_pledge(initial_pledge);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_is_active_and_empty() {
        let order = Order::dummy_active(Decimal::new(100, 0));
        assert!(order.is_active());
        assert_eq!(order.total_pledge, Decimal::ZERO);
        assert_eq!(order.total_users, 0);
        assert!(order.pledge_map.is_empty());
    }

    #[test]
    fn initial_pledge_seeds_pledge_map() {
        let creator = UserId::new();
        let order = Order::dummy_with_creator_pledge(creator, Decimal::new(100, 0), Decimal::new(40, 0));
        assert_eq!(order.total_pledge, Decimal::new(40, 0));
        assert_eq!(order.total_users, 1);
        assert_eq!(order.pledge_map.get(&creator), Some(&Decimal::new(40, 0)));
    }

    #[test]
    fn zero_initial_pledge_leaves_map_empty() {
        let creator = UserId::new();
        let order = Order::dummy_with_creator_pledge(creator, Decimal::new(100, 0), Decimal::ZERO);
        assert_eq!(order.total_users, 0);
        assert!(order.pledge_map.is_empty());
    }

    #[test]
    fn meets_threshold_is_inclusive() {
        let mut order = Order::dummy_active(Decimal::new(100, 0));
        order.total_pledge = Decimal::new(100, 0);
        assert!(order.meets_threshold());
    }

    #[test]
    fn redacted_for_non_participant_is_empty() {
        let order = Order::dummy_active(Decimal::new(100, 0));
        let stranger = UserId::new();
        assert!(order.redacted_for(stranger).is_empty());
    }

    #[test]
    fn redacted_for_participant_hides_others() {
        let creator = UserId::new();
        let mut order = Order::dummy_with_creator_pledge(creator, Decimal::new(100, 0), Decimal::new(40, 0));
        let other = UserId::new();
        order.pledge_map.insert(other, Decimal::new(30, 0));
        order.total_pledge += Decimal::new(30, 0);
        order.total_users += 1;

        let redacted = order.redacted_for(other);
        assert_eq!(redacted.len(), 1);
        assert_eq!(redacted.get(&other), Some(&Decimal::new(30, 0)));
    }

    #[test]
    fn status_display() {
        assert_eq!(format!("{}", OrderStatus::Active), "ACTIVE");
        assert_eq!(format!("{}", OrderStatus::Completed), "COMPLETED");
        assert_eq!(format!("{}", OrderStatus::Expired), "EXPIRED");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatus::Active.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
    }
}
