//! Credit conservation tracker — a test utility, not used by production
//! code, that asserts testable properties 1 and 2 from spec.md §8: every
//! debit that does not end in a persisted pledge side-effect is refunded
//! exactly once, and expiry refunds exactly one credit per participant.

use std::collections::HashMap;

use bundl_types::UserId;

/// Records per-user debits and refunds observed during a test scenario and
/// checks they reconcile to the expected net change.
#[derive(Default)]
pub struct CreditConservationTracker {
    debits: HashMap<UserId, i64>,
    refunds: HashMap<UserId, i64>,
}

impl CreditConservationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_debit(&mut self, user_id: UserId, amount: i64) {
        *self.debits.entry(user_id).or_insert(0) += amount;
    }

    pub fn record_refund(&mut self, user_id: UserId, amount: i64) {
        *self.refunds.entry(user_id).or_insert(0) += amount;
    }

    #[must_use]
    pub fn total_debited(&self, user_id: UserId) -> i64 {
        self.debits.get(&user_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_refunded(&self, user_id: UserId) -> i64 {
        self.refunds.get(&user_id).copied().unwrap_or(0)
    }

    /// True if every debit recorded for `user_id` has a matching refund —
    /// the expected state for a user whose every action either failed or
    /// expired, per I2.
    #[must_use]
    pub fn fully_refunded(&self, user_id: UserId) -> bool {
        self.total_debited(user_id) == self.total_refunded(user_id)
    }

    /// True if `user_id` was refunded strictly less than debited — the
    /// expected state for a user with at least one surviving (ACTIVE or
    /// COMPLETED) pledge.
    #[must_use]
    pub fn partially_refunded(&self, user_id: UserId, expected_net_charge: i64) -> bool {
        self.total_debited(user_id) - self.total_refunded(user_id) == expected_net_charge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_refunded_when_debit_matches_refund() {
        let mut tracker = CreditConservationTracker::new();
        let user = UserId::new();
        tracker.record_debit(user, 1);
        tracker.record_refund(user, 1);
        assert!(tracker.fully_refunded(user));
    }

    #[test]
    fn not_fully_refunded_when_mismatched() {
        let mut tracker = CreditConservationTracker::new();
        let user = UserId::new();
        tracker.record_debit(user, 2);
        tracker.record_refund(user, 1);
        assert!(!tracker.fully_refunded(user));
    }

    #[test]
    fn partially_refunded_tracks_net_charge() {
        let mut tracker = CreditConservationTracker::new();
        let user = UserId::new();
        tracker.record_debit(user, 2);
        tracker.record_refund(user, 1);
        assert!(tracker.partially_refunded(user, 1));
    }

    #[test]
    fn unseen_user_has_zero_totals() {
        let tracker = CreditConservationTracker::new();
        let user = UserId::new();
        assert_eq!(tracker.total_debited(user), 0);
        assert!(tracker.fully_refunded(user));
    }
}
