//! The credit ledger contract (spec §4.1).

use async_trait::async_trait;
use bundl_types::{BundlError, UserId};

/// Per-user integer credit balance with transactional debit/credit.
///
/// Implementations MUST serialize `try_debit`/`credit` with respect to
/// concurrent calls for the same user (row-level lock or equivalent).
/// On any underlying store error, the operation MUST be treated as not
/// performed — callers rely on this to decide whether a refund is owed.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Atomically decrement `user_id`'s balance by `n` if it is `>= n`.
    /// Returns `false`, with no side effect, if the balance is insufficient.
    async fn try_debit(&self, user_id: UserId, n: i64) -> Result<bool, BundlError>;

    /// Atomically increment `user_id`'s balance by `n`.
    async fn credit(&self, user_id: UserId, n: i64) -> Result<(), BundlError>;

    /// Read the current balance. Weaker consistency than debit/credit is
    /// acceptable — this is a best-effort read, not used to gate mutation.
    async fn get(&self, user_id: UserId) -> Result<i64, BundlError>;

    /// Credit `amount` exactly once per distinct `idempotency_key`, for the
    /// IAP top-up webhook seam. A replayed webhook delivery with the same
    /// key is a no-op rather than a double credit.
    async fn credit_idempotent(
        &self,
        user_id: UserId,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), BundlError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCreditLedger;

    #[tokio::test]
    async fn trait_object_is_usable() {
        let ledger: Box<dyn CreditLedger> = Box::new(InMemoryCreditLedger::new());
        let user = UserId::new();
        ledger.credit(user, 5).await.unwrap();
        assert_eq!(ledger.get(user).await.unwrap(), 5);
    }
}
