//! In-process credit ledger backed by a `Mutex<HashMap<...>>`. Used by
//! engine tests and any in-memory deployment of the store/cache stack.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bundl_types::{BundlError, UserId};
use tokio::sync::Mutex;

use crate::ledger::CreditLedger;

/// An in-memory [`CreditLedger`]. A single `tokio::sync::Mutex` stands in
/// for the per-user row lock a real store would take — the whole map is
/// locked for the duration of a mutation, which is fine at test scale.
#[derive(Default)]
pub struct InMemoryCreditLedger {
    balances: Mutex<HashMap<UserId, i64>>,
    seen_topup_keys: Mutex<HashSet<String>>,
}

impl InMemoryCreditLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's starting balance, for test setup.
    pub async fn seed(&self, user_id: UserId, credits: i64) {
        self.balances.lock().await.insert(user_id, credits);
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn try_debit(&self, user_id: UserId, n: i64) -> Result<bool, BundlError> {
        let mut balances = self.balances.lock().await;
        let balance = balances.entry(user_id).or_insert(0);
        if *balance >= n {
            *balance -= n;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn credit(&self, user_id: UserId, n: i64) -> Result<(), BundlError> {
        let mut balances = self.balances.lock().await;
        *balances.entry(user_id).or_insert(0) += n;
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<i64, BundlError> {
        Ok(*self.balances.lock().await.get(&user_id).unwrap_or(&0))
    }

    async fn credit_idempotent(
        &self,
        user_id: UserId,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), BundlError> {
        let mut seen = self.seen_topup_keys.lock().await;
        let key = format!("{user_id}:{idempotency_key}");
        if !seen.insert(key) {
            return Ok(());
        }
        drop(seen);
        self.credit(user_id, amount).await
    }
}
