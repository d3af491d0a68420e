//! The order engine (component C5): orchestrates createOrder, pledgeToOrder,
//! getOrderStatus, getActiveOrdersNear, handleExpiry, and boot-time
//! reconciliation. Owns the credit charge/refund choreography and is the
//! sole mutator of both the durable store and the live cache.
//!
//! Ordering discipline mirrors the teacher's Tier 1 settler: debit first,
//! attempt the side effect, and roll back (refund) only on the specific
//! failure paths the spec names — never a generic catch-all rollback.

use std::sync::Arc;

use bundl_cache::{OrderCacheBackend, PledgeOutcome, PledgeRejection};
use bundl_ledger::CreditLedger;
use bundl_store::{OrderRepository, UserRepository};
use bundl_types::{BundlConfig, BundlError, EngineEvent, Order, OrderId, OrderStatus, PledgeMap, UserId};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, Mutex};

use crate::expiry_guard::ExpiryGuard;
use crate::geohash;

const EXPIRY_GUARD_CAPACITY: usize = 100_000;

/// The response to a successful `getOrderStatus` call, including the
/// redaction and phone-map enrichment rules from spec.md §4.5.4.
#[derive(Debug, Clone)]
pub struct OrderStatusView {
    pub order: Order,
    /// Present only for COMPLETED orders: participant -> phone number.
    pub phone_map: Option<std::collections::HashMap<UserId, String>>,
    /// Present only for EXPIRED orders.
    pub expiry_note: Option<String>,
}

/// The response to a successful `pledgeToOrder` call.
#[derive(Debug, Clone)]
pub struct PledgeResponse {
    pub order: Order,
    pub transitioned_to_completed: bool,
    pub phone_map: Option<std::collections::HashMap<UserId, String>>,
}

pub struct OrderEngine {
    ledger: Arc<dyn CreditLedger>,
    store: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn OrderCacheBackend>,
    events: mpsc::Sender<EngineEvent>,
    expiry_guard: Mutex<ExpiryGuard>,
    config: BundlConfig,
}

impl OrderEngine {
    #[must_use]
    pub fn new(
        ledger: Arc<dyn CreditLedger>,
        store: Arc<dyn OrderRepository>,
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn OrderCacheBackend>,
        events: mpsc::Sender<EngineEvent>,
        config: BundlConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            users,
            cache,
            events,
            expiry_guard: Mutex::new(ExpiryGuard::new(EXPIRY_GUARD_CAPACITY)),
            config,
        }
    }

    fn emit(&self, event: EngineEvent) {
        // Fire-and-forget: a full channel or a dead receiver must never
        // surface to the caller or roll back engine state.
        if let Err(err) = self.events.try_send(event) {
            tracing::warn!(error = %err, "dropped engine event, notification dispatcher did not keep up");
        }
    }

    /// spec.md §4.5.1
    pub async fn create_order(
        &self,
        user_id: UserId,
        amount_needed: Decimal,
        platform: String,
        latitude: Decimal,
        longitude: Decimal,
        initial_pledge: Option<Decimal>,
        ttl_seconds: Option<u64>,
    ) -> Result<Order, BundlError> {
        if amount_needed < self.config.order_min_amount {
            return Err(BundlError::Validation {
                reason: format!("amountNeeded must be at least {}", self.config.order_min_amount),
            });
        }

        let cost = self.config.credit_cost_per_action;
        if !self.ledger.try_debit(user_id, cost).await? {
            return Err(BundlError::InsufficientCredits);
        }

        let mut order = Order::new(user_id, amount_needed, platform, latitude, longitude);
        if let Some(initial) = initial_pledge {
            order.set_initial_pledge(initial);
        }

        if let Err(err) = self.store.insert(&order).await {
            // Step 7: any failure after the debit and before the durable
            // insert commits must refund.
            self.refund_after_failure(user_id, cost, "store insert failed during createOrder").await;
            return Err(err);
        }

        let ttl = ttl_seconds.unwrap_or(self.config.default_order_expiry_seconds);
        if let Err(err) = self.cache.create(&order, ttl).await {
            self.refund_after_failure(user_id, cost, "cache write failed during createOrder").await;
            return Err(err);
        }

        self.emit(EngineEvent::OrderCreated { order: order.clone() });
        self.emit(EngineEvent::NearbyBroadcast {
            order_id: order.id,
            geohash: geohash::encode(order.latitude, order.longitude),
        });
        Ok(order)
    }

    async fn refund_after_failure(&self, user_id: UserId, amount: i64, context: &str) {
        if let Err(err) = self.ledger.credit(user_id, amount).await {
            tracing::error!(%user_id, context, error = %err, "failed to refund credit after createOrder failure — I2 may be violated");
        }
    }

    /// spec.md §4.5.2
    pub async fn pledge_to_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        pledge_amount: Decimal,
    ) -> Result<PledgeResponse, BundlError> {
        if pledge_amount < self.config.pledge_min_amount {
            return Err(BundlError::Validation {
                reason: format!("pledgeAmount must be at least {}", self.config.pledge_min_amount),
            });
        }

        let cost = self.config.credit_cost_per_action;
        if !self.ledger.try_debit(user_id, cost).await? {
            return Err(BundlError::InsufficientCredits);
        }

        let outcome = self.cache.pledge(order_id, user_id, pledge_amount).await?;

        let (order, transitioned) = match outcome {
            PledgeOutcome::Rejected { reason } => {
                self.refund_after_failure(user_id, cost, "scripted pledge rejected").await;
                let event_reason = reason_string(reason);
                self.emit(EngineEvent::PledgeFailed { user_id, reason: event_reason.clone() });
                return Err(match reason {
                    PledgeRejection::NotFound => BundlError::OrderNotFound,
                    PledgeRejection::NotActive => BundlError::OrderNotActive,
                    PledgeRejection::AlreadyComplete => BundlError::OrderFullyPledged,
                });
            }
            PledgeOutcome::Accepted { order, transitioned_to_completed } => (order, transitioned_to_completed),
        };

        // Step 4: durable update. A failure here is the accepted "credit
        // charged, cache correct, store stale" window documented in
        // spec.md §9 — the cache remains source of truth, no refund.
        if let Err(err) = self
            .store
            .update_pledge(order.id, &order.pledge_map, order.total_pledge, order.total_users, order.status)
            .await
        {
            tracing::warn!(order_id = %order.id, error = %err, "durable pledge update failed; cache and store are now diverged, reconcile lazily");
        }

        self.emit(EngineEvent::PledgeSuccess { order: order.clone(), user_id, pledge_amount });

        let phone_map = if transitioned {
            self.emit(EngineEvent::OrderCompleted { order: order.clone() });
            Some(self.resolve_phone_map(&order.pledge_map).await)
        } else {
            None
        };

        Ok(PledgeResponse { order, transitioned_to_completed: transitioned, phone_map })
    }

    async fn resolve_phone_map(&self, pledge_map: &PledgeMap) -> std::collections::HashMap<UserId, String> {
        let mut phones = std::collections::HashMap::with_capacity(pledge_map.len());
        for &user_id in pledge_map.keys() {
            match self.users.get(user_id).await {
                Ok(Some(user)) => {
                    phones.insert(user_id, user.phone_number);
                }
                Ok(None) => tracing::warn!(%user_id, "participant missing from user store while resolving phone map"),
                Err(err) => tracing::warn!(%user_id, error = %err, "failed to resolve participant phone number"),
            }
        }
        phones
    }

    /// spec.md §4.5.3
    pub async fn get_active_orders_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
    ) -> Result<Vec<Order>, BundlError> {
        let radius = radius_km.unwrap_or(self.config.default_search_radius_km);
        self.cache.find_near(latitude, longitude, radius).await
    }

    /// spec.md §4.5.4
    pub async fn get_order_status(&self, user_id: UserId, order_id: OrderId) -> Result<OrderStatusView, BundlError> {
        let order = match self.cache.get(order_id).await? {
            Some(order) => order,
            None => self.store.get(order_id).await?.ok_or(BundlError::OrderNotFound)?,
        };

        if !order.is_participant(user_id) {
            return Err(BundlError::OrderNotFound);
        }

        match order.status {
            OrderStatus::Active => {
                let mut redacted = order.clone();
                redacted.pledge_map = order.redacted_for(user_id);
                Ok(OrderStatusView { order: redacted, phone_map: None, expiry_note: None })
            }
            OrderStatus::Completed => {
                let phone_map = self.resolve_phone_map(&order.pledge_map).await;
                Ok(OrderStatusView { order, phone_map: Some(phone_map), expiry_note: None })
            }
            OrderStatus::Expired => Ok(OrderStatusView {
                order,
                phone_map: None,
                expiry_note: Some("Your credit was refunded when this order expired.".to_string()),
            }),
        }
    }

    /// spec.md §4.5.5, triggered by the expiry watcher (C4).
    pub async fn handle_expiry(&self, order_id: OrderId) -> Result<(), BundlError> {
        let Some(order) = self.store.get(order_id).await? else {
            return Ok(());
        };
        if !order.is_active() {
            // Idempotent: a second invocation (or a race with completion)
            // finds the row already terminal and returns without refunding.
            return Ok(());
        }

        self.store.set_status(order_id, OrderStatus::Expired).await?;
        self.cache.delete(order_id).await?;

        // Only mark as seen once the transition has actually landed: if
        // either call above had failed and propagated via `?`, a retried
        // watcher event must still be able to run the refund fan-out below,
        // not be swallowed by a guard with no corresponding unmark.
        if !self.expiry_guard.lock().await.mark(order_id) {
            return Ok(());
        }

        let cost = self.config.credit_cost_per_action;
        for &participant in order.pledge_map.keys() {
            if let Err(err) = self.ledger.credit(participant, cost).await {
                tracing::error!(%order_id, user_id = %participant, error = %err, "expiry refund failed for participant, continuing fan-out");
            }
        }

        let mut expired_order = order;
        expired_order.status = OrderStatus::Expired;
        self.emit(EngineEvent::OrderExpired { order: expired_order });
        Ok(())
    }

    /// Startup scan required by spec.md §5: re-hydrate the live cache for
    /// ACTIVE orders whose deadline hasn't passed, and expire those whose
    /// deadline has — closing the race where the process dies between
    /// expiry firing and refund fan-out.
    pub async fn reconcile_on_boot(&self) -> Result<(), BundlError> {
        let active_orders = self.store.list_active().await?;
        tracing::info!(count = active_orders.len(), "reconciling ACTIVE orders on boot");

        for order in active_orders {
            match self.cache.get(order.id).await? {
                Some(_) => {
                    // Already live in the cache (e.g. a fast restart); nothing to do.
                }
                None => {
                    // Not present in the cache: either its TTL lapsed while
                    // the process was down, or it was never written. Either
                    // way the safe action per §5 is to expire it.
                    self.handle_expiry(order.id).await?;
                }
            }
        }
        Ok(())
    }
}

fn reason_string(reason: PledgeRejection) -> String {
    match reason {
        PledgeRejection::NotFound => "not_found".to_string(),
        PledgeRejection::NotActive => "not_active".to_string(),
        PledgeRejection::AlreadyComplete => "already_complete".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use bundl_cache::InMemoryOrderCache;
    use bundl_ledger::InMemoryCreditLedger;
    use bundl_store::{InMemoryOrderRepository, InMemoryUserRepository};
    use bundl_types::User;

    use super::*;
    use crate::conservation::CreditConservationTracker;

    fn harness() -> (OrderEngine, mpsc::Receiver<EngineEvent>, Arc<InMemoryCreditLedger>) {
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let store = Arc::new(InMemoryOrderRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let cache: Arc<dyn OrderCacheBackend> = Arc::new(InMemoryOrderCache::new());
        let (tx, rx) = mpsc::channel(64);
        let engine = OrderEngine::new(ledger.clone(), store, users, cache, tx, BundlConfig::test_default());
        (engine, rx, ledger)
    }

    async fn seeded_user(users: &InMemoryUserRepository, ledger: &InMemoryCreditLedger, credits: i64) -> UserId {
        let user = User::dummy(credits);
        ledger.seed(user.id, credits).await;
        users.seed(user.clone()).await;
        user.id
    }

    // S1 (spec.md §8): createOrder debits one credit and produces an ACTIVE
    // order with the caller as its only participant.
    #[tokio::test]
    async fn create_order_debits_one_credit_and_emits_order_created() {
        let (engine, mut events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 5).await;

        let order = engine
            .create_order(creator, Decimal::new(100, 0), "doordash".to_string(), Decimal::new(377_749, 4), Decimal::new(-1_224_194, 4), None, None)
            .await
            .unwrap();

        assert!(order.is_active());
        assert_eq!(ledger.get(creator).await.unwrap(), 4);
        match events.recv().await.unwrap() {
            EngineEvent::OrderCreated { order: emitted } => assert_eq!(emitted.id, order.id),
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.unwrap() {
            EngineEvent::NearbyBroadcast { order_id, geohash } => {
                assert_eq!(order_id, order.id);
                assert_eq!(geohash, "9q8yy");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_order_below_minimum_is_rejected_without_debit() {
        let (engine, _events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 5).await;

        let err = engine
            .create_order(creator, Decimal::new(0, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, BundlError::Validation { .. }));
        assert_eq!(ledger.get(creator).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn create_order_with_insufficient_credits_fails() {
        let (engine, _events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 0).await;

        let err = engine
            .create_order(creator, Decimal::new(100, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, BundlError::InsufficientCredits));
    }

    // S2: two pledges that together meet the threshold transition the order
    // to COMPLETED and both participants are visible in the final pledge map.
    #[tokio::test]
    async fn pledge_accumulates_and_completes_on_threshold() {
        let (engine, mut events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 5).await;
        let order = engine
            .create_order(creator, Decimal::new(100, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, Some(Decimal::new(40, 0)), None)
            .await
            .unwrap();
        let _ = events.recv().await; // OrderCreated
        let _ = events.recv().await; // NearbyBroadcast

        let pledger = UserId::new();
        ledger.seed(pledger, 5).await;
        let response = engine.pledge_to_order(pledger, order.id, Decimal::new(60, 0)).await.unwrap();

        assert!(response.transitioned_to_completed);
        assert_eq!(response.order.total_pledge, Decimal::new(100, 0));
        assert_eq!(response.order.pledge_map.len(), 2);
        assert_eq!(ledger.get(pledger).await.unwrap(), 4);

        match events.recv().await.unwrap() {
            EngineEvent::PledgeSuccess { user_id, .. } => assert_eq!(user_id, pledger),
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.unwrap() {
            EngineEvent::OrderCompleted { order } => assert_eq!(order.id, response.order.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    // S3: pledging against an order that already met its threshold is
    // rejected and the attempted debit is refunded.
    #[tokio::test]
    async fn pledge_against_completed_order_refunds_the_debit() {
        let (engine, _events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 5).await;
        let order = engine
            .create_order(creator, Decimal::new(50, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, Some(Decimal::new(50, 0)), None)
            .await
            .unwrap();
        assert!(order.meets_threshold());

        let latecomer = UserId::new();
        ledger.seed(latecomer, 5).await;
        let err = engine.pledge_to_order(latecomer, order.id, Decimal::new(1, 0)).await.unwrap_err();

        // The in-memory cache removes a completed order on transition, so a
        // later pledge against the same id sees "not found" rather than
        // "already complete" — mirrors the scripted backend's DEL-then-GET
        // ordering.
        assert!(matches!(err, BundlError::OrderNotFound));
        assert_eq!(ledger.get(latecomer).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn pledge_against_unknown_order_refunds_and_reports_not_found() {
        let (engine, _events, ledger) = harness();
        let pledger = UserId::new();
        ledger.seed(pledger, 5).await;

        let err = engine.pledge_to_order(pledger, OrderId::new(), Decimal::new(10, 0)).await.unwrap_err();

        assert!(matches!(err, BundlError::OrderNotFound));
        assert_eq!(ledger.get(pledger).await.unwrap(), 5);
    }

    // S4: getOrderStatus redacts other participants' pledges for an ACTIVE
    // order but reveals the full pledge and phone map once COMPLETED.
    #[tokio::test]
    async fn get_order_status_redacts_active_orders_for_non_creator() {
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let store = Arc::new(InMemoryOrderRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let cache: Arc<dyn OrderCacheBackend> = Arc::new(InMemoryOrderCache::new());
        let (tx, _rx) = mpsc::channel(64);
        let engine = OrderEngine::new(ledger.clone(), store, users.clone(), cache, tx, BundlConfig::test_default());

        let creator = seeded_user(&users, &ledger, 5).await;
        let order = engine
            .create_order(creator, Decimal::new(100, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, Some(Decimal::new(40, 0)), None)
            .await
            .unwrap();

        let other = seeded_user(&users, &ledger, 5).await;
        engine.pledge_to_order(other, order.id, Decimal::new(10, 0)).await.unwrap();

        let view = engine.get_order_status(creator, order.id).await.unwrap();
        assert_eq!(view.order.pledge_map.len(), 1);
        assert!(view.order.pledge_map.contains_key(&creator));
        assert!(view.phone_map.is_none());
    }

    #[tokio::test]
    async fn get_order_status_for_non_participant_is_not_found() {
        let (engine, _events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 5).await;
        let order = engine
            .create_order(creator, Decimal::new(100, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, None, None)
            .await
            .unwrap();

        let stranger = UserId::new();
        let err = engine.get_order_status(stranger, order.id).await.unwrap_err();
        assert!(matches!(err, BundlError::OrderNotFound));
    }

    // S5: getActiveOrdersNear only returns orders within the given radius.
    #[tokio::test]
    async fn get_active_orders_near_filters_by_radius() {
        let (engine, _events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 5).await;
        let near = engine
            .create_order(creator, Decimal::new(50, 0), "doordash".to_string(), Decimal::new(377_749, 4), Decimal::new(-1_224_194, 4), None, None)
            .await
            .unwrap();

        ledger.seed(creator, 5).await;
        engine
            .create_order(creator, Decimal::new(50, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, None, None)
            .await
            .unwrap();

        let hits = engine.get_active_orders_near(37.7749, -122.4194, Some(5.0)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, near.id);
    }

    // S6: an expired order refunds every participant exactly once and is
    // removed from the cache; a second handleExpiry call is a no-op.
    #[tokio::test]
    async fn handle_expiry_refunds_every_participant_once() {
        let (engine, mut events, ledger) = harness();
        let mut conservation = CreditConservationTracker::new();

        let creator = UserId::new();
        ledger.seed(creator, 5).await;
        let order = engine
            .create_order(creator, Decimal::new(100, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, Some(Decimal::new(40, 0)), None)
            .await
            .unwrap();
        conservation.record_debit(creator, 1);
        let _ = events.recv().await; // OrderCreated
        let _ = events.recv().await; // NearbyBroadcast

        let pledger = UserId::new();
        ledger.seed(pledger, 5).await;
        engine.pledge_to_order(pledger, order.id, Decimal::new(10, 0)).await.unwrap();
        conservation.record_debit(pledger, 1);
        let _ = events.recv().await; // PledgeSuccess

        assert_eq!(ledger.get(creator).await.unwrap(), 4);
        assert_eq!(ledger.get(pledger).await.unwrap(), 4);

        engine.handle_expiry(order.id).await.unwrap();
        conservation.record_refund(creator, 1);
        conservation.record_refund(pledger, 1);
        assert_eq!(ledger.get(creator).await.unwrap(), 5);
        assert_eq!(ledger.get(pledger).await.unwrap(), 5);

        // Every debit on an EXPIRED order must be matched by a refund (I2).
        assert!(conservation.fully_refunded(creator));
        assert!(conservation.fully_refunded(pledger));

        match events.recv().await.unwrap() {
            EngineEvent::OrderExpired { order: expired } => assert_eq!(expired.status, OrderStatus::Expired),
            other => panic!("unexpected event: {other:?}"),
        }

        // Idempotent: a second call must not double-refund.
        engine.handle_expiry(order.id).await.unwrap();
        assert_eq!(ledger.get(creator).await.unwrap(), 5);
        assert_eq!(ledger.get(pledger).await.unwrap(), 5);
        assert!(conservation.fully_refunded(creator));
        assert!(conservation.fully_refunded(pledger));
    }

    #[tokio::test]
    async fn handle_expiry_on_completed_order_is_a_noop() {
        let (engine, mut events, ledger) = harness();
        let creator = UserId::new();
        ledger.seed(creator, 5).await;
        let order = engine
            .create_order(creator, Decimal::new(50, 0), "doordash".to_string(), Decimal::ZERO, Decimal::ZERO, Some(Decimal::new(50, 0)), None)
            .await
            .unwrap();
        let _ = events.recv().await; // OrderCreated
        let _ = events.recv().await; // NearbyBroadcast

        engine.handle_expiry(order.id).await.unwrap();
        // The creator's pledge must not be refunded a second time on top of
        // the completion that already happened at threshold.
        assert_eq!(ledger.get(creator).await.unwrap(), 4);
    }

    // Boot reconciliation: an ACTIVE row with no corresponding cache entry
    // (e.g. the process restarted after its TTL lapsed) is expired.
    #[tokio::test]
    async fn reconcile_on_boot_expires_orders_missing_from_cache() {
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let store = Arc::new(InMemoryOrderRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let cache: Arc<dyn OrderCacheBackend> = Arc::new(InMemoryOrderCache::new());
        let (tx, _rx) = mpsc::channel(64);

        let creator = UserId::new();
        ledger.seed(creator, 5).await;
        let mut order = Order::dummy_with_creator_pledge(creator, Decimal::new(100, 0), Decimal::new(40, 0));
        order.status = OrderStatus::Active;
        store.insert(&order).await.unwrap();
        // Deliberately not written to the cache, simulating a lapsed TTL.

        let engine = OrderEngine::new(ledger.clone(), store.clone(), users, cache, tx, BundlConfig::test_default());
        engine.reconcile_on_boot().await.unwrap();

        let persisted = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(persisted.status, OrderStatus::Expired);
        assert_eq!(ledger.get(creator).await.unwrap(), 6);
    }
}
