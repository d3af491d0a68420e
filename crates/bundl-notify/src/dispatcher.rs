//! Fans [`EngineEvent`]s out to push notifications. One consumer task,
//! draining an `mpsc::Receiver` the engine posts into (spec.md §4.6).
//!
//! Never blocks the engine: the channel is bounded and the engine uses
//! `try_send`, so this loop's only job is to drain it promptly and log,
//! never propagate, delivery failures.

use std::sync::Arc;

use bundl_types::EngineEvent;
use tokio::sync::mpsc;

use crate::push::PushProvider;

/// Runs until the engine drops its sender. Intended to be spawned as a
/// background task alongside the expiry watcher.
pub async fn run(mut events: mpsc::Receiver<EngineEvent>, push: Arc<dyn PushProvider>) {
    while let Some(event) = events.recv().await {
        dispatch(&*push, event).await;
    }
    tracing::info!("notification dispatcher shutting down: event channel closed");
}

async fn dispatch(push: &dyn PushProvider, event: EngineEvent) {
    match event {
        EngineEvent::OrderCreated { .. } => {
            // The creator already knows; nothing to notify.
        }
        EngineEvent::PledgeSuccess { order, user_id, pledge_amount } => {
            if user_id != order.creator_id {
                notify(push, order.creator_id, &format!("Someone pledged {pledge_amount} to your order")).await;
            }
        }
        EngineEvent::PledgeFailed { .. } => {
            // The caller already got a synchronous error from the API; no push needed.
        }
        EngineEvent::OrderCompleted { order } => {
            for &participant in order.pledge_map.keys() {
                notify(push, participant, "Your group order is fully funded!").await;
            }
        }
        EngineEvent::OrderExpired { order } => {
            for &participant in order.pledge_map.keys() {
                notify(push, participant, "Your order expired and your credit was refunded.").await;
            }
        }
        EngineEvent::NearbyBroadcast { order_id, geohash } => {
            // The set of devices subscribed to a geohash cell is owned by
            // the push gateway's topic subscriptions, not by this service;
            // there's no per-user fan-out to perform here.
            tracing::debug!(%order_id, geohash, "nearby order broadcast (topic-routed, no per-user fan-out)");
        }
    }
}

async fn notify(push: &dyn PushProvider, user_id: bundl_types::UserId, message: &str) {
    if let Err(err) = push.send(user_id, message).await {
        tracing::warn!(%user_id, error = %err, "push delivery failed");
    }
}
