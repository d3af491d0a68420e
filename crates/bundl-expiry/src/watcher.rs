//! Single-threaded subscriber to the live cache's key-expiration channel
//! (spec.md §4.4). Never reads or mutates order state beyond parsing the
//! expired key.

use std::time::{Duration, Instant};

use bundl_cache::KeySpace;
use bundl_types::OrderId;
use futures_util::StreamExt;
use tokio::sync::mpsc;

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// A connection that stays up at least this long before dropping again is
/// treated as healthy: the next drop starts backing off from scratch rather
/// than continuing to escalate from wherever a prior flaky streak left off.
const MIN_HEALTHY_CONNECTION: Duration = Duration::from_secs(30);

/// Runs forever, reconnecting with exponential backoff on subscription
/// drop. Boot-time reconciliation (owned by the engine) covers orders
/// whose expiry fired during a reconnect window.
pub async fn run(
    redis_url: String,
    key_prefix: String,
    channel_pattern: String,
    expired: mpsc::Sender<OrderId>,
) {
    let keys = KeySpace::new(key_prefix);
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let connected_at = Instant::now();
        match subscribe_once(&redis_url, &channel_pattern, &keys, &expired).await {
            Ok(()) => {
                // Graceful shutdown: the sender side dropped.
                tracing::info!("expiry watcher shutting down: event channel closed");
                return;
            }
            Err(err) => {
                if connected_at.elapsed() >= MIN_HEALTHY_CONNECTION {
                    backoff = INITIAL_BACKOFF;
                }
                tracing::warn!(error = %err, backoff_ms = backoff.as_millis(), "expiry watcher subscription dropped, reconnecting");
                tokio::time::sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
            }
        }
    }
}

async fn subscribe_once(
    redis_url: &str,
    channel_pattern: &str,
    keys: &KeySpace,
    expired: &mpsc::Sender<OrderId>,
) -> Result<(), redis::RedisError> {
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(channel_pattern).await?;

    // Backoff reset is the caller's job (`run`, keyed off how long this
    // call stayed connected) — returning here only reports success or error.
    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let key: String = match msg.get_payload() {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(error = %err, "failed to decode expired-key payload");
                continue;
            }
        };

        if let Some(order_id) = keys.parse_snapshot_key(&key) {
            if expired.send(order_id).await.is_err() {
                return Ok(());
            }
        }
    }

    Err(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "keyspace-notification stream ended",
    )))
}
