//! Boots the Bundl order lifecycle service: loads configuration, wires the
//! credit ledger, durable store, live cache, expiry watcher, and
//! notification dispatcher together behind the order engine, runs boot-time
//! reconciliation, then serves the HTTP surface.

use std::sync::Arc;

use bundl_api::{AppState, StaticAuthProvider};
use bundl_cache::{OrderCache, OrderCacheBackend, RedisHealthCheck};
use bundl_engine::OrderEngine;
use bundl_ledger::PgCreditLedger;
use bundl_notify::LoggingPushProvider;
use bundl_store::{PgHealthCheck, PgOrderRepository, PgUserRepository};
use bundl_types::{BundlConfig, HealthCheck};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const EXPIRY_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = BundlConfig::from_env()?;
    tracing::info!(listen_addr = %config.listen_addr, "starting bundl-node");

    let pool = bundl_store::pool::connect(&config.database_url).await?;
    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_connection_manager().await?;

    let ledger: Arc<dyn bundl_ledger::CreditLedger> = Arc::new(PgCreditLedger::new(pool.clone()));
    let orders: Arc<dyn bundl_store::OrderRepository> = Arc::new(PgOrderRepository::new(pool.clone()));
    let users: Arc<dyn bundl_store::UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let cache: Arc<dyn OrderCacheBackend> = Arc::new(OrderCache::new(redis_conn.clone(), config.cache_key_prefix.clone()));
    let health_checks: Vec<Arc<dyn HealthCheck>> =
        vec![Arc::new(PgHealthCheck(pool.clone())), Arc::new(RedisHealthCheck(redis_conn))];

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (expired_tx, mut expired_rx) = mpsc::channel(EXPIRY_CHANNEL_CAPACITY);

    let engine = Arc::new(OrderEngine::new(ledger, orders, users, cache, events_tx, config.clone()));

    tracing::info!("running boot-time reconciliation");
    engine.reconcile_on_boot().await?;

    tokio::spawn(bundl_notify::run(events_rx, Arc::new(LoggingPushProvider)));

    tokio::spawn(bundl_expiry::run(
        config.redis_url.clone(),
        config.cache_key_prefix.clone(),
        config.key_expiration_channel.clone(),
        expired_tx,
    ));

    let expiry_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        while let Some(order_id) = expired_rx.recv().await {
            if let Err(err) = expiry_engine.handle_expiry(order_id).await {
                tracing::error!(%order_id, error = %err, "handleExpiry failed");
            }
        }
    });

    let state = Arc::new(AppState { engine, auth: Arc::new(StaticAuthProvider), health_checks });
    let app = bundl_api::router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
