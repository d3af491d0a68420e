//! Runtime configuration for the Bundl order lifecycle engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, error::BundlError};

/// All environment-driven knobs enumerated in the external interface spec.
/// Loaded once at boot via [`BundlConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundlConfig {
    /// Address the HTTP surface listens on, e.g. "0.0.0.0:8080".
    pub listen_addr: String,
    /// Postgres connection string for the durable order/user store.
    pub database_url: String,
    /// Redis connection string for the live order cache.
    pub redis_url: String,
    /// Initial per-user credit balance.
    pub default_user_credits: i64,
    /// Credits charged per createOrder / pledgeToOrder call.
    pub credit_cost_per_action: i64,
    /// Order TTL when the client omits `expirySeconds`.
    pub default_order_expiry_seconds: u64,
    /// Search radius when the client omits `radiusKm`.
    pub default_search_radius_km: f64,
    /// Minimum positive `amount_needed` accepted by createOrder.
    pub order_min_amount: Decimal,
    /// Minimum positive `pledge_amount` accepted by pledgeToOrder.
    pub pledge_min_amount: Decimal,
    /// Cache key namespace prefix.
    pub cache_key_prefix: String,
    /// Keyspace-notification channel pattern the expiry watcher subscribes to.
    pub key_expiration_channel: String,
}

impl BundlConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults in [`constants`] for anything unset. Reads a `.env` file in
    /// the working directory first, if present.
    pub fn from_env() -> Result<Self, BundlError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            listen_addr: env_or("BUNDL_LISTEN_ADDR", format!("0.0.0.0:{}", constants::DEFAULT_API_PORT)),
            database_url: env_required("DATABASE_URL")?,
            redis_url: env_required("REDIS_URL")?,
            default_user_credits: env_parsed_or("DEFAULT_USER_CREDITS", constants::DEFAULT_USER_CREDITS)?,
            credit_cost_per_action: env_parsed_or(
                "CREDIT_COST_PER_ACTION",
                constants::CREDIT_COST_PER_ACTION,
            )?,
            default_order_expiry_seconds: env_parsed_or(
                "DEFAULT_ORDER_EXPIRY_SECONDS",
                constants::DEFAULT_ORDER_EXPIRY_SECONDS,
            )?,
            default_search_radius_km: env_parsed_or(
                "DEFAULT_SEARCH_RADIUS_KM",
                constants::DEFAULT_SEARCH_RADIUS_KM,
            )?,
            order_min_amount: env_decimal_or("ORDER_MIN_AMOUNT", Decimal::new(1, 0))?,
            pledge_min_amount: env_decimal_or("PLEDGE_MIN_AMOUNT", Decimal::new(1, 0))?,
            cache_key_prefix: env_or("CACHE_KEY_PREFIX", constants::CACHE_KEY_PREFIX.to_string()),
            key_expiration_channel: env_or(
                "KEY_EXPIRATION_CHANNEL",
                constants::KEY_EXPIRATION_CHANNEL.to_string(),
            ),
        })
    }

    /// A configuration populated with in-process defaults, for tests that
    /// don't want to touch the environment.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn test_default() -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{}", constants::DEFAULT_API_PORT),
            database_url: "postgres://localhost/bundl_test".to_string(),
            redis_url: "redis://localhost".to_string(),
            default_user_credits: constants::DEFAULT_USER_CREDITS,
            credit_cost_per_action: constants::CREDIT_COST_PER_ACTION,
            default_order_expiry_seconds: constants::DEFAULT_ORDER_EXPIRY_SECONDS,
            default_search_radius_km: constants::DEFAULT_SEARCH_RADIUS_KM,
            order_min_amount: Decimal::new(1, 0),
            pledge_min_amount: Decimal::new(1, 0),
            cache_key_prefix: constants::CACHE_KEY_PREFIX.to_string(),
            key_expiration_channel: constants::KEY_EXPIRATION_CHANNEL.to_string(),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_required(key: &str) -> Result<String, BundlError> {
    std::env::var(key).map_err(|_| {
        BundlError::Configuration(format!("missing required environment variable {key}"))
    })
}

fn env_parsed_or<T>(key: &str, default: T) -> Result<T, BundlError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| BundlError::Configuration(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn env_decimal_or(key: &str, default: Decimal) -> Result<Decimal, BundlError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<Decimal>()
            .map_err(|_| BundlError::Configuration(format!("invalid decimal for {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}
