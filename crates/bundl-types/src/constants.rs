//! System-wide constants for the Bundl order lifecycle engine.

/// Default per-user starting credit balance.
pub const DEFAULT_USER_CREDITS: i64 = 5;

/// Credits charged per createOrder / pledgeToOrder call.
pub const CREDIT_COST_PER_ACTION: i64 = 1;

/// Default order TTL when the client omits `expirySeconds`.
pub const DEFAULT_ORDER_EXPIRY_SECONDS: u64 = 600;

/// Default search radius for `getActiveOrdersNear` when the client omits
/// `radiusKm`.
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 5.0;

/// Cache key namespace prefix, prepended to every Redis key.
pub const CACHE_KEY_PREFIX: &str = "bundl";

/// Redis keyspace-notification channel the expiry watcher subscribes to for
/// expired-key events (`__keyevent@{db}__:expired` is the pattern; this is
/// the glob fragment after the db index).
pub const KEY_EXPIRATION_CHANNEL: &str = "__keyevent@0__:expired";

/// Default API listen port.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Bundl";
