//! # bundl-store
//!
//! The durable order and user store (component C2). Postgres is the
//! authoritative record of terminal order state and of user identity/
//! credit balances; the live cache ([`bundl-cache`]) is authoritative for
//! ACTIVE orders while they're live.

pub mod orders;
pub mod pool;
pub mod users;

pub use orders::{InMemoryOrderRepository, OrderRepository, PgOrderRepository};
pub use pool::PgHealthCheck;
pub use users::{InMemoryUserRepository, PgUserRepository, UserRepository};
