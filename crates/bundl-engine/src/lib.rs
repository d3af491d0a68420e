//! # bundl-engine
//!
//! The order engine (component C5): the single authority that coordinates
//! the credit ledger, durable store, and live cache into the five
//! operations the rest of the system calls — create, pledge, browse, read
//! status, and expire.

pub mod conservation;
pub mod engine;
pub mod expiry_guard;
pub mod geohash;

pub use conservation::CreditConservationTracker;
pub use engine::{OrderEngine, OrderStatusView, PledgeResponse};
pub use expiry_guard::ExpiryGuard;
