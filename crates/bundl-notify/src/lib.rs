//! # bundl-notify
//!
//! The notification dispatcher (component C6): drains engine lifecycle
//! events and fans them out to push delivery. Fire-and-forget by design —
//! nothing here can fail an order operation.

pub mod dispatcher;
pub mod push;

pub use dispatcher::run;
pub use push::{LoggingPushProvider, PushProvider};
