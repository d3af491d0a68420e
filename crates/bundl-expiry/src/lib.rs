//! # bundl-expiry
//!
//! The expiry watcher (component C4): subscribes to the live cache's
//! key-expiration notifications and posts `OrderId`s onto a channel the
//! engine drains to run `handleExpiry`.

pub mod watcher;

pub use watcher::run;
