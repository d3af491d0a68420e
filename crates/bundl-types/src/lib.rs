//! # bundl-types
//!
//! Shared types, errors, and configuration for the **Bundl** order lifecycle
//! engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`UserId`]
//! - **Order model**: [`Order`], [`OrderStatus`], [`PledgeMap`]
//! - **User model**: [`User`]
//! - **Events**: [`EngineEvent`]
//! - **Health**: [`HealthCheck`], the `GET /healthz` liveness seam
//! - **Configuration**: [`BundlConfig`]
//! - **Errors**: [`BundlError`] with `BNDL_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod health;
pub mod ids;
pub mod order;
pub mod user;

// Re-export all primary types at crate root for ergonomic imports:
//   use bundl_types::{Order, OrderStatus, User, BundlError, ...};

pub use config::*;
pub use error::*;
pub use events::*;
pub use health::HealthCheck;
pub use ids::*;
pub use order::*;
pub use user::*;

// Constants are accessed via `bundl_types::constants::FOO`
// (not re-exported to avoid name collisions).
