//! # bundl-api
//!
//! The HTTP surface (component C7): a thin Axum adapter over
//! [`bundl_engine::OrderEngine`]. Extracts the authenticated caller,
//! validates input shape via the DTOs in [`dto`], and otherwise performs
//! no business logic — everything lives in the engine.

pub mod auth;
pub mod dto;
pub mod error_mapping;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use bundl_engine::OrderEngine;
use bundl_types::HealthCheck;

pub use auth::{AuthProvider, AuthedUser, StaticAuthProvider};

pub struct AppState {
    pub engine: Arc<OrderEngine>,
    pub auth: Arc<dyn AuthProvider>,
    /// Dependencies `GET /healthz` pings: the durable store and the live
    /// cache, named per spec.md §5's "runnable system" requirement.
    pub health_checks: Vec<Arc<dyn HealthCheck>>,
}

#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/orders/createOrder", post(handlers::create_order))
        .route("/orders/pledgeToOrder", post(handlers::pledge_to_order))
        .route("/orders/activeOrders", get(handlers::active_orders))
        .route("/orders/orderStatus/:orderId", get(handlers::order_status))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
