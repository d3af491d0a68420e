//! The four endpoints from spec.md §6, plus `/healthz`. Thin per §4.7: no
//! business logic beyond request parsing and DTO conversion.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bundl_types::{BundlError, OrderId};

use crate::auth::AuthedUser;
use crate::dto::{ActiveOrdersQuery, CreateOrderRequest, OrderResponse, PledgeRequest};
use crate::AppState;

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, BundlError> {
    let order = state
        .engine
        .create_order(
            user_id,
            req.amount_needed,
            req.platform,
            req.latitude,
            req.longitude,
            req.initial_pledge,
            req.expiry_seconds,
        )
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

pub async fn pledge_to_order(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
    Json(req): Json<PledgeRequest>,
) -> Result<Json<OrderResponse>, BundlError> {
    let order_id: OrderId = req
        .order_id
        .parse()
        .map_err(|_| BundlError::Validation { reason: "orderId is not a valid id".to_string() })?;

    let result = state.engine.pledge_to_order(user_id, order_id, req.pledge_amount).await?;

    let mut response = OrderResponse::from(&result.order);
    response.phone_map =
        result.phone_map.as_ref().map(|map| map.iter().map(|(id, phone)| (id.to_string(), phone.clone())).collect());
    Ok(Json(response))
}

pub async fn active_orders(
    State(state): State<Arc<AppState>>,
    AuthedUser(_user_id): AuthedUser,
    Query(query): Query<ActiveOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, BundlError> {
    let orders = state.engine.get_active_orders_near(query.latitude, query.longitude, query.radius_km).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

pub async fn order_status(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, BundlError> {
    let order_id: OrderId =
        order_id.parse().map_err(|_| BundlError::Validation { reason: "orderId is not a valid id".to_string() })?;
    let view = state.engine.get_order_status(user_id, order_id).await?;
    Ok(Json(OrderResponse::from(view)))
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    for check in &state.health_checks {
        if let Err(err) = check.ping().await {
            tracing::warn!(error = %err, "healthz check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "unhealthy");
        }
    }
    (StatusCode::OK, "ok")
}
