//! Request/response bodies for the four endpoints in spec.md §6.

use std::collections::HashMap;

use bundl_engine::OrderStatusView;
use bundl_types::{Order, PledgeMap, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub amount_needed: Decimal,
    pub platform: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub initial_pledge: Option<Decimal>,
    pub expiry_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeRequest {
    pub order_id: String,
    pub pledge_amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOrdersQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub creator_id: String,
    pub amount_needed: Decimal,
    pub pledge_map: HashMap<String, Decimal>,
    pub total_pledge: Decimal,
    pub total_users: usize,
    pub platform: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_map: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn stringify_pledge_map(pledge_map: &PledgeMap) -> HashMap<String, Decimal> {
    pledge_map.iter().map(|(user_id, amount)| (user_id.to_string(), *amount)).collect()
}

fn stringify_phone_map(phone_map: &HashMap<UserId, String>) -> HashMap<String, String> {
    phone_map.iter().map(|(user_id, phone)| (user_id.to_string(), phone.clone())).collect()
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.to_string(),
            status: order.status.to_string(),
            creator_id: order.creator_id.to_string(),
            amount_needed: order.amount_needed,
            pledge_map: stringify_pledge_map(&order.pledge_map),
            total_pledge: order.total_pledge,
            total_users: order.total_users,
            platform: order.platform.clone(),
            latitude: order.latitude,
            longitude: order.longitude,
            phone_map: None,
            note: None,
        }
    }
}

impl From<OrderStatusView> for OrderResponse {
    fn from(view: OrderStatusView) -> Self {
        let mut response = Self::from(&view.order);
        response.phone_map = view.phone_map.as_ref().map(stringify_phone_map);
        response.note = view.expiry_note;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_response_serializes_ids_as_strings() {
        let order = Order::dummy_active(Decimal::new(100, 0));
        let response: OrderResponse = (&order).into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["orderId"], order.id.to_string());
        assert_eq!(json["status"], "ACTIVE");
    }
}
