use serde::Deserialize;

use super::model::OrderStatus;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<OrderStatus>,
}
