use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Cart;
use crate::catalog::Product;

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub size: String,
    pub frame_type: String,
}
fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub index: usize,
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: String,
    pub frame_type: String,
    /// False once the product has been removed from the catalog.
    pub available: bool,
    pub name: Option<String>,
    pub image: Option<String>,
    pub unit_price: Option<i64>,
    pub line_total: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: i64,
    pub total: i64,
}

impl CartView {
    pub fn build(cart: &Cart, products: &HashMap<Uuid, Product>) -> Self {
        let items = cart
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let product = products.get(&item.product_id);
                CartLineView {
                    index,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    size: item.size.clone(),
                    frame_type: item.frame_type.clone(),
                    available: product.is_some(),
                    name: product.map(|p| p.name.clone()),
                    image: product.and_then(|p| p.cover_image().map(str::to_string)),
                    unit_price: product.map(|p| p.price),
                    line_total: product
                        .map(|p| p.price.saturating_mul(i64::from(item.quantity))),
                }
            })
            .collect();
        Self {
            items,
            item_count: cart.count(),
            total: cart.total(|id| products.get(&id).map(|p| p.price)),
        }
    }
}
