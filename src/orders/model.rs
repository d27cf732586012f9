use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cart::{model::MAX_LINE_QUANTITY, CartError, CartItem};
use crate::catalog::Product;

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("shipping address is required")]
    InvalidAddress,
    #[error("phone number must have 7 to 15 digits")]
    InvalidPhone,
    #[error("message text is required")]
    EmptyMessage,
    #[error("message is longer than {0} characters")]
    MessageTooLong(usize),
    #[error("product {0} is no longer available")]
    ProductUnavailable(Uuid),
    #[error("only {available} of {product:?} left, {requested} requested")]
    OutOfStock {
        product: String,
        requested: i64,
        available: i32,
    },
    #[error("order total is too large")]
    TotalTooLarge,
    #[error("cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Cart(#[from] CartError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Forward moves only; cancellation is allowed until delivery.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Placed, Shipped) | (Placed, Cancelled) | (Shipped, Delivered) | (Shipped, Cancelled)
        )
    }

    /// `Ok(false)` when `next` equals the current status.
    pub fn check_transition(self, next: OrderStatus) -> Result<bool, OrderError> {
        if self == next {
            return Ok(false);
        }
        if self.is_terminal() || !self.can_transition_to(next) {
            return Err(OrderError::IllegalTransition { from: self, to: next });
        }
        Ok(true)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" => Ok(Self::Placed),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            other => anyhow::bail!("unknown order status {other:?}"),
        }
    }
}

/// A cart line frozen at checkout with the product details it was bought at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub image: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub size: String,
    pub frame_type: String,
}

impl OrderLine {
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

/// `None` if any product or the sum overflows.
pub fn order_total(lines: &[OrderLine]) -> Option<i64> {
    lines
        .iter()
        .try_fold(0i64, |acc, l| acc.checked_add(l.line_total()?))
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub reference: String,
    pub user_id: Uuid,
    pub items: Vec<OrderLine>,
    pub total: i64,
    pub status: OrderStatus,
    pub address: String,
    pub phone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub messages: Vec<Message>,
}

/// Validated shipping contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub address: String,
    pub phone: String,
}

impl Contact {
    pub fn parse(address: &str, phone: &str) -> Result<Self, OrderError> {
        lazy_static! {
            static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9][0-9 \-]*$").unwrap();
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(OrderError::InvalidAddress);
        }
        let phone = phone.trim();
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if !PHONE_RE.is_match(phone) || !(7..=15).contains(&digits) {
            return Err(OrderError::InvalidPhone);
        }
        Ok(Self {
            address: address.to_string(),
            phone: phone.to_string(),
        })
    }
}

/// Trims and bounds a chat message.
pub fn validate_message_text(text: &str) -> Result<String, OrderError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(OrderError::EmptyMessage);
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(OrderError::MessageTooLong(MAX_MESSAGE_CHARS));
    }
    Ok(text.to_string())
}

/// Prices cart lines against current product rows and checks stock across all lines
/// for the same product.
pub fn price_lines(
    items: &[CartItem],
    products: &HashMap<Uuid, Product>,
) -> Result<Vec<OrderLine>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let mut requested: HashMap<Uuid, (i64, &Product)> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = products
            .get(&item.product_id)
            .ok_or(OrderError::ProductUnavailable(item.product_id))?;
        if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) {
            return Err(CartError::InvalidQuantity(item.quantity).into());
        }
        if !product.offers(&item.size, &item.frame_type) {
            return Err(CartError::OptionNotOffered {
                size: item.size.clone(),
                frame_type: item.frame_type.clone(),
            }
            .into());
        }
        requested.entry(product.id).or_insert((0, product)).0 += i64::from(item.quantity);
        lines.push(OrderLine {
            product_id: Some(product.id),
            product_name: product.name.clone(),
            image: product.cover_image().map(str::to_string),
            unit_price: product.price,
            quantity: item.quantity,
            size: item.size.clone(),
            frame_type: item.frame_type.clone(),
        });
    }

    for (qty, product) in requested.values() {
        if *qty > i64::from(product.stock) {
            return Err(OrderError::OutOfStock {
                product: product.name.clone(),
                requested: *qty,
                available: product.stock,
            });
        }
    }
    Ok(lines)
}

/// Everything checkout writes besides the order header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub lines: Vec<OrderLine>,
    pub total: i64,
    /// Negative stock changes, ascending by product id so rows are updated in the same
    /// order they are locked.
    pub stock_deltas: Vec<(Uuid, i32)>,
}

pub fn plan_checkout(
    items: &[CartItem],
    products: &HashMap<Uuid, Product>,
) -> Result<CheckoutPlan, OrderError> {
    let lines = price_lines(items, products)?;
    let total = order_total(&lines).ok_or(OrderError::TotalTooLarge)?;
    let stock_deltas = quantities_by_product(&lines)
        .into_iter()
        .map(|(id, qty)| (id, -qty))
        .collect();
    Ok(CheckoutPlan {
        lines,
        total,
        stock_deltas,
    })
}

/// Stock returned by a cancellation, ascending by product id. Lines whose product was
/// deleted since checkout are skipped.
pub fn restock_deltas(lines: &[OrderLine]) -> Vec<(Uuid, i32)> {
    quantities_by_product(lines).into_iter().collect()
}

fn quantities_by_product(lines: &[OrderLine]) -> BTreeMap<Uuid, i32> {
    let mut out: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in lines {
        if let Some(id) = line.product_id {
            let qty = out.entry(id).or_default();
            *qty = qty.saturating_add(line.quantity);
        }
    }
    out
}

/// Customer-facing reference such as `ORD-482913`.
pub fn generate_reference<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("ORD-{}", rng.gen_range(100_000..1_000_000))
}
