use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Message, Order, OrderLine};

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub reference: String,
    pub user_id: Uuid,
    pub total: i64,
    pub status: String,
    pub address: String,
    pub phone: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderLineRow {
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub image: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub size: String,
    pub frame_type: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
}

impl From<OrderLineRow> for OrderLine {
    fn from(r: OrderLineRow) -> Self {
        Self {
            product_id: r.product_id,
            product_name: r.product_name,
            image: r.image,
            unit_price: r.unit_price,
            quantity: r.quantity,
            size: r.size,
            frame_type: r.frame_type,
        }
    }
}

impl From<MessageRow> for Message {
    fn from(r: MessageRow) -> Self {
        Self {
            id: r.id,
            order_id: r.order_id,
            sender_id: r.sender_id,
            text: r.text,
            is_admin: r.is_admin,
            created_at: r.created_at,
        }
    }
}

impl OrderRow {
    pub fn into_order(self, items: Vec<OrderLine>, messages: Vec<Message>) -> anyhow::Result<Order> {
        Ok(Order {
            id: self.id,
            reference: self.reference,
            user_id: self.user_id,
            items,
            total: self.total,
            status: self.status.parse()?,
            address: self.address,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
            messages,
        })
    }
}
