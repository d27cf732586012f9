//! Cart reducer: merge-on-add and clamped quantity updates over a list of lines.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Most units of one (product, size, frame) line.
pub const MAX_LINE_QUANTITY: i32 = 99;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be between 1 and {MAX_LINE_QUANTITY}, got {0}")]
    InvalidQuantity(i32),
    #[error("a cart line holds at most {MAX_LINE_QUANTITY} units")]
    LineLimit,
    #[error("no cart line at index {0}")]
    LineNotFound(usize),
    #[error("size {size:?} with frame {frame_type:?} is not offered for this product")]
    OptionNotOffered { size: String, frame_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: String,
    pub frame_type: String,
}

impl CartItem {
    /// Lines are keyed by (product, size, frame).
    pub fn same_line(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id
            && self.size == other.size
            && self.frame_type == other.frame_type
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merges into an existing line with the same key, else appends. Returns the
    /// index of the affected line.
    pub fn add(&mut self, item: CartItem) -> Result<usize, CartError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) {
            return Err(CartError::InvalidQuantity(item.quantity));
        }
        match self.items.iter().position(|i| i.same_line(&item)) {
            Some(idx) => {
                let line = &mut self.items[idx];
                let merged = line.quantity.saturating_add(item.quantity);
                if merged > MAX_LINE_QUANTITY {
                    return Err(CartError::LineLimit);
                }
                line.quantity = merged;
                Ok(idx)
            }
            None => {
                self.items.push(item);
                Ok(self.items.len() - 1)
            }
        }
    }

    /// Applies `delta` to a line, clamped to `1..=MAX_LINE_QUANTITY`. Returns the new
    /// quantity.
    pub fn update_qty(&mut self, index: usize, delta: i32) -> Result<i32, CartError> {
        let line = self
            .items
            .get_mut(index)
            .ok_or(CartError::LineNotFound(index))?;
        line.quantity = line.quantity.saturating_add(delta).clamp(1, MAX_LINE_QUANTITY);
        Ok(line.quantity)
    }

    pub fn remove(&mut self, index: usize) -> Result<CartItem, CartError> {
        if index >= self.items.len() {
            return Err(CartError::LineNotFound(index));
        }
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units across lines.
    pub fn count(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    /// Σ price × quantity; lines whose product has no price are skipped. Saturates
    /// instead of wrapping.
    pub fn total(&self, price_of: impl Fn(Uuid) -> Option<i64>) -> i64 {
        self.items
            .iter()
            .filter_map(|i| {
                price_of(i.product_id).map(|p| p.saturating_mul(i64::from(i.quantity)))
            })
            .fold(0i64, i64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: i32, size: &str, frame: &str) -> CartItem {
        CartItem {
            product_id,
            quantity,
            size: size.into(),
            frame_type: frame.into(),
        }
    }

    #[test]
    fn adding_same_key_merges_and_doubles_total() {
        let godfather = Uuid::new_v4();
        let price = |id: Uuid| (id == godfather).then_some(1299);

        let mut cart = Cart::default();
        cart.add(line(godfather, 1, "12x18", "Classic Black")).unwrap();
        assert_eq!(cart.total(price), 1299);

        let idx = cart.add(line(godfather, 1, "12x18", "Classic Black")).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total(price), 2598);
    }

    #[test]
    fn different_size_or_frame_is_a_new_line() {
        let p = Uuid::new_v4();
        let mut cart = Cart::default();
        cart.add(line(p, 1, "12x18", "Classic Black")).unwrap();
        assert_eq!(cart.add(line(p, 1, "24x36", "Classic Black")).unwrap(), 1);
        assert_eq!(cart.add(line(p, 1, "12x18", "Natural Oak")).unwrap(), 2);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let mut cart = Cart::default();
        let err = cart.add(line(Uuid::new_v4(), 0, "8x10", "Classic Black")).unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity(0));
        assert!(cart.is_empty());
    }

    #[test]
    fn update_qty_clamps_to_one() {
        let mut cart = Cart::new(vec![line(Uuid::new_v4(), 3, "8x10", "Classic Black")]);
        assert_eq!(cart.update_qty(0, -1).unwrap(), 2);
        assert_eq!(cart.update_qty(0, -10).unwrap(), 1);
        assert_eq!(cart.update_qty(0, i32::MIN).unwrap(), 1);
        assert_eq!(cart.update_qty(0, 4).unwrap(), 5);
        assert_eq!(cart.update_qty(0, i32::MAX).unwrap(), MAX_LINE_QUANTITY);
        assert_eq!(cart.update_qty(1, 1).unwrap_err(), CartError::LineNotFound(1));
    }

    #[test]
    fn remove_and_clear() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut cart = Cart::new(vec![
            line(a, 1, "8x10", "Classic Black"),
            line(b, 2, "8x10", "Classic Black"),
        ]);
        assert_eq!(cart.remove(0).unwrap().product_id, a);
        assert_eq!(cart.items()[0].product_id, b);
        assert_eq!(cart.remove(5).unwrap_err(), CartError::LineNotFound(5));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.count(), 0);
    }

    #[test]
    fn total_skips_unknown_products() {
        let known = Uuid::new_v4();
        let cart = Cart::new(vec![
            line(known, 2, "8x10", "Classic Black"),
            line(Uuid::new_v4(), 5, "8x10", "Classic Black"),
        ]);
        assert_eq!(cart.total(|id| (id == known).then_some(899)), 1798);
    }

    #[test]
    fn line_quantity_is_capped() {
        let p = Uuid::new_v4();
        let mut cart = Cart::default();
        assert_eq!(
            cart.add(line(p, MAX_LINE_QUANTITY + 1, "8x10", "Classic Black")).unwrap_err(),
            CartError::InvalidQuantity(MAX_LINE_QUANTITY + 1)
        );
        cart.add(line(p, 60, "8x10", "Classic Black")).unwrap();
        assert_eq!(
            cart.add(line(p, 40, "8x10", "Classic Black")).unwrap_err(),
            CartError::LineLimit
        );
        assert_eq!(cart.items()[0].quantity, 60);
        cart.add(line(p, 39, "8x10", "Classic Black")).unwrap();
        assert_eq!(cart.items()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn total_saturates_on_absurd_prices() {
        let p = Uuid::new_v4();
        let cart = Cart::new(vec![
            line(p, 3, "8x10", "Classic Black"),
            line(p, 2, "12x18", "Classic Black"),
        ]);
        assert_eq!(cart.total(|_| Some(i64::MAX / 2)), i64::MAX);
    }
}
