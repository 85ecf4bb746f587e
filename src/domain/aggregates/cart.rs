//! Cart Aggregate

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{DeliveryMethod, Grade, Money, Volume};

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub currency: String,
    pub lines: Vec<CartLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub grade: Grade,
    pub delivery_method: DeliveryMethod,
    pub quantity: Volume,
    pub unit_price: Money,
}

impl CartLine {
    pub fn for_product(product: &Product, method: DeliveryMethod, quantity: Volume) -> Self {
        Self {
            id: Uuid::now_v7(), product_id: product.id, product_name: product.name.clone(), grade: product.grade,
            delivery_method: method, quantity, unit_price: product.price_for(method),
        }
    }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()).round_to_cents() }
}

impl Cart {
    pub fn new(id: Uuid, customer_id: Uuid, currency: &str) -> Self {
        Self { id, customer_id, currency: currency.to_uppercase(), lines: vec![] }
    }

    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn line(&self, line_id: Uuid) -> Option<&CartLine> { self.lines.iter().find(|l| l.id == line_id) }

    /// Adds a line, merging with an existing line for the same product and
    /// delivery method. Returns the resulting line.
    pub fn add_line(&mut self, line: CartLine) -> Result<&CartLine, CartError> {
        if line.unit_price.currency() != self.currency {
            return Err(CartError::CurrencyMismatch(line.unit_price.currency().to_string()));
        }
        let pos = match self.lines.iter().position(|l| l.product_id == line.product_id && l.delivery_method == line.delivery_method) {
            Some(pos) => {
                let existing = &mut self.lines[pos];
                existing.quantity = existing.quantity.add(line.quantity);
                existing.unit_price = line.unit_price;
                pos
            }
            None => { self.lines.push(line); self.lines.len() - 1 }
        };
        Ok(&self.lines[pos])
    }

    pub fn set_quantity(&mut self, line_id: Uuid, quantity: Volume) -> Result<&CartLine, CartError> {
        let line = self.lines.iter_mut().find(|l| l.id == line_id).ok_or(CartError::LineNotFound)?;
        line.quantity = quantity;
        Ok(line)
    }

    pub fn remove_line(&mut self, line_id: Uuid) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        if self.lines.len() == before { return Err(CartError::LineNotFound); }
        Ok(())
    }

    pub fn clear(&mut self) { self.lines.clear(); }

    /// Fails if a stored line is priced in another currency than the cart.
    pub fn subtotal(&self) -> Result<Money, CartError> {
        self.lines.iter().try_fold(Money::zero(&self.currency), |acc, l| {
            acc.add(&l.line_total()).map_err(|_| CartError::CurrencyMismatch(l.unit_price.currency().to_string()))
        })
    }

    pub fn total_volume(&self) -> Decimal { self.lines.iter().map(|l| l.quantity.value()).sum() }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("cart line not found")]
    LineNotFound,
    #[error("cart is empty")]
    Empty,
    #[error("product priced in {0} cannot be added to this cart")]
    CurrencyMismatch(String),
}
