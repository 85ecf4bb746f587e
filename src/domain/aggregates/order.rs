//! Order Aggregate

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::Cart;
use crate::domain::events::DomainEvent;
use crate::domain::pricing::CheckoutQuote;
use crate::domain::value_objects::{DeliveryMethod, Grade, Money};

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub delivery_address: serde_json::Value,
    pub notes: Option<String>,
    pub payment_intent_id: Option<String>,
    /// Set once payment is captured; a cancelled order without it was never paid.
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    #[sqlx(try_from = "String")]
    pub grade: Grade,
    #[sqlx(try_from = "String")]
    pub delivery_method: DeliveryMethod,
    pub quantity_m3: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    PaymentFailed,
    Processing,
    Dispatched,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        Self::Pending, Self::Paid, Self::PaymentFailed, Self::Processing,
        Self::Dispatched, Self::Delivered, Self::Cancelled, Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::PaymentFailed => "payment_failed",
            Self::Processing => "processing",
            Self::Dispatched => "dispatched",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Orders whose payment has been captured and not returned.
    pub fn counts_as_revenue(&self) -> bool {
        matches!(self, Self::Paid | Self::Processing | Self::Dispatched | Self::Delivered)
    }

    fn allows(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match to {
            Paid => matches!(self, Pending | PaymentFailed),
            PaymentFailed => self == Pending,
            Processing => self == Paid,
            Dispatched => self == Processing,
            Delivered => self == Dispatched,
            Cancelled => matches!(self, Pending | PaymentFailed | Paid | Processing),
            Refunded => matches!(self, Paid | Processing | Dispatched | Delivered | Cancelled),
            Pending => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl TryFrom<String> for OrderStatus {
    type Error = OrderError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::ALL.into_iter().find(|s| s.as_str() == value).ok_or(OrderError::UnknownStatus(value))
    }
}

impl Order {
    /// Snapshots a priced cart into a pending order and its lines.
    pub fn place(cart: &Cart, quote: &CheckoutQuote, email: impl Into<String>, delivery_address: serde_json::Value, notes: Option<String>) -> (Self, Vec<OrderLine>) {
        let now = Utc::now();
        let id = Uuid::now_v7();
        let lines = cart.lines.iter().map(|l| OrderLine {
            id: Uuid::now_v7(), order_id: id, product_id: l.product_id, product_name: l.product_name.clone(),
            grade: l.grade, delivery_method: l.delivery_method, quantity_m3: l.quantity.value(),
            unit_price: l.unit_price.amount(), line_total: l.line_total().amount(),
        }).collect::<Vec<_>>();
        let mut order = Self {
            id, order_number: generate_order_number(), customer_id: cart.customer_id, email: email.into(),
            status: OrderStatus::Pending, currency: quote.total.currency().to_string(),
            subtotal: quote.subtotal.amount(), discount: quote.discount.amount(), delivery_fee: quote.delivery_fee.amount(),
            tax: quote.tax.amount(), total: quote.total.amount(), delivery_address, notes,
            payment_intent_id: None, paid_at: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::OrderPlaced { order_id: id, customer_id: order.customer_id, total: order.total, currency: order.currency.clone() });
        (order, lines)
    }

    pub fn total_money(&self) -> Money { Money::new(self.total, &self.currency) }

    pub fn mark_paid(&mut self) -> Result<bool, OrderError> {
        let changed = self.transition(OrderStatus::Paid)?;
        if changed {
            self.paid_at = Some(self.updated_at);
        }
        Ok(changed)
    }
    pub fn mark_payment_failed(&mut self) -> Result<bool, OrderError> { self.transition(OrderStatus::PaymentFailed) }
    pub fn mark_refunded(&mut self) -> Result<bool, OrderError> { self.transition(OrderStatus::Refunded) }
    pub fn cancel(&mut self) -> Result<bool, OrderError> { self.transition(OrderStatus::Cancelled) }
    pub fn start_processing(&mut self) -> Result<bool, OrderError> { self.transition(OrderStatus::Processing) }
    pub fn dispatch(&mut self) -> Result<bool, OrderError> { self.transition(OrderStatus::Dispatched) }
    pub fn deliver(&mut self) -> Result<bool, OrderError> { self.transition(OrderStatus::Delivered) }

    /// Customers may only withdraw an order before it has been paid.
    pub fn cancel_by_customer(&mut self) -> Result<bool, OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::PaymentFailed | OrderStatus::Cancelled) {
            return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Cancelled });
        }
        self.cancel()
    }

    /// Moves to `to`. Returns `Ok(false)` when already there so repeated
    /// webhook deliveries are harmless.
    pub fn transition(&mut self, to: OrderStatus) -> Result<bool, OrderError> {
        if self.status == to { return Ok(false); }
        if !self.status.allows(to) { return Err(OrderError::InvalidTransition { from: self.status, to }); }
        // Only money actually taken can be refunded.
        if to == OrderStatus::Refunded && self.paid_at.is_none() {
            return Err(OrderError::InvalidTransition { from: self.status, to });
        }
        let from = std::mem::replace(&mut self.status, to);
        self.touch();
        self.raise_event(DomainEvent::OrderStatusChanged { order_id: self.id, customer_id: self.customer_id, from, to });
        Ok(true)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

pub fn generate_order_number() -> String {
    format!("ORD-{:08}", rand::thread_rng().gen_range(0..100_000_000u32))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("unknown order status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::CartLine;
    use crate::domain::aggregates::product::sample_product;
    use crate::domain::pricing::PricingPolicy;
    use crate::domain::value_objects::Volume;

    fn placed() -> (Order, Vec<OrderLine>) {
        let mut cart = Cart::new(Uuid::now_v7(), Uuid::now_v7(), "MYR");
        let p = sample_product("Ready Mix N20", "N20", 220);
        cart.add_line(CartLine::for_product(&p, DeliveryMethod::Normal, Volume::new(Decimal::new(3, 0)).unwrap())).unwrap();
        let quote = PricingPolicy::default().quote(&cart).unwrap();
        Order::place(&cart, &quote, "site@builder.test", serde_json::json!({"line1": "Lot 5"}), None)
    }

    #[test]
    fn test_order_workflow() {
        let (mut order, lines) = placed();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line_total, Decimal::new(660, 0));
        assert_eq!(order.total, Decimal::new(660, 0));
        assert!(order.order_number.starts_with("ORD-") && order.order_number.len() == 12);
        let events = order.take_events();
        assert!(matches!(events.as_slice(), [DomainEvent::OrderPlaced { .. }]));

        assert!(order.mark_paid().unwrap());
        assert!(!order.mark_paid().unwrap());
        order.start_processing().unwrap();
        order.dispatch().unwrap();
        order.deliver().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.take_events().len(), 4);
        assert!(order.cancel().is_err());
        order.mark_refunded().unwrap();
    }

    #[test]
    fn test_failed_payment_can_be_retried() {
        let (mut order, _) = placed();
        order.mark_payment_failed().unwrap();
        assert_eq!(order.status, OrderStatus::PaymentFailed);
        order.mark_paid().unwrap();
        assert_eq!(
            order.mark_payment_failed().unwrap_err(),
            OrderError::InvalidTransition { from: OrderStatus::Paid, to: OrderStatus::PaymentFailed }
        );
    }

    #[test]
    fn test_customer_cancel_window() {
        let (mut order, _) = placed();
        assert!(order.cancel_by_customer().unwrap());
        let (mut paid, _) = placed();
        paid.mark_paid().unwrap();
        assert!(paid.cancel_by_customer().is_err());
        assert!(paid.cancel().unwrap());
    }

    #[test]
    fn test_refund_requires_payment() {
        let (mut unpaid, _) = placed();
        unpaid.cancel_by_customer().unwrap();
        assert_eq!(
            unpaid.mark_refunded().unwrap_err(),
            OrderError::InvalidTransition { from: OrderStatus::Cancelled, to: OrderStatus::Refunded }
        );
        assert_eq!(unpaid.status, OrderStatus::Cancelled);

        let (mut paid, _) = placed();
        paid.mark_paid().unwrap();
        assert!(paid.paid_at.is_some());
        paid.cancel().unwrap();
        assert!(paid.mark_refunded().unwrap());
    }

    #[test]
    fn test_status_text() {
        for s in OrderStatus::ALL { assert_eq!(OrderStatus::try_from(s.as_str().to_string()).unwrap(), s); }
        assert!(OrderStatus::try_from("shipped".to_string()).is_err());
    }
}
