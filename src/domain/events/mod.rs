//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::order::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, customer_id: Uuid, total: Decimal, currency: String },
    OrderStatusChanged { order_id: Uuid, customer_id: Uuid, from: OrderStatus, to: OrderStatus },
    StockDepleted { product_id: Uuid, order_id: Uuid, available: Decimal, requested: Decimal },
    EnquiryReceived { enquiry_id: Uuid, subject: String },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "storefront.order.placed",
            Self::OrderStatusChanged { .. } => "storefront.order.status_changed",
            Self::StockDepleted { .. } => "storefront.product.stock_depleted",
            Self::EnquiryReceived { .. } => "storefront.enquiry.received",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_is_tagged() {
        let e = DomainEvent::EnquiryReceived { enquiry_id: Uuid::nil(), subject: "Bulk N30".into() };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "enquiry_received");
        assert_eq!(e.subject(), "storefront.enquiry.received");
    }
}
