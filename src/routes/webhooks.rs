//! Payment provider webhook.
//!
//! The provider retries anything that is not a 2xx, so once the signature
//! checks out every delivery is acknowledged, including ones that do not
//! apply to any order.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::instrument;

use super::notifications::notify;
use crate::db;
use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Volume;
use crate::error::{AppError, Result};
use crate::services::payments::{PaymentError, PaymentOutcome};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[instrument(skip_all)]
pub async fn payments(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>> {
    let client = state.payments()?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PaymentError::InvalidSignature("missing signature header".into()))?;
    let event = client.parse_webhook(&body, signature, Utc::now().timestamp())?;

    let Some((outcome, intent_id)) = event.outcome.clone() else {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
        return Ok(Json(json!({ "received": true })));
    };
    tracing::info!(event_id = %event.id, event_type = %event.event_type, %intent_id, "Payment webhook received");

    let mut tx = state.db.begin().await.map_err(db::RepositoryError::from)?;
    let Some(mut order) = db::orders::lock_by_payment_intent(&mut *tx, &intent_id).await? else {
        tracing::warn!(%intent_id, "No order for payment intent");
        return Ok(Json(json!({ "received": true })));
    };

    let from = order.status;
    let applied = match outcome {
        PaymentOutcome::Succeeded => order.mark_paid(),
        PaymentOutcome::Failed => order.mark_payment_failed(),
        PaymentOutcome::Canceled => order.cancel(),
        PaymentOutcome::Refunded => order.mark_refunded(),
    };
    let changed = match applied {
        Ok(changed) => changed,
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "Webhook does not apply to order in its current status");
            return Ok(Json(json!({ "received": true, "applied": false })));
        }
    };
    if !changed {
        return Ok(Json(json!({ "received": true, "applied": false })));
    }

    db::orders::update_status(&mut *tx, &order, from).await?;
    let mut events = order.take_events();
    if order.status == OrderStatus::Paid {
        events.extend(take_stock(&mut *tx, &order).await?);
    }
    tx.commit().await.map_err(db::RepositoryError::from)?;

    tracing::info!(order_id = %order.id, status = %order.status, "Order payment status updated");
    state.events.publish_all(events).await;
    let (title, body) = payment_message(&order);
    notify(&state, order.customer_id, &title, body, Some(format!("/orders/{}", order.id))).await;

    Ok(Json(json!({ "received": true, "applied": true })))
}

/// Decrements stock for every line. Shortfalls are logged and reported as
/// events; the order stays paid.
async fn take_stock(tx: &mut sqlx::PgConnection, order: &Order) -> Result<Vec<DomainEvent>> {
    let mut shortfalls = Vec::new();
    for line in db::orders::lines(&mut *tx, order.id).await? {
        let qty = Volume::new(line.quantity_m3).map_err(|e| AppError::Internal(e.to_string()))?;
        if db::products::decrement_stock(&mut *tx, line.product_id, qty).await?.is_none() {
            let available = db::products::get(&mut *tx, line.product_id).await?.stock_m3;
            tracing::warn!(order_id = %order.id, product_id = %line.product_id, %available, requested = %line.quantity_m3, "Insufficient stock for paid order");
            shortfalls.push(DomainEvent::StockDepleted {
                product_id: line.product_id,
                order_id: order.id,
                available,
                requested: line.quantity_m3,
            });
        }
    }
    Ok(shortfalls)
}

fn payment_message(order: &Order) -> (String, &'static str) {
    let n = &order.order_number;
    match order.status {
        OrderStatus::Paid => (format!("Payment received for {n}"), "Thank you, your payment was successful. We will schedule your delivery shortly."),
        OrderStatus::PaymentFailed => (format!("Payment failed for {n}"), "Your payment did not go through. Please try again or use another payment method."),
        OrderStatus::Cancelled => (format!("Order {n} cancelled"), "Your payment was cancelled and the order has been closed."),
        OrderStatus::Refunded => (format!("Refund issued for {n}"), "Your payment has been refunded."),
        _ => (format!("Order {n} updated"), "The status of your order has changed."),
    }
}
