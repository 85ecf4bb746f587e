//! Checkout: quote the cart, then turn it into an order with a payment intent.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::cart::load;
use super::notifications::notify;
use crate::auth::Customer;
use crate::db::{self, orders::OrderDetail};
use crate::domain::aggregates::Order;
use crate::domain::pricing::CheckoutQuote;
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderDetail,
    pub client_secret: Option<String>,
}

#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn quote(State(state): State<AppState>, customer: Customer) -> Result<Json<CheckoutQuote>> {
    let cart = load(&state, customer.0.id).await?;
    Ok(Json(state.config.store.pricing_policy().quote(&cart)?))
}

/// Stores the order and empties the cart in one transaction, after the
/// payment intent exists. Stock is only taken once payment succeeds.
#[instrument(skip(state, customer, req), fields(customer_id = %customer.0.id))]
pub async fn checkout(
    State(state): State<AppState>,
    customer: Customer,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    req.validate()?;
    let payments = state.payments()?;
    let user = customer.0;
    let email = user.email.clone().ok_or_else(|| AppError::BadRequest("account has no email address".into()))?;

    let cart = load(&state, user.id).await?;
    for line in &cart.lines {
        let product = db::products::get(&state.db, line.product_id).await?;
        product.ensure_purchasable(line.quantity)?;
    }
    let quote = state.config.store.pricing_policy().quote(&cart)?;
    let address = db::addresses::get(&state.db, req.address_id, user.id).await?;

    let notes = req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let (mut order, lines) = Order::place(&cart, &quote, email, address.to_snapshot(), notes);

    let amount = order.total_money().to_minor_units().map_err(|e| AppError::Internal(e.to_string()))?;
    let intent = payments.create_intent(order.id, &order.order_number, amount, &order.currency).await?;
    order.payment_intent_id = Some(intent.id.clone());

    let mut tx = state.db.begin().await.map_err(db::RepositoryError::from)?;
    db::orders::insert(&mut *tx, &order, &lines).await?;
    db::carts::clear(&mut *tx, cart.id).await?;
    tx.commit().await.map_err(db::RepositoryError::from)?;

    tracing::info!(order_id = %order.id, order_number = %order.order_number, total = %order.total, "Order placed");
    state.events.publish_all(order.take_events()).await;
    notify(
        &state,
        user.id,
        &format!("Order {} received", order.order_number),
        "We have received your order and are waiting for payment confirmation.",
        Some(format!("/orders/{}", order.id)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(CheckoutResponse { order: OrderDetail { order, lines }, client_secret: intent.client_secret })))
}
