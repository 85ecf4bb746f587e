//! Customer cart.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::Customer;
use crate::db;
use crate::domain::aggregates::{Cart, CartError, CartLine, ProductError};
use crate::domain::value_objects::{DeliveryMethod, Money, Volume};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub subtotal: Money,
    pub total_volume_m3: Decimal,
}

impl TryFrom<Cart> for CartView {
    type Error = CartError;

    fn try_from(cart: Cart) -> std::result::Result<Self, CartError> {
        Ok(Self { subtotal: cart.subtotal()?, total_volume_m3: cart.total_volume(), cart })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: Uuid,
    pub delivery_method: DeliveryMethod,
    pub quantity: Volume,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItem { pub quantity: Volume }

pub(crate) async fn load(state: &AppState, customer_id: Uuid) -> Result<Cart> {
    Ok(db::carts::get_or_create(&state.db, customer_id, &state.config.store.currency).await?)
}

#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn get(State(state): State<AppState>, customer: Customer) -> Result<Json<CartView>> {
    Ok(Json(load(&state, customer.0.id).await?.try_into()?))
}

/// Adds to the line for the same product and delivery method when present.
#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn add_item(
    State(state): State<AppState>,
    customer: Customer,
    Json(req): Json<AddItem>,
) -> Result<(StatusCode, Json<CartView>)> {
    let product = db::products::get(&state.db, req.product_id).await?;
    product.ensure_purchasable(req.quantity)?;

    let mut cart = load(&state, customer.0.id).await?;
    let line = cart.add_line(CartLine::for_product(&product, req.delivery_method, req.quantity))?.clone();
    if !product.has_stock_for(line.quantity) {
        return Err(ProductError::InsufficientStock { available: product.stock_m3, requested: line.quantity.value() }.into());
    }
    db::carts::save_line(&state.db, cart.id, &line).await?;

    let cart = load(&state, customer.0.id).await?;
    Ok((StatusCode::CREATED, Json(cart.try_into()?)))
}

#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn update_item(
    State(state): State<AppState>,
    customer: Customer,
    Path(line_id): Path<Uuid>,
    Json(req): Json<UpdateItem>,
) -> Result<Json<CartView>> {
    let mut cart = load(&state, customer.0.id).await?;
    let product_id = cart.line(line_id).ok_or(CartError::LineNotFound)?.product_id;
    let product = db::products::get(&state.db, product_id).await?;
    product.ensure_purchasable(req.quantity)?;

    let line = cart.set_quantity(line_id, req.quantity)?.clone();
    db::carts::save_line(&state.db, cart.id, &line).await?;
    Ok(Json(cart.try_into()?))
}

#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn remove_item(State(state): State<AppState>, customer: Customer, Path(line_id): Path<Uuid>) -> Result<Json<CartView>> {
    let mut cart = load(&state, customer.0.id).await?;
    cart.remove_line(line_id)?;
    db::carts::remove_line(&state.db, cart.id, line_id).await?;
    Ok(Json(cart.try_into()?))
}

#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn clear(State(state): State<AppState>, customer: Customer) -> Result<StatusCode> {
    let cart = load(&state, customer.0.id).await?;
    db::carts::clear(&state.db, cart.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
