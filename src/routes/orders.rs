//! A customer's own orders.

use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::Customer;
use crate::db::{self, orders::OrderDetail};
use crate::domain::aggregates::Order;
use crate::error::Result;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::AppState;

pub async fn list(State(state): State<AppState>, customer: Customer, Query(params): Query<ListParams>) -> Result<Json<PaginatedResponse<Order>>> {
    let (orders, total) = db::orders::list_for_customer(&state.db, customer.0.id, &params).await?;
    Ok(Json(PaginatedResponse::new(orders, total, &params)))
}

/// Other customers' orders are reported as missing.
#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn get(State(state): State<AppState>, customer: Customer, Path(id): Path<Uuid>) -> Result<Json<OrderDetail>> {
    let order = db::orders::get_for_customer(&state.db, id, customer.0.id).await?;
    Ok(Json(db::orders::detail(&state.db, order).await?))
}

#[instrument(skip(state, customer), fields(customer_id = %customer.0.id))]
pub async fn cancel(State(state): State<AppState>, customer: Customer, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let mut order = db::orders::get_for_customer(&state.db, id, customer.0.id).await?;
    let from = order.status;
    if order.cancel_by_customer()? {
        db::orders::update_status(&state.db, &order, from).await?;
        tracing::info!(order_id = %order.id, "Order cancelled by customer");
        state.events.publish_all(order.take_events()).await;
    }
    Ok(Json(order))
}
