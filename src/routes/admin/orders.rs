use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::Staff;
use crate::db::{self, orders::OrderDetail};
use crate::domain::aggregates::{Order, OrderStatus};
use crate::error::{AppError, Result};
use crate::pagination::{ListParams, PaginatedResponse};
use crate::routes::notifications::notify;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate { pub status: OrderStatus }

pub async fn list(State(state): State<AppState>, _staff: Staff, Query(filter): Query<OrderFilter>) -> Result<Json<PaginatedResponse<Order>>> {
    let params = ListParams { page: filter.page, per_page: filter.per_page };
    let (orders, total) = db::orders::list(&state.db, filter.status, &params).await?;
    Ok(Json(PaginatedResponse::new(orders, total, &params)))
}

pub async fn get(State(state): State<AppState>, _staff: Staff, Path(id): Path<Uuid>) -> Result<Json<OrderDetail>> {
    let order = db::orders::get(&state.db, id).await?;
    Ok(Json(db::orders::detail(&state.db, order).await?))
}

/// Fulfilment and manual cancel/refund. Payment statuses only come from the
/// payment webhook.
#[instrument(skip(state, staff), fields(staff_id = %staff.0.id))]
pub async fn update_status(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let mut order = db::orders::get(&state.db, id).await?;
    let from = order.status;
    let changed = match req.status {
        OrderStatus::Processing => order.start_processing()?,
        OrderStatus::Dispatched => order.dispatch()?,
        OrderStatus::Delivered => order.deliver()?,
        OrderStatus::Cancelled => order.cancel()?,
        OrderStatus::Refunded => order.mark_refunded()?,
        other => return Err(AppError::BadRequest(format!("status {other} is set by payment events"))),
    };
    if !changed {
        return Ok(Json(order));
    }

    db::orders::update_status(&state.db, &order, from).await?;
    tracing::info!(order_id = %order.id, status = %order.status, "Order status updated by staff");
    state.events.publish_all(order.take_events()).await;
    notify(
        &state,
        order.customer_id,
        &format!("Order {} is now {}", order.order_number, order.status.as_str().replace('_', " ")),
        status_message(order.status),
        Some(format!("/orders/{}", order.id)),
    )
    .await;
    Ok(Json(order))
}

fn status_message(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Processing => "Your concrete is being batched for delivery.",
        OrderStatus::Dispatched => "Your delivery truck is on its way to site.",
        OrderStatus::Delivered => "Your order has been delivered. Thank you for building with us.",
        OrderStatus::Cancelled => "Your order has been cancelled. Contact us if this is unexpected.",
        OrderStatus::Refunded => "Your order has been refunded.",
        _ => "The status of your order has changed.",
    }
}
