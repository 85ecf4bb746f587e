//! Orders and their line items.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::{RepositoryError, Result};
use crate::domain::aggregates::{Order, OrderLine, OrderStatus};
use crate::pagination::ListParams;

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Inserts the order and its lines; callers run this inside a transaction.
pub async fn insert(conn: &mut PgConnection, order: &Order, lines: &[OrderLine]) -> Result<()> {
    sqlx::query(
        "INSERT INTO orders (id, order_number, customer_id, email, status, currency, subtotal, discount, delivery_fee, tax, total, \
         delivery_address, notes, payment_intent_id, paid_at, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(order.id).bind(&order.order_number).bind(order.customer_id).bind(&order.email)
    .bind(order.status.as_str()).bind(&order.currency)
    .bind(order.subtotal).bind(order.discount).bind(order.delivery_fee).bind(order.tax).bind(order.total)
    .bind(&order.delivery_address).bind(&order.notes).bind(&order.payment_intent_id)
    .bind(order.paid_at).bind(order.created_at).bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for line in lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, product_name, grade, delivery_method, quantity_m3, unit_price, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(line.id).bind(line.order_id).bind(line.product_id).bind(&line.product_name)
        .bind(line.grade.to_string()).bind(line.delivery_method.as_str())
        .bind(line.quantity_m3).bind(line.unit_price).bind(line.line_total)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn get(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Order> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Same as [`get`] but only when the order belongs to `customer_id`.
pub async fn get_for_customer(pool: &PgPool, id: Uuid, customer_id: Uuid) -> Result<Order> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND customer_id = $2")
        .bind(id)
        .bind(customer_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)
}

pub async fn lines(executor: impl PgExecutor<'_>, order_id: Uuid) -> Result<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(executor)
        .await?;
    Ok(lines)
}

pub async fn detail(pool: &PgPool, order: Order) -> Result<OrderDetail> {
    let lines = lines(pool, order.id).await?;
    Ok(OrderDetail { order, lines })
}

pub async fn list_for_customer(pool: &PgPool, customer_id: Uuid, params: &ListParams) -> Result<(Vec<Order>, i64)> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3")
        .bind(customer_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE customer_id = $1").bind(customer_id).fetch_one(pool).await?;
    Ok((orders, total.0))
}

/// Staff listing, optionally narrowed to one status.
pub async fn list(pool: &PgPool, status: Option<OrderStatus>, params: &ListParams) -> Result<(Vec<Order>, i64)> {
    let status = status.map(|s| s.as_str());
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::TEXT IS NULL OR status = $1)")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok((orders, total.0))
}

/// Locks the order paid through `intent_id` for the rest of the transaction.
pub async fn lock_by_payment_intent(conn: &mut PgConnection, intent_id: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_intent_id = $1 FOR UPDATE")
        .bind(intent_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Writes the order's new status, but only if the stored row is still in
/// `from`. A row that moved on in the meantime yields `Conflict`.
pub async fn update_status(executor: impl PgExecutor<'_>, order: &Order, from: OrderStatus) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET status = $2, paid_at = $3, updated_at = $4 WHERE id = $1 AND status = $5")
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.paid_at)
        .bind(order.updated_at)
        .bind(from.as_str())
        .execute(executor)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict("order status changed, reload and try again"));
    }
    Ok(())
}

/// Orders placed since `since` with all their lines, for sales insights.
pub async fn placed_since(pool: &PgPool, since: DateTime<Utc>) -> Result<(Vec<Order>, Vec<OrderLine>)> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE created_at >= $1 ORDER BY created_at")
        .bind(since)
        .fetch_all(pool)
        .await?;
    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT oi.* FROM order_items oi JOIN orders o ON o.id = oi.order_id WHERE o.created_at >= $1",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok((orders, lines))
}
