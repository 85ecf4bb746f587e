//! Per-customer notification inbox.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, Result};
use crate::pagination::ListParams;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Unread first, newest first within each group.
pub async fn list(pool: &PgPool, customer_id: Uuid, params: &ListParams) -> Result<(Vec<Notification>, i64)> {
    let rows = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE customer_id = $1 ORDER BY (read_at IS NULL) DESC, created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(customer_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await?;
    let unread = unread_count(pool, customer_id).await?;
    Ok((rows, unread))
}

pub async fn count(pool: &PgPool, customer_id: Uuid) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

pub async fn unread_count(pool: &PgPool, customer_id: Uuid) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE customer_id = $1 AND read_at IS NULL")
        .bind(customer_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

pub async fn create(pool: &PgPool, customer_id: Uuid, title: &str, body: &str, link: Option<&str>) -> Result<Notification> {
    let n = sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications (id, customer_id, title, body, link, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(customer_id)
    .bind(title)
    .bind(body)
    .bind(link)
    .fetch_one(pool)
    .await?;
    Ok(n)
}

pub async fn mark_read(pool: &PgPool, id: Uuid, customer_id: Uuid) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET read_at = COALESCE(read_at, NOW()) WHERE id = $1 AND customer_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(customer_id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Returns how many notifications changed.
pub async fn mark_all_read(pool: &PgPool, customer_id: Uuid) -> Result<u64> {
    let result = sqlx::query("UPDATE notifications SET read_at = NOW() WHERE customer_id = $1 AND read_at IS NULL")
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
