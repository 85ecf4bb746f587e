//! Product catalog queries.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{RepositoryError, Result};
use crate::domain::aggregates::{Product, ProductStatus};
use crate::domain::value_objects::Volume;
use crate::pagination::ListParams;

pub async fn list_active(pool: &PgPool) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE status = 'active' ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(products)
}

/// Every product regardless of status, for the back office.
pub async fn list_all(pool: &PgPool, params: &ListParams) -> Result<(Vec<Product>, i64)> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(pool).await?;
    Ok((products, total.0))
}

pub async fn get(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(RepositoryError::NotFound)
}

pub async fn insert(pool: &PgPool, p: &Product) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, grade, price_normal, price_pump, price_tremie, currency, stock_m3, status, tags, image_url, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW()) RETURNING *",
    )
    .bind(p.id).bind(&p.name).bind(&p.description).bind(p.grade.to_string())
    .bind(p.prices.price_normal).bind(p.prices.price_pump).bind(p.prices.price_tremie)
    .bind(&p.currency).bind(p.stock_m3).bind(p.status.as_str()).bind(&p.tags).bind(&p.image_url)
    .fetch_one(pool)
    .await?;
    Ok(product)
}

/// Writes the editable fields. Stock is left alone; see [`set_stock`] and
/// [`decrement_stock`].
pub async fn update(executor: impl PgExecutor<'_>, p: &Product) -> Result<Product> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, grade = $4, price_normal = $5, price_pump = $6, price_tremie = $7, \
         status = $8, tags = $9, image_url = $10, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(p.id).bind(&p.name).bind(&p.description).bind(p.grade.to_string())
    .bind(p.prices.price_normal).bind(p.prices.price_pump).bind(p.prices.price_tremie)
    .bind(p.status.as_str()).bind(&p.tags).bind(&p.image_url)
    .fetch_optional(executor)
    .await?
    .ok_or(RepositoryError::NotFound)
}

pub async fn set_status(pool: &PgPool, id: Uuid, status: ProductStatus) -> Result<Product> {
    sqlx::query_as::<_, Product>("UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)
}

pub async fn set_stock(executor: impl PgExecutor<'_>, id: Uuid, stock_m3: Decimal) -> Result<Product> {
    sqlx::query_as::<_, Product>("UPDATE products SET stock_m3 = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(stock_m3)
        .fetch_optional(executor)
        .await?
        .ok_or(RepositoryError::NotFound)
}

pub async fn set_tags(pool: &PgPool, id: Uuid, tags: &[String]) -> Result<Product> {
    sqlx::query_as::<_, Product>("UPDATE products SET tags = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(tags)
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Takes `qty` out of stock. Returns the remaining stock, or `None` when
/// there is not enough left, in which case nothing changes.
pub async fn decrement_stock(executor: impl PgExecutor<'_>, id: Uuid, qty: Volume) -> Result<Option<Decimal>> {
    let remaining: Option<(Decimal,)> = sqlx::query_as(
        "UPDATE products SET stock_m3 = stock_m3 - $2, updated_at = NOW() WHERE id = $1 AND stock_m3 >= $2 RETURNING stock_m3",
    )
    .bind(id)
    .bind(qty.value())
    .fetch_optional(executor)
    .await?;
    Ok(remaining.map(|r| r.0))
}
