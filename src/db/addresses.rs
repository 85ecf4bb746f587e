//! Customer delivery addresses (site addresses for concrete drops).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{RepositoryError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub label: Option<String>,
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(max = 50))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub recipient: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 3, max = 10))]
    pub postcode: String,
}

impl Address {
    /// Snapshot stored on an order so later edits don't rewrite history.
    pub fn to_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "recipient": self.recipient, "phone": self.phone, "line1": self.line1, "line2": self.line2,
            "city": self.city, "state": self.state, "postcode": self.postcode,
        })
    }
}

pub async fn list(pool: &PgPool, customer_id: Uuid) -> Result<Vec<Address>> {
    let rows = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE customer_id = $1 ORDER BY is_default DESC, created_at")
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, id: Uuid, customer_id: Uuid) -> Result<Address> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND customer_id = $2")
        .bind(id)
        .bind(customer_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// The first address a customer saves becomes their default.
pub async fn create(pool: &PgPool, customer_id: Uuid, input: &AddressInput) -> Result<Address> {
    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses (id, customer_id, label, recipient, phone, line1, line2, city, state, postcode, is_default, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOT EXISTS (SELECT 1 FROM addresses WHERE customer_id = $2), NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(customer_id).bind(&input.label).bind(&input.recipient).bind(&input.phone)
    .bind(&input.line1).bind(&input.line2).bind(&input.city).bind(&input.state).bind(&input.postcode)
    .fetch_one(pool)
    .await?;
    Ok(address)
}

pub async fn update(pool: &PgPool, id: Uuid, customer_id: Uuid, input: &AddressInput) -> Result<Address> {
    sqlx::query_as::<_, Address>(
        "UPDATE addresses SET label = $3, recipient = $4, phone = $5, line1 = $6, line2 = $7, city = $8, state = $9, postcode = $10, \
         updated_at = NOW() WHERE id = $1 AND customer_id = $2 RETURNING *",
    )
    .bind(id).bind(customer_id).bind(&input.label).bind(&input.recipient).bind(&input.phone)
    .bind(&input.line1).bind(&input.line2).bind(&input.city).bind(&input.state).bind(&input.postcode)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

pub async fn delete(pool: &PgPool, id: Uuid, customer_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND customer_id = $2")
        .bind(id)
        .bind(customer_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 { return Err(RepositoryError::NotFound); }
    Ok(())
}

/// Makes `id` the only default address of the customer.
pub async fn set_default(pool: &PgPool, id: Uuid, customer_id: Uuid) -> Result<Address> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE customer_id = $1 AND is_default")
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;
    let address = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET is_default = TRUE, updated_at = NOW() WHERE id = $1 AND customer_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(customer_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(RepositoryError::NotFound)?;
    tx.commit().await?;
    Ok(address)
}
