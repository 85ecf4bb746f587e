//! Contact and quotation enquiries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{RepositoryError, Result};
use crate::pagination::ListParams;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Enquiry {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub response: Option<String>,
    pub responded_by: Option<Uuid>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEnquiry {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
    pub product_id: Option<Uuid>,
}

pub async fn create(pool: &PgPool, customer_id: Option<Uuid>, input: &NewEnquiry) -> Result<Enquiry> {
    let enquiry = sqlx::query_as::<_, Enquiry>(
        "INSERT INTO enquiries (id, customer_id, product_id, name, email, phone, subject, message, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'open', NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(customer_id).bind(input.product_id)
    .bind(input.name.trim()).bind(input.email.trim().to_lowercase()).bind(&input.phone)
    .bind(input.subject.trim()).bind(input.message.trim())
    .fetch_one(pool)
    .await?;
    Ok(enquiry)
}

pub async fn list(pool: &PgPool, status: Option<&str>, params: &ListParams) -> Result<(Vec<Enquiry>, i64)> {
    let rows = sqlx::query_as::<_, Enquiry>(
        "SELECT * FROM enquiries WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM enquiries WHERE ($1::TEXT IS NULL OR status = $1)")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok((rows, total.0))
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Enquiry> {
    sqlx::query_as::<_, Enquiry>("SELECT * FROM enquiries WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Records the staff reply and closes the enquiry.
pub async fn respond(pool: &PgPool, id: Uuid, staff_id: Uuid, response: &str) -> Result<Enquiry> {
    sqlx::query_as::<_, Enquiry>(
        "UPDATE enquiries SET response = $2, responded_by = $3, responded_at = NOW(), status = 'closed' WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(response)
    .bind(staff_id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}
