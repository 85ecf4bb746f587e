//! Frequently asked questions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{RepositoryError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub position: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FaqInput {
    #[validate(length(min = 1, max = 500))]
    pub question: String,
    #[validate(length(min = 1, max = 5000))]
    pub answer: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "published_by_default")]
    pub published: bool,
}

fn published_by_default() -> bool { true }

pub async fn list_published(pool: &PgPool) -> Result<Vec<Faq>> {
    let rows = sqlx::query_as::<_, Faq>("SELECT * FROM faqs WHERE published ORDER BY position, created_at")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Faq>> {
    let rows = sqlx::query_as::<_, Faq>("SELECT * FROM faqs ORDER BY position, created_at").fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &PgPool, input: &FaqInput) -> Result<Faq> {
    let faq = sqlx::query_as::<_, Faq>(
        "INSERT INTO faqs (id, question, answer, position, published, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(&input.question).bind(&input.answer).bind(input.position).bind(input.published)
    .fetch_one(pool)
    .await?;
    Ok(faq)
}

pub async fn update(pool: &PgPool, id: Uuid, input: &FaqInput) -> Result<Faq> {
    sqlx::query_as::<_, Faq>(
        "UPDATE faqs SET question = $2, answer = $3, position = $4, published = $5, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(&input.question).bind(&input.answer).bind(input.position).bind(input.published)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM faqs WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 { return Err(RepositoryError::NotFound); }
    Ok(())
}
