//! Blog posts (project showcases, concreting guides).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{slugify, RepositoryError, Result};
use crate::pagination::ListParams;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub cover_image_url: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1))]
    pub body: String,
    #[validate(url)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

pub async fn list_published(pool: &PgPool, params: &ListParams) -> Result<(Vec<Post>, i64)> {
    let rows = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE published ORDER BY published_at DESC LIMIT $1 OFFSET $2")
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE published").fetch_one(pool).await?;
    Ok((rows, total.0))
}

pub async fn get_published(pool: &PgPool, slug: &str) -> Result<Post> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE slug = $1 AND published")
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)
}

pub async fn list_all(pool: &PgPool, params: &ListParams) -> Result<(Vec<Post>, i64)> {
    let rows = sqlx::query_as::<_, Post>("SELECT * FROM posts ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts").fetch_one(pool).await?;
    Ok((rows, total.0))
}

/// Slugs come from the title; a clash gets a short random suffix.
pub async fn create(pool: &PgPool, author_id: Uuid, input: &PostInput) -> Result<Post> {
    let base = slugify(&input.title);
    let base = if base.is_empty() { "post".to_string() } else { base };
    let taken: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM posts WHERE slug = $1)").bind(&base).fetch_one(pool).await?;
    let slug = if taken.0 { format!("{base}-{}", &Uuid::new_v4().simple().to_string()[..6]) } else { base };

    let post = sqlx::query_as::<_, Post>(
        "INSERT INTO posts (id, title, slug, excerpt, body, cover_image_url, published, published_at, author_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 THEN NOW() END, $8, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(&input.title).bind(&slug).bind(&input.excerpt).bind(&input.body)
    .bind(&input.cover_image_url).bind(input.published).bind(author_id)
    .fetch_one(pool)
    .await?;
    Ok(post)
}

/// The slug stays stable across edits; `published_at` is set on first publish.
pub async fn update(pool: &PgPool, id: Uuid, input: &PostInput) -> Result<Post> {
    sqlx::query_as::<_, Post>(
        "UPDATE posts SET title = $2, excerpt = $3, body = $4, cover_image_url = $5, published = $6, \
         published_at = CASE WHEN $6 THEN COALESCE(published_at, NOW()) END, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(&input.title).bind(&input.excerpt).bind(&input.body).bind(&input.cover_image_url).bind(input.published)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 { return Err(RepositoryError::NotFound); }
    Ok(())
}
