//! Data access for the storefront's hosted `PostgreSQL`.
//!
//! # Tables
//!
//! - `products` - concrete grades with per-delivery-method prices and stock
//! - `carts`, `cart_items` - one open cart per customer
//! - `orders`, `order_items` - placed orders and their priced lines
//! - `addresses` - customer delivery sites
//! - `enquiries` - contact form submissions and staff responses
//! - `faqs`, `posts` - content managed from the back office
//! - `notifications` - per-customer inbox
//! - `ban_history` - account suspensions
//!
//! Integrity rules (foreign keys, uniqueness) live in `migrations/`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

pub mod addresses;
pub mod bans;
pub mod carts;
pub mod enquiries;
pub mod faqs;
pub mod notifications;
pub mod orders;
pub mod posts;
pub mod products;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(&'static str),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Create a `PostgreSQL` connection pool.
pub async fn create_pool(database_url: &SecretString, max_connections: u32) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// URL-safe slug: lowercase, alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
