//! Customer carts. Lines are priced from the product row at read time.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{RepositoryError, Result};
use crate::domain::aggregates::product::DeliveryPrices;
use crate::domain::aggregates::{Cart, CartLine};
use crate::domain::value_objects::{DeliveryMethod, Grade, Money, Volume};

#[derive(Debug, sqlx::FromRow)]
struct CartRow { id: Uuid, customer_id: Uuid, currency: String }

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    #[sqlx(try_from = "String")]
    grade: Grade,
    #[sqlx(try_from = "String")]
    delivery_method: DeliveryMethod,
    quantity_m3: Decimal,
    #[sqlx(flatten)]
    prices: DeliveryPrices,
    currency: String,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;
    fn try_from(row: CartLineRow) -> Result<Self> {
        let quantity = Volume::new(row.quantity_m3).map_err(|e| RepositoryError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(CartLine {
            id: row.id, product_id: row.product_id, product_name: row.product_name, grade: row.grade,
            delivery_method: row.delivery_method, quantity,
            unit_price: Money::new(row.prices.get(row.delivery_method), &row.currency),
        })
    }
}

/// Loads the customer's cart, creating an empty one on first use.
pub async fn get_or_create(pool: &PgPool, customer_id: Uuid, currency: &str) -> Result<Cart> {
    let row = sqlx::query_as::<_, CartRow>(
        "INSERT INTO carts (id, customer_id, currency, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW()) \
         ON CONFLICT (customer_id) DO UPDATE SET updated_at = carts.updated_at RETURNING id, customer_id, currency",
    )
    .bind(Uuid::now_v7())
    .bind(customer_id)
    .bind(currency)
    .fetch_one(pool)
    .await?;

    let lines = sqlx::query_as::<_, CartLineRow>(
        "SELECT ci.id, ci.product_id, p.name AS product_name, p.grade, ci.delivery_method, ci.quantity_m3, \
         p.price_normal, p.price_pump, p.price_tremie, p.currency \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id WHERE ci.cart_id = $1 ORDER BY ci.created_at",
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(CartLine::try_from)
    .collect::<Result<Vec<_>>>()?;

    let mut cart = Cart::new(row.id, row.customer_id, &row.currency);
    cart.lines = lines;
    Ok(cart)
}

/// Stores a line, replacing the quantity of an existing line for the same
/// product and delivery method.
pub async fn save_line(pool: &PgPool, cart_id: Uuid, line: &CartLine) -> Result<Uuid> {
    let id: (Uuid,) = sqlx::query_as(
        "INSERT INTO cart_items (id, cart_id, product_id, delivery_method, quantity_m3, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) \
         ON CONFLICT (cart_id, product_id, delivery_method) DO UPDATE SET quantity_m3 = EXCLUDED.quantity_m3 RETURNING id",
    )
    .bind(line.id)
    .bind(cart_id)
    .bind(line.product_id)
    .bind(line.delivery_method.as_str())
    .bind(line.quantity.value())
    .fetch_one(pool)
    .await?;
    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1").bind(cart_id).execute(pool).await?;
    Ok(id.0)
}

pub async fn remove_line(pool: &PgPool, cart_id: Uuid, line_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(line_id)
        .bind(cart_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 { return Err(RepositoryError::NotFound); }
    Ok(())
}

pub async fn clear(executor: impl PgExecutor<'_>, cart_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(executor).await?;
    Ok(())
}
