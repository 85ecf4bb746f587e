//! Account suspensions. Rows are never deleted, so the table doubles as the
//! customer's ban history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Ban {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub reason: String,
    pub banned_by: Uuid,
    pub banned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub lifted_at: Option<DateTime<Utc>>,
    pub lifted_by: Option<Uuid>,
}

impl Ban {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.lifted_at.is_none() && self.expires_at.map_or(true, |until| until > now)
    }
}

/// The ban currently in force, if any.
pub async fn active(pool: &PgPool, customer_id: Uuid) -> Result<Option<Ban>> {
    let unlifted = sqlx::query_as::<_, Ban>(
        "SELECT * FROM ban_history WHERE customer_id = $1 AND lifted_at IS NULL ORDER BY banned_at DESC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await?;
    let now = Utc::now();
    Ok(unlifted.into_iter().find(|ban| ban.is_active_at(now)))
}

pub async fn ban(pool: &PgPool, customer_id: Uuid, staff_id: Uuid, reason: &str, expires_at: Option<DateTime<Utc>>) -> Result<Ban> {
    let ban = sqlx::query_as::<_, Ban>(
        "INSERT INTO ban_history (id, customer_id, reason, banned_by, banned_at, expires_at) VALUES ($1, $2, $3, $4, NOW(), $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(customer_id)
    .bind(reason)
    .bind(staff_id)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(ban)
}

/// Lifts every ban still in force. `NotFound` when there was none.
pub async fn lift(pool: &PgPool, customer_id: Uuid, staff_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE ban_history SET lifted_at = NOW(), lifted_by = $2 WHERE customer_id = $1 AND lifted_at IS NULL \
         AND (expires_at IS NULL OR expires_at > NOW())",
    )
    .bind(customer_id)
    .bind(staff_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 { return Err(RepositoryError::NotFound); }
    Ok(result.rows_affected())
}

pub async fn history(pool: &PgPool, customer_id: Uuid) -> Result<Vec<Ban>> {
    let rows = sqlx::query_as::<_, Ban>("SELECT * FROM ban_history WHERE customer_id = $1 ORDER BY banned_at DESC")
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ban(expires_in: Option<i64>, lifted: bool) -> Ban {
        let now = Utc::now();
        Ban {
            id: Uuid::now_v7(), customer_id: Uuid::now_v7(), reason: "chargeback".into(), banned_by: Uuid::now_v7(),
            banned_at: now, expires_at: expires_in.map(|d| now + Duration::days(d)),
            lifted_at: lifted.then_some(now), lifted_by: None,
        }
    }

    #[test]
    fn test_ban_activity() {
        let now = Utc::now();
        assert!(ban(None, false).is_active_at(now));
        assert!(ban(Some(7), false).is_active_at(now));
        assert!(!ban(Some(-1), false).is_active_at(now));
        assert!(!ban(None, true).is_active_at(now));
    }
}
