//! Customer moderation: direct notifications and suspensions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Staff;
use crate::db::{self, bans::Ban, notifications::Notification};
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct NewNotification {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
    #[validate(length(max = 500))]
    pub link: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BanRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[instrument(skip(state, staff, req), fields(staff_id = %staff.0.id, customer_id = %req.customer_id))]
pub async fn notify(State(state): State<AppState>, staff: Staff, Json(req): Json<NewNotification>) -> Result<(StatusCode, Json<Notification>)> {
    req.validate()?;
    let n = db::notifications::create(&state.db, req.customer_id, &req.title, &req.body, req.link.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(n)))
}

/// A customer can hold one active ban at a time.
#[instrument(skip(state, staff, req), fields(staff_id = %staff.0.id))]
pub async fn ban(State(state): State<AppState>, staff: Staff, Path(customer_id): Path<Uuid>, Json(req): Json<BanRequest>) -> Result<(StatusCode, Json<Ban>)> {
    req.validate()?;
    if req.expires_at.is_some_and(|until| until <= Utc::now()) {
        return Err(AppError::BadRequest("expires_at must be in the future".into()));
    }
    if customer_id == staff.0.id {
        return Err(AppError::BadRequest("staff cannot ban themselves".into()));
    }
    if db::bans::active(&state.db, customer_id).await?.is_some() {
        return Err(AppError::Conflict("customer is already banned".into()));
    }
    let ban = db::bans::ban(&state.db, customer_id, staff.0.id, req.reason.trim(), req.expires_at).await?;
    tracing::info!(%customer_id, ban_id = %ban.id, expires_at = ?ban.expires_at, "Customer banned");
    Ok((StatusCode::CREATED, Json(ban)))
}

#[instrument(skip(state, staff), fields(staff_id = %staff.0.id))]
pub async fn lift_ban(State(state): State<AppState>, staff: Staff, Path(customer_id): Path<Uuid>) -> Result<Json<serde_json::Value>> {
    let lifted = db::bans::lift(&state.db, customer_id, staff.0.id).await?;
    tracing::info!(%customer_id, lifted, "Customer ban lifted");
    Ok(Json(json!({ "lifted": lifted })))
}

pub async fn ban_history(State(state): State<AppState>, _staff: Staff, Path(customer_id): Path<Uuid>) -> Result<Json<Vec<Ban>>> {
    Ok(Json(db::bans::history(&state.db, customer_id).await?))
}
