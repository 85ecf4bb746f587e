//! Customer notification inbox.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Customer;
use crate::db::{self, notifications::Notification};
use crate::error::Result;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Inbox {
    #[serde(flatten)]
    pub page: PaginatedResponse<Notification>,
    pub unread: i64,
}

/// Best effort: a failed insert is logged and the caller carries on.
pub(crate) async fn notify(state: &AppState, customer_id: Uuid, title: &str, body: &str, link: Option<String>) {
    if let Err(e) = db::notifications::create(&state.db, customer_id, title, body, link.as_deref()).await {
        tracing::warn!(error = %e, %customer_id, "Failed to store notification");
    }
}

pub async fn list(State(state): State<AppState>, customer: Customer, Query(params): Query<ListParams>) -> Result<Json<Inbox>> {
    let customer_id = customer.0.id;
    let (items, unread) = db::notifications::list(&state.db, customer_id, &params).await?;
    let total = db::notifications::count(&state.db, customer_id).await?;
    Ok(Json(Inbox { page: PaginatedResponse::new(items, total, &params), unread }))
}

pub async fn mark_read(State(state): State<AppState>, customer: Customer, Path(id): Path<Uuid>) -> Result<Json<Notification>> {
    Ok(Json(db::notifications::mark_read(&state.db, id, customer.0.id).await?))
}

pub async fn mark_all_read(State(state): State<AppState>, customer: Customer) -> Result<Json<serde_json::Value>> {
    let updated = db::notifications::mark_all_read(&state.db, customer.0.id).await?;
    Ok(Json(json!({ "updated": updated })))
}
