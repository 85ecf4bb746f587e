use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Staff;
use crate::db::{self, enquiries::Enquiry};
use crate::error::{AppError, Result};
use crate::pagination::{ListParams, PaginatedResponse};
use crate::routes::notifications::notify;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EnquiryFilter {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Reply {
    #[validate(length(min = 1, max = 5000))]
    pub response: String,
}

pub async fn list(State(state): State<AppState>, _staff: Staff, Query(filter): Query<EnquiryFilter>) -> Result<Json<PaginatedResponse<Enquiry>>> {
    let status = filter.status.as_deref().filter(|s| !s.is_empty());
    if status.is_some_and(|s| s != "open" && s != "closed") {
        return Err(AppError::BadRequest("status must be open or closed".into()));
    }
    let params = ListParams { page: filter.page, per_page: filter.per_page };
    let (enquiries, total) = db::enquiries::list(&state.db, status, &params).await?;
    Ok(Json(PaginatedResponse::new(enquiries, total, &params)))
}

/// Stores the reply and closes the enquiry; a signed-in sender also gets it
/// in their inbox.
#[instrument(skip(state, staff, req), fields(staff_id = %staff.0.id))]
pub async fn respond(State(state): State<AppState>, staff: Staff, Path(id): Path<Uuid>, Json(req): Json<Reply>) -> Result<Json<Enquiry>> {
    req.validate()?;
    db::enquiries::get(&state.db, id).await?;
    let enquiry = db::enquiries::respond(&state.db, id, staff.0.id, req.response.trim()).await?;
    if let Some(customer_id) = enquiry.customer_id {
        notify(&state, customer_id, &format!("Re: {}", enquiry.subject), &enquiry.response.clone().unwrap_or_default(), None).await;
    }
    tracing::info!(enquiry_id = %id, "Enquiry answered");
    Ok(Json(enquiry))
}
