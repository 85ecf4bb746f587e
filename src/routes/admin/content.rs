//! FAQ and blog post management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Staff;
use crate::db::{self, faqs::Faq, faqs::FaqInput, posts::Post, posts::PostInput};
use crate::error::Result;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::AppState;

pub async fn list_faqs(State(state): State<AppState>, _staff: Staff) -> Result<Json<Vec<Faq>>> {
    Ok(Json(db::faqs::list_all(&state.db).await?))
}

pub async fn create_faq(State(state): State<AppState>, _staff: Staff, Json(input): Json<FaqInput>) -> Result<(StatusCode, Json<Faq>)> {
    input.validate()?;
    Ok((StatusCode::CREATED, Json(db::faqs::create(&state.db, &input).await?)))
}

pub async fn update_faq(State(state): State<AppState>, _staff: Staff, Path(id): Path<Uuid>, Json(input): Json<FaqInput>) -> Result<Json<Faq>> {
    input.validate()?;
    Ok(Json(db::faqs::update(&state.db, id, &input).await?))
}

pub async fn delete_faq(State(state): State<AppState>, _staff: Staff, Path(id): Path<Uuid>) -> Result<StatusCode> {
    db::faqs::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_posts(State(state): State<AppState>, _staff: Staff, Query(params): Query<ListParams>) -> Result<Json<PaginatedResponse<Post>>> {
    let (posts, total) = db::posts::list_all(&state.db, &params).await?;
    Ok(Json(PaginatedResponse::new(posts, total, &params)))
}

#[instrument(skip(state, staff, input), fields(staff_id = %staff.0.id))]
pub async fn create_post(State(state): State<AppState>, staff: Staff, Json(input): Json<PostInput>) -> Result<(StatusCode, Json<Post>)> {
    input.validate()?;
    let post = db::posts::create(&state.db, staff.0.id, &input).await?;
    tracing::info!(post_id = %post.id, slug = %post.slug, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(State(state): State<AppState>, _staff: Staff, Path(id): Path<Uuid>, Json(input): Json<PostInput>) -> Result<Json<Post>> {
    input.validate()?;
    Ok(Json(db::posts::update(&state.db, id, &input).await?))
}

pub async fn delete_post(State(state): State<AppState>, _staff: Staff, Path(id): Path<Uuid>) -> Result<StatusCode> {
    db::posts::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
