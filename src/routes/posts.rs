use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::instrument;

use crate::db::{self, posts::Post};
use crate::error::Result;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::AppState;

pub async fn list(State(state): State<AppState>, Query(params): Query<ListParams>) -> Result<Json<PaginatedResponse<Post>>> {
    let (posts, total) = db::posts::list_published(&state.db, &params).await?;
    Ok(Json(PaginatedResponse::new(posts, total, &params)))
}

#[instrument(skip(state))]
pub async fn get(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Post>> {
    Ok(Json(db::posts::get_published(&state.db, &slug).await?))
}
