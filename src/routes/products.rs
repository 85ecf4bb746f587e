//! Public catalog: browse, compare, recommend.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::Product;
use crate::domain::catalog::{self, Comparison, ProductQuery};
use crate::error::{AppError, Result};
use crate::pagination::PaginatedResponse;
use crate::AppState;

#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>, Query(query): Query<ProductQuery>) -> Result<Json<PaginatedResponse<Product>>> {
    let products = db::products::list_active(&state.db).await?;
    Ok(Json(query.apply(products)))
}

/// Active products only; drafts and archived products are not public.
#[instrument(skip(state))]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    let product = db::products::get(&state.db, id).await?;
    if !product.is_active() {
        return Err(AppError::NotFound("product".into()));
    }
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams { pub limit: Option<usize> }

#[instrument(skip(state))]
pub async fn recommendations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<Vec<Product>>> {
    let catalog = db::products::list_active(&state.db).await?;
    let target = catalog.iter().find(|p| p.id == id).ok_or_else(|| AppError::NotFound("product".into()))?;
    let picks = catalog::recommend(target, &catalog, params.limit).into_iter().cloned().collect();
    Ok(Json(picks))
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest { pub product_ids: Vec<Uuid> }

#[instrument(skip(state, req), fields(count = req.product_ids.len()))]
pub async fn compare(State(state): State<AppState>, Json(req): Json<CompareRequest>) -> Result<Json<Comparison>> {
    catalog::validate_compare_ids(&req.product_ids)?;
    let products = db::products::list_active(&state.db).await?;
    Ok(Json(catalog::compare(&req.product_ids, &products)?))
}
