use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Staff;
use crate::db;
use crate::domain::aggregates::product::DeliveryPrices;
use crate::domain::aggregates::{Product, ProductStatus};
use crate::domain::value_objects::Grade;
use crate::error::{AppError, Result};
use crate::pagination::{ListParams, PaginatedResponse};
use crate::services::vision::{self, Label};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub grade: Grade,
    pub prices: DeliveryPrices,
    /// Absolute stock level. Left out, the stored stock is kept.
    pub stock_m3: Option<Decimal>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub publish: bool,
}

impl ProductInput {
    fn check_amounts(&self) -> Result<()> {
        if self.prices.price_normal < Decimal::ZERO || self.prices.price_pump < Decimal::ZERO || self.prices.price_tremie < Decimal::ZERO {
            return Err(AppError::BadRequest("prices must not be negative".into()));
        }
        if self.stock_m3.is_some_and(|s| s < Decimal::ZERO) {
            return Err(AppError::BadRequest("stock must not be negative".into()));
        }
        Ok(())
    }

    fn apply_to(self, product: &mut Product) {
        product.name = self.name.trim().to_string();
        product.description = self.description;
        product.grade = self.grade;
        product.prices = self.prices;
        product.tags = self.tags.into_iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect();
        product.image_url = self.image_url;
    }
}

pub async fn list(State(state): State<AppState>, _staff: Staff, Query(params): Query<ListParams>) -> Result<Json<PaginatedResponse<Product>>> {
    let (products, total) = db::products::list_all(&state.db, &params).await?;
    Ok(Json(PaginatedResponse::new(products, total, &params)))
}

#[instrument(skip(state, staff, input), fields(staff_id = %staff.0.id, name = %input.name))]
pub async fn create(State(state): State<AppState>, staff: Staff, Json(input): Json<ProductInput>) -> Result<(StatusCode, Json<Product>)> {
    input.validate()?;
    input.check_amounts()?;
    let publish = input.publish;
    let mut product = Product::draft(&input.name, input.grade, input.prices.clone(), &state.config.store.currency);
    product.stock_m3 = input.stock_m3.unwrap_or_default();
    input.apply_to(&mut product);
    if publish {
        product.publish()?;
    }
    let product = db::products::insert(&state.db, &product).await?;
    tracing::info!(product_id = %product.id, status = product.status.as_str(), "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Full replacement of the descriptive fields; an active product must stay
/// publishable. Stock is only written when `stock_m3` is given, and never
/// from the row read here, so concurrent decrements are not lost.
#[instrument(skip(state, staff, input), fields(staff_id = %staff.0.id))]
pub async fn update(State(state): State<AppState>, staff: Staff, Path(id): Path<Uuid>, Json(input): Json<ProductInput>) -> Result<Json<Product>> {
    input.validate()?;
    input.check_amounts()?;
    let mut product = db::products::get(&state.db, id).await?;
    let publish = input.publish;
    let stock = input.stock_m3;
    input.apply_to(&mut product);
    if publish || product.is_active() {
        product.publish()?;
    }

    let mut tx = state.db.begin().await.map_err(db::RepositoryError::from)?;
    let mut product = db::products::update(&mut *tx, &product).await?;
    if let Some(stock) = stock {
        product = db::products::set_stock(&mut *tx, id, stock).await?;
        tracing::info!(product_id = %id, %stock, "Stock level set");
    }
    tx.commit().await.map_err(db::RepositoryError::from)?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange { pub status: ProductStatus }

#[instrument(skip(state, staff), fields(staff_id = %staff.0.id))]
pub async fn set_status(State(state): State<AppState>, staff: Staff, Path(id): Path<Uuid>, Json(req): Json<StatusChange>) -> Result<Json<Product>> {
    let mut product = db::products::get(&state.db, id).await?;
    match req.status {
        ProductStatus::Active => product.publish()?,
        ProductStatus::Archived => product.archive(),
        ProductStatus::Draft => product.status = ProductStatus::Draft,
    }
    let product = db::products::set_status(&state.db, id, product.status).await?;
    tracing::info!(product_id = %id, status = product.status.as_str(), "Product status changed");
    Ok(Json(product))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LabelRequest {
    #[validate(url)]
    pub image_url: String,
    #[serde(default)]
    pub apply: bool,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub labels: Vec<Label>,
    pub suggested_tags: Vec<String>,
    pub product: Option<Product>,
}

/// Labels an image and suggests tags; `apply` merges them into the product.
#[instrument(skip(state, staff, req), fields(staff_id = %staff.0.id))]
pub async fn label_image(State(state): State<AppState>, staff: Staff, Path(id): Path<Uuid>, Json(req): Json<LabelRequest>) -> Result<Json<LabelResponse>> {
    req.validate()?;
    let client = state.vision()?;
    let product = db::products::get(&state.db, id).await?;

    let labels = client.label_image(&req.image_url).await?;
    let suggested_tags = vision::suggest_tags(&labels);
    let product = if req.apply {
        let tags = vision::merge_tags(&product.tags, &suggested_tags);
        Some(db::products::set_tags(&state.db, id, &tags).await?)
    } else {
        None
    };
    Ok(Json(LabelResponse { labels, suggested_tags, product }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample_product;

    fn input(body: serde_json::Value) -> ProductInput { serde_json::from_value(body).unwrap() }

    #[test]
    fn test_edit_without_stock_keeps_stock() {
        let mut product = sample_product("Ready Mix N20", "N20", 220);
        let edit = input(serde_json::json!({
            "name": "Ready Mix N20 (structural)",
            "grade": "N20",
            "prices": { "normal": "225", "pump": "255", "tremie": "270" }
        }));
        assert_eq!(edit.stock_m3, None);
        edit.check_amounts().unwrap();
        edit.apply_to(&mut product);
        assert_eq!(product.name, "Ready Mix N20 (structural)");
        assert_eq!(product.stock_m3, Decimal::new(100, 0));
    }

    #[test]
    fn test_negative_stock_rejected() {
        let edit = input(serde_json::json!({
            "name": "Ready Mix N25",
            "grade": "N25",
            "prices": { "normal": "230", "pump": "260", "tremie": "275" },
            "stock_m3": "-1"
        }));
        assert!(matches!(edit.check_amounts(), Err(AppError::BadRequest(_))));
    }
}
