//! Customer delivery addresses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Customer;
use crate::db::{self, addresses::Address, addresses::AddressInput};
use crate::error::Result;
use crate::AppState;

pub async fn list(State(state): State<AppState>, customer: Customer) -> Result<Json<Vec<Address>>> {
    Ok(Json(db::addresses::list(&state.db, customer.0.id).await?))
}

pub async fn create(State(state): State<AppState>, customer: Customer, Json(input): Json<AddressInput>) -> Result<(StatusCode, Json<Address>)> {
    input.validate()?;
    let address = db::addresses::create(&state.db, customer.0.id, &input).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update(
    State(state): State<AppState>,
    customer: Customer,
    Path(id): Path<Uuid>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    input.validate()?;
    Ok(Json(db::addresses::update(&state.db, id, customer.0.id, &input).await?))
}

pub async fn delete(State(state): State<AppState>, customer: Customer, Path(id): Path<Uuid>) -> Result<StatusCode> {
    db::addresses::delete(&state.db, id, customer.0.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_default(State(state): State<AppState>, customer: Customer, Path(id): Path<Uuid>) -> Result<Json<Address>> {
    Ok(Json(db::addresses::set_default(&state.db, id, customer.0.id).await?))
}
