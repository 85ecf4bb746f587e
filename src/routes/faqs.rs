use axum::extract::State;
use axum::Json;

use crate::db::{self, faqs::Faq};
use crate::error::Result;
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Faq>>> {
    Ok(Json(db::faqs::list_published(&state.db).await?))
}
