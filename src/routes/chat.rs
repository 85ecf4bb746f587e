//! Storefront assistant.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::db;
use crate::error::{AppError, Result};
use crate::services::ai::{self, ChatMessage, ChatRole};
use crate::AppState;

const STORE_NAME: &str = "Readymix";

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply { pub reply: String }

#[instrument(skip(state, req), fields(turns = req.messages.len()))]
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Result<Json<ChatReply>> {
    req.validate()?;
    let history = ai::recent_history(&req.messages);
    if history.last().map(|m| m.role) != Some(ChatRole::User) {
        return Err(AppError::BadRequest("last message must come from the user".into()));
    }
    let client = state.ai()?;

    let products = db::products::list_active(&state.db).await?;
    let faqs = db::faqs::list_published(&state.db).await?;
    let system = ai::chat_system_prompt(STORE_NAME, &products, &faqs);

    let reply = client.complete(&system, history).await?;
    Ok(Json(ChatReply { reply }))
}
