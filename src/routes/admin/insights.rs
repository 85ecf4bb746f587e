//! Sales insights: figures computed here, narrative from the text model.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::auth::Staff;
use crate::db;
use crate::domain::insights::OrderStats;
use crate::error::{AppError, Result};
use crate::services::ai::{ChatMessage, ChatRole, INSIGHTS_SYSTEM_PROMPT};
use crate::AppState;

const DEFAULT_DAYS: u32 = 30;
const MAX_DAYS: u32 = 365;

#[derive(Debug, Deserialize)]
pub struct InsightsQuery { pub days: Option<u32> }

#[derive(Debug, Serialize)]
pub struct Insights {
    pub days: u32,
    pub stats: OrderStats,
    pub summary: Option<String>,
}

/// Without a text model, or when it fails, the figures are still returned
/// with `summary: null`.
#[instrument(skip(state, staff), fields(staff_id = %staff.0.id))]
pub async fn insights(State(state): State<AppState>, staff: Staff, Query(q): Query<InsightsQuery>) -> Result<Json<Insights>> {
    let days = q.days.unwrap_or(DEFAULT_DAYS);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!("days must be between 1 and {MAX_DAYS}")));
    }
    let since = Utc::now() - Duration::days(i64::from(days));
    let (orders, lines) = db::orders::placed_since(&state.db, since).await?;
    let stats = OrderStats::from_orders(&orders, &lines);

    let summary = match &state.ai {
        Some(client) => {
            let digest = stats.digest(&state.config.store.currency, days);
            let prompt = [ChatMessage { role: ChatRole::User, content: digest }];
            match client.complete(INSIGHTS_SYSTEM_PROMPT, &prompt).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!(error = %e, "Insights summary unavailable");
                    None
                }
            }
        }
        None => None,
    };
    Ok(Json(Insights { days, stats, summary }))
}
