//! Contact / quotation form.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::instrument;
use validator::Validate;

use crate::auth::MaybeUser;
use crate::db::{self, enquiries::Enquiry, enquiries::NewEnquiry};
use crate::domain::events::DomainEvent;
use crate::error::Result;
use crate::AppState;

/// Anyone may submit; signed-in customers get the reply in their inbox too.
#[instrument(skip(state, user, input), fields(subject = %input.subject))]
pub async fn create(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(input): Json<NewEnquiry>,
) -> Result<(StatusCode, Json<Enquiry>)> {
    input.validate()?;
    if let Some(product_id) = input.product_id {
        db::products::get(&state.db, product_id).await?;
    }
    let enquiry = db::enquiries::create(&state.db, user.map(|u| u.id), &input).await?;
    tracing::info!(enquiry_id = %enquiry.id, "Enquiry received");
    state.events.publish(&DomainEvent::EnquiryReceived { enquiry_id: enquiry.id, subject: enquiry.subject.clone() }).await;
    Ok((StatusCode::CREATED, Json(enquiry)))
}
