//! Unified error handling.
//!
//! Every handler returns `Result<T, AppError>`; the response body is always
//! `{"error": "..."}` so the storefront can show it as a toast.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::AuthError;
use crate::db::RepositoryError;
use crate::domain::aggregates::{CartError, OrderError, ProductError};
use crate::domain::catalog::CompareError;
use crate::services::ai::AiError;
use crate::services::payments::PaymentError;
use crate::services::vision::VisionError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Payment provider error: {0}")]
    Payment(#[from] PaymentError),

    #[error("AI provider error: {0}")]
    Ai(#[from] AiError),

    #[error("Vision provider error: {0}")]
    Vision(#[from] VisionError),

    #[error("Invalid input")]
    Validation(#[from] ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::LineNotFound => Self::NotFound(e.to_string()),
            CartError::Empty | CartError::CurrencyMismatch(_) => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidTransition { .. } => Self::Conflict(e.to_string()),
            OrderError::UnknownStatus(_) => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::InsufficientStock { .. } | ProductError::NotAvailable => Self::Conflict(e.to_string()),
            _ => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<CompareError> for AppError {
    fn from(e: CompareError) -> Self {
        match e {
            CompareError::WrongCount => Self::BadRequest(e.to_string()),
            CompareError::Missing(_) => Self::NotFound(e.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(AuthError::Forbidden | AuthError::Suspended) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Auth(AuthError::Repository(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Payment(PaymentError::InvalidSignature(_) | PaymentError::MalformedEvent(_)) => StatusCode::BAD_REQUEST,
            Self::Payment(_) | Self::Ai(_) | Self::Vision(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Database(RepositoryError::NotFound) => json!({ "error": "Not found" }),
            Self::Database(RepositoryError::Conflict(message)) => json!({ "error": message }),
            Self::Database(_) | Self::Internal(_) | Self::Auth(AuthError::Repository(_)) => json!({ "error": "Internal server error" }),
            Self::Payment(PaymentError::InvalidSignature(_)) => json!({ "error": "Invalid webhook signature" }),
            Self::Payment(PaymentError::MalformedEvent(_)) => json!({ "error": "Malformed webhook payload" }),
            Self::Payment(_) | Self::Ai(_) | Self::Vision(_) => json!({ "error": "External service error" }),
            Self::Validation(errors) => json!({ "error": "Invalid input", "fields": errors.field_errors() }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderStatus;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product".to_string());
        assert_eq!(err.to_string(), "Not found: product");
        assert_eq!(AppError::NotConfigured("Payments").to_string(), "Payments is not configured");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode { err.into_response().status() }

        assert_eq!(get_status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(get_status(RepositoryError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(get_status(RepositoryError::Conflict("stale").into()), StatusCode::CONFLICT);
        assert_eq!(get_status(AuthError::MissingToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::Suspended.into()), StatusCode::FORBIDDEN);
        assert_eq!(get_status(CartError::Empty.into()), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(AppError::NotConfigured("Payments")), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(get_status(AppError::Internal("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
        let transition = OrderError::InvalidTransition { from: OrderStatus::Delivered, to: OrderStatus::Cancelled };
        assert_eq!(get_status(transition.into()), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Internal("connection refused at 10.0.0.4".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }
}
