//! Readymix Storefront
//!
//! JSON API behind a ready-mix concrete storefront.
//!
//! ## Features
//! - Product catalog with per-delivery-method pricing (normal, pump, tremie)
//! - Product comparison and recommendations
//! - Cart and checkout with discount, flat delivery fee and tax
//! - Webhook-driven order payment status
//! - Back office for orders, products, FAQs, enquiries and posts
//! - Storefront chat assistant and sales insights
//! - Image labeling for product tags
//! - Customer notifications and account suspensions

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod pagination;
pub mod routes;
pub mod services;

use auth::TokenVerifier;
use config::AppConfig;
use error::AppError;
use services::ai::AiClient;
use services::events::EventPublisher;
use services::payments::PaymentClient;
use services::vision::VisionClient;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenVerifier,
    pub events: EventPublisher,
    pub payments: Option<PaymentClient>,
    pub ai: Option<AiClient>,
    pub vision: Option<VisionClient>,
}

impl AppState {
    /// Builds provider clients for whatever the configuration enables.
    pub fn new(db: PgPool, config: AppConfig, events: EventPublisher) -> Result<Self, AppError> {
        let payments = config.payments.as_ref().map(PaymentClient::new).transpose()?;
        let ai = config.ai.as_ref().map(AiClient::new).transpose()?;
        let vision = config.vision.as_ref().map(VisionClient::new).transpose()?;
        Ok(Self { db, tokens: TokenVerifier::new(&config.jwt_secret), config: Arc::new(config), events, payments, ai, vision })
    }

    pub fn payments(&self) -> Result<&PaymentClient, AppError> { self.payments.as_ref().ok_or(AppError::NotConfigured("Payments")) }
    pub fn ai(&self) -> Result<&AiClient, AppError> { self.ai.as_ref().ok_or(AppError::NotConfigured("AI assistant")) }
    pub fn vision(&self) -> Result<&VisionClient, AppError> { self.vision.as_ref().ok_or(AppError::NotConfigured("Image labeling")) }
}

/// The complete HTTP application.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_router())
        .nest("/api/v1", routes::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
