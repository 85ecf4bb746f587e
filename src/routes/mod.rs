//! HTTP routes.
//!
//! Everything lives under `/api/v1`; staff endpoints are nested under
//! `/api/v1/admin` and take the [`Staff`](crate::auth::Staff) extractor.

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;

use crate::AppState;

mod addresses;
mod admin;
mod cart;
mod chat;
mod checkout;
mod enquiries;
mod faqs;
mod notifications;
mod orders;
mod posts;
mod products;
mod webhooks;

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "readymix-storefront" }))
}

pub fn health_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // catalog
        .route("/products", get(products::list))
        .route("/products/compare", post(products::compare))
        .route("/products/:id", get(products::get))
        .route("/products/:id/recommendations", get(products::recommendations))
        // content
        .route("/faqs", get(faqs::list))
        .route("/posts", get(posts::list))
        .route("/posts/:slug", get(posts::get))
        .route("/enquiries", post(enquiries::create))
        .route("/chat", post(chat::chat))
        // customer
        .route("/cart", get(cart::get).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:id", put(cart::update_item).delete(cart::remove_item))
        .route("/checkout/quote", get(checkout::quote))
        .route("/checkout", post(checkout::checkout))
        .route("/orders", get(orders::list))
        .route("/orders/:id", get(orders::get))
        .route("/orders/:id/cancel", post(orders::cancel))
        .route("/addresses", get(addresses::list).post(addresses::create))
        .route("/addresses/:id", put(addresses::update).delete(addresses::delete))
        .route("/addresses/:id/default", post(addresses::set_default))
        .route("/notifications", get(notifications::list))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/webhooks/payments", post(webhooks::payments))
        .nest("/admin", admin_router())
}

fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::orders::list))
        .route("/orders/:id", get(admin::orders::get))
        .route("/orders/:id/status", put(admin::orders::update_status))
        .route("/products", get(admin::products::list).post(admin::products::create))
        .route("/products/:id", put(admin::products::update))
        .route("/products/:id/status", put(admin::products::set_status))
        .route("/products/:id/labels", post(admin::products::label_image))
        .route("/faqs", get(admin::content::list_faqs).post(admin::content::create_faq))
        .route("/faqs/:id", put(admin::content::update_faq).delete(admin::content::delete_faq))
        .route("/posts", get(admin::content::list_posts).post(admin::content::create_post))
        .route("/posts/:id", put(admin::content::update_post).delete(admin::content::delete_post))
        .route("/enquiries", get(admin::enquiries::list))
        .route("/enquiries/:id/respond", post(admin::enquiries::respond))
        .route("/notifications", post(admin::customers::notify))
        .route("/customers/:id/ban", post(admin::customers::ban).delete(admin::customers::lift_ban))
        .route("/customers/:id/bans", get(admin::customers::ban_history))
        .route("/insights", get(admin::insights::insights))
}
