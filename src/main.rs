//! Readymix Storefront - JSON API for a ready-mix concrete store

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use readymix_storefront::config::AppConfig;
use readymix_storefront::services::events::EventPublisher;
use readymix_storefront::{db, router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "readymix_storefront=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await.context("connecting to database")?;
    sqlx::migrate!("./migrations").run(&pool).await.context("running migrations")?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will not be published");
                None
            }
        },
        None => None,
    };

    let addr = config.socket_addr();
    let state = AppState::new(pool, config, EventPublisher::new(nats))?;
    tracing::info!(
        payments = state.payments.is_some(),
        ai = state.ai.is_some(),
        vision = state.vision.is_some(),
        events = state.events.is_enabled(),
        "Providers configured"
    );
    let app = router(state);

    tracing::info!("Readymix storefront listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
