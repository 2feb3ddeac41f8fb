mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod models;
mod provider_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::TokenVerifier;
use crate::cache::service::{CacheSettings, DetailsService};
use crate::cache::store::PgDetailStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::provider_client::HttpProviderClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting candidate cache v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgDetailStore::new(db));

    // Initialize provider client
    let provider = HttpProviderClient::new(
        &config.provider_base_url,
        config.provider_api_key.clone(),
        config.provider_timeout,
    )?;
    info!(
        "Provider client initialized (endpoint: {}, timeout: {:?})",
        provider.endpoint(),
        config.provider_timeout
    );

    let settings = CacheSettings::from_config(&config)?;
    info!(
        "Cache expiry window: {}s, max batch size: {}",
        settings.expiry_window.num_seconds(),
        config.max_batch_size
    );

    // Build app state
    let state = AppState {
        tokens: TokenVerifier::new(&config.jwt_secret, config.jwt_audience.as_deref()),
        details: DetailsService::new(store, Arc::new(provider), settings),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
