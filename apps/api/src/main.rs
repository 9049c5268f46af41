use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waypoint::config::Config;
use waypoint::interactions::JobInteractions;
use waypoint::llm_client::{self, AnthropicProvider};
use waypoint::routes::build_router;
use waypoint::state::AppState;
use waypoint::store::live::LiveStore;
use waypoint::store::postgres::PgStore;

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

    info!("Starting Waypoint API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the record store
    let pg = PgStore::connect(&config.database_url).await?;
    pg.migrate().await?;
    let store = Arc::new(LiveStore::new(Arc::new(pg)));
    info!("Record store ready");

    let interactions = JobInteractions::new(store.clone());

    // Initialize the completion provider
    if !config.api_key_configured() {
        warn!("ANTHROPIC_API_KEY is not set; assistant endpoints will fail upstream");
    }
    let provider = Arc::new(AnthropicProvider::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build app state
    let state = AppState {
        store,
        interactions,
        provider,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
