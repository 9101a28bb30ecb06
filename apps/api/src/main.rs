mod assessment;
mod chat;
mod config;
mod errors;
mod gemini;
mod images;
mod models;
mod routes;
mod state;
mod submissions;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessment::sessions::SessionRegistry;
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::submissions::guard::SubmissionGuard;
use crate::submissions::store::{
    JsonFileSubmissionStore, RedisSubmissionStore, SubmissionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillArchitect API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the submission ledger: Redis when configured, local JSON file otherwise
    let store: Arc<dyn SubmissionStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.clone())?;
            info!("Submission ledger: Redis");
            Arc::new(RedisSubmissionStore::new(client))
        }
        None => {
            let store = JsonFileSubmissionStore::open(&config.submission_ledger_path).await?;
            info!(
                "Submission ledger: JSON file at {}",
                config.submission_ledger_path
            );
            Arc::new(store)
        }
    };
    let guard = Arc::new(SubmissionGuard::new(store));

    // Initialize Gemini client
    let gemini = GeminiClient::new(config.gemini_base_url.clone(), config.gemini_api_key.clone());
    info!(
        "Gemini client initialized (text: {}, image: {})",
        gemini::TEXT_MODEL,
        gemini::IMAGE_MODEL
    );

    // Build app state
    let state = AppState {
        sessions: SessionRegistry::new(),
        guard,
        ai: Arc::new(gemini.clone()),
        gemini,
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
