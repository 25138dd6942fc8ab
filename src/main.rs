use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use drc_core::CoreConfig;
use drc_gemini::GeminiClient;
use drc_history::{History, JsonFileHistoryStore};

/// Main entry point for the DRC analyser
///
/// Resolves configuration once, loads the analysis history and serves the REST API
/// (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `DRC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DRC_HISTORY_FILE`: history file (default: "drc_exam_history.json")
/// - `API_KEY`: Gemini API key; analysis and extraction fail without it
/// - `GEMINI_MODEL`: model name (default: "gemini-3-flash-preview")
/// - `GEMINI_BASE_URL`: API base URL (default: "https://generativelanguage.googleapis.com/v1beta")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the history file cannot be read, or
/// - the server address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drc=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_values(
        std::env::var("DRC_HISTORY_FILE").ok(),
        std::env::var("GEMINI_MODEL").ok(),
        std::env::var("GEMINI_BASE_URL").ok(),
        std::env::var("API_KEY").ok(),
    )?;
    if cfg.api_key().is_none() {
        tracing::warn!("API_KEY not set; analysis requests will fail");
    }

    let rest_addr = std::env::var("DRC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("++ Starting DRC REST on {}", rest_addr);
    tracing::info!("history file: {}", cfg.history_file().display());

    let history = History::load(JsonFileHistoryStore::new(cfg.history_file()))?;
    let gemini = Arc::new(GeminiClient::new(&cfg));
    let state = AppState::new(history, gemini.clone(), gemini);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(state)).await?;

    Ok(())
}
