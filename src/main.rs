use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use gearbot::config::AppConfig;
use gearbot::db;
use gearbot::handlers;
use gearbot::services::ai::intent::IntentVocabulary;
use gearbot::services::ai::openai::OpenAiProvider;
use gearbot::services::ai::LlmProvider;
use gearbot::services::catalog::Catalog;
use gearbot::services::messaging::telegram::TelegramProvider;
use gearbot::services::sessions::SessionStore;
use gearbot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        !config.bot_token.is_empty(),
        "TELEGRAM_BOT_TOKEN must be set"
    );
    if config.admin_chat_id == 0 {
        tracing::warn!("ADMIN_CHAT_ID not set, operator surface and notifications disabled");
    }

    let conn = db::init_db(&config.database_url)?;

    let catalog = Catalog::load(&config.catalog_path);
    if catalog.is_empty() {
        tracing::warn!(path = %config.catalog_path, "catalog is empty, browsing disabled");
    }

    let llm: Option<Box<dyn LlmProvider>> = if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY not set, AI assistant disabled");
        None
    } else {
        tracing::info!("using chat-completions provider (model: {})", config.openai_model);
        Some(Box::new(OpenAiProvider::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        )))
    };

    let telegram = TelegramProvider::new(config.bot_token.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        catalog,
        sessions: SessionStore::new(),
        vocab: IntentVocabulary::from_env(),
        llm,
        telegram: Box::new(telegram),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/telegram", post(handlers::webhook::telegram_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
