use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loan_scoring_api::api::handlers::AppState;
use loan_scoring_api::api::routes::build_router;
use loan_scoring_api::config::Config;
use loan_scoring_api::core::context_store::{ContextStore, InMemoryContextStore};
use loan_scoring_api::core::report::ReportGenerator;
use loan_scoring_api::db::Database;
use loan_scoring_api::integrations::document_analysis::DocumentAnalyzer;
use loan_scoring_api::integrations::llm_client::ChatCompletionClient;
use loan_scoring_api::integrations::settings::{
    InMemorySettingsStore, PostgresSettingsStore, SettingsStore,
};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Settings storage (Postgres when configured, memory otherwise).
/// - The conversational context store.
/// - The language-model client.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let settings: Arc<dyn SettingsStore> = match config.database_url {
        Some(ref url) => {
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");
            Arc::new(PostgresSettingsStore::new(db.pool))
        }
        None => Arc::new(InMemorySettingsStore::new()),
    };

    // Session context: LRU-bounded, optionally expiring idle sessions
    let context_store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::new(
        config.context_max_sessions,
        config.context_idle_ttl(),
    ));
    tracing::info!(
        "Context store initialized ({} max sessions, idle ttl: {:?})",
        config.context_max_sessions,
        config.context_idle_ttl()
    );

    let llm_client = ChatCompletionClient::from_config(&config)?;
    tracing::info!("✓ LLM client initialized: {}", config.openai_base_url);

    let app_state = Arc::new(AppState {
        reports: ReportGenerator::new(
            llm_client.clone(),
            context_store,
            config.context_max_sessions,
            config.report_max_tokens,
        ),
        documents: DocumentAnalyzer::new(llm_client, config.analysis_max_tokens),
        settings,
        config: config.clone(),
    });

    let app = build_router(app_state, true)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
