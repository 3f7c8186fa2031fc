use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

/// Maximum accepted request body, documents included.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Deterministic scoring
        .route(
            "/api/preliminary-score",
            post(handlers::preliminary_score).fallback(handlers::post_only),
        )
        .route(
            "/api/final-score",
            post(handlers::final_score_handler).fallback(handlers::post_only),
        )
        // Narrative reports
        .route(
            "/api/cash-loan",
            post(handlers::cash_loan_report).fallback(handlers::post_only),
        )
        .route(
            "/api/payg-loan",
            post(handlers::payg_loan_report).fallback(handlers::post_only),
        )
        .route(
            "/api/report",
            post(handlers::typed_report).fallback(handlers::post_only),
        )
        // Document analysis
        .route(
            "/api/analyze-document",
            post(handlers::analyze_document).fallback(handlers::post_only),
        )
        .route(
            "/api/analyse-documents",
            post(handlers::analyse_documents).fallback(handlers::post_only),
        )
        // Engine settings
        .route(
            "/api/save-settings",
            post(handlers::save_settings).fallback(handlers::post_only),
        )
        .route(
            "/api/settings",
            get(handlers::get_settings).fallback(handlers::get_only),
        )
}

/// Builds the application router.
///
/// With `rate_limited` the API routes get a per-IP limit of 10 req/s (burst 20);
/// `/health` is never limited. The limiter keys on the client address, so the
/// server must be run with connect info.
pub fn build_router(state: Arc<AppState>, rate_limited: bool) -> anyhow::Result<Router> {
    let mut api = api_routes()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    if rate_limited {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                // one token every 100 ms
                .per_millisecond(100)
                .burst_size(20)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
        );
        api = api.layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }));
    }

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
