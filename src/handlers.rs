use crate::config::Config;
use crate::document_analysis::DocumentAnalyzer;
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::report::ReportGenerator;
use crate::scoring::{final_score, ScoringStrategy};
use crate::settings::{EngineSettings, SettingsStore, StoredSettings};
use crate::validation::{
    parse_application, parse_payload, resolve_context_id, validate_scoring_inputs,
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{Method, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Report generation, including the conversational context store.
    pub reports: ReportGenerator,
    /// Document field extraction.
    pub documents: DocumentAnalyzer,
    /// Persisted engine weights (never read by scoring).
    pub settings: Arc<dyn SettingsStore>,
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "loan-scoring-api",
            "version": env!("CARGO_PKG_VERSION"),
            "sessions": state.reports.store().session_count().await,
        })),
    )
}

/// Fallback for any method a route does not serve.
pub async fn post_only(method: Method) -> AppError {
    AppError::MethodNotAllowed {
        method: method.to_string(),
        allowed: "POST",
    }
}

/// Fallback for read-only routes.
pub async fn get_only(method: Method) -> AppError {
    AppError::MethodNotAllowed {
        method: method.to_string(),
        allowed: "GET",
    }
}

/// POST /api/preliminary-score
///
/// Scores raw applicant attributes with the requested strategy (flat point
/// ladder by default). A risk category is only returned for percent-scale scores.
///
/// # Arguments
///
/// * `body` - JSON `ScoringInputs` plus an optional `strategy`.
///
/// # Returns
///
/// * `Result<Json<PreliminaryScoreResponse>, AppError>` - The score or a validation error.
pub async fn preliminary_score(body: Bytes) -> Result<Json<PreliminaryScoreResponse>, AppError> {
    let request: PreliminaryScoreRequest = parse_payload(&body, "Scoring inputs")?;
    validate_scoring_inputs(&request.inputs)?;

    let strategy = request.strategy.unwrap_or(ScoringStrategy::FlatPointLadder);
    let score = strategy.score(&request.inputs);
    let risk_category = score.risk_category();

    tracing::info!(
        "Preliminary score {:.2} ({:?}) via {:?}",
        score.value,
        score.scale,
        strategy
    );
    if risk_category.is_none() {
        tracing::debug!("Score is not on the percent scale, risk category omitted");
    }

    Ok(Json(PreliminaryScoreResponse {
        preliminary_score: score.value,
        scale: score.scale,
        strategy,
        risk_category,
    }))
}

/// Computes a final score response. Shared with the offline scorer.
pub fn score_final(request: &FinalScoreRequest) -> FinalScoreResponse {
    let strategy = request
        .strategy
        .unwrap_or(ScoringStrategy::WeightedRatioLadder);
    let preliminary = strategy.score(&request.inputs);
    let result = final_score(&preliminary, &request.adjustments);

    FinalScoreResponse {
        final_score: result.value,
        risk_category: crate::scoring::risk_category(result.value),
        preliminary,
        strategy,
    }
}

/// POST /api/final-score
///
/// Recomputes the preliminary score (weighted ladder by default), applies the
/// secondary risk factors and categorizes the clamped result.
///
/// # Returns
///
/// * `Result<Json<FinalScoreResponse>, AppError>` - The final score or a validation error.
pub async fn final_score_handler(body: Bytes) -> Result<Json<FinalScoreResponse>, AppError> {
    let request: FinalScoreRequest = parse_payload(&body, "Scoring inputs")?;
    validate_scoring_inputs(&request.inputs)?;

    let response = score_final(&request);
    tracing::info!(
        "Final score {:.2} -> {}",
        response.final_score,
        response.risk_category
    );

    Ok(Json(response))
}

async fn generate_report(
    state: &AppState,
    loan_type: LoanType,
    details: serde_json::Value,
    context_id: Option<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let application = parse_application(loan_type, details)?;
    let context_id = resolve_context_id(context_id)?;

    tracing::info!(
        "{} report requested for session {}",
        loan_type.display_name(),
        context_id
    );

    let report = state
        .reports
        .generate(&application, &context_id)
        .await
        .with_context(|| format!("Failed to generate {} report", loan_type.display_name()))?;

    Ok(Json(ReportResponse { report, context_id }))
}

/// POST /api/cash-loan
///
/// Generates a narrative due-diligence report for a cash loan application,
/// continuing the conversation identified by `contextId`.
pub async fn cash_loan_report(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ReportResponse>, AppError> {
    let request: LoanReportRequest = parse_payload(&body, "Loan details")?;
    generate_report(&state, LoanType::Cash, request.loan_details, request.context_id).await
}

/// POST /api/payg-loan
///
/// Same as [`cash_loan_report`] for pay-as-you-go product loans.
pub async fn payg_loan_report(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ReportResponse>, AppError> {
    let request: LoanReportRequest = parse_payload(&body, "Loan details")?;
    generate_report(&state, LoanType::Payg, request.loan_details, request.context_id).await
}

/// POST /api/report
///
/// Loan-type agnostic report endpoint; `loanType` must be `cash` or `payg`.
pub async fn typed_report(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ReportResponse>, AppError> {
    let request: TypedReportRequest = parse_payload(&body, "Loan details")?;
    let loan_type = request
        .loan_type
        .ok_or_else(|| AppError::Validation("loanType is required".to_string()))?;
    generate_report(&state, loan_type, request.loan_details, request.context_id).await
}

/// Reads uploaded files from a multipart body, optionally only from `only_field`.
async fn collect_files(
    mut multipart: Multipart,
    only_field: Option<&str>,
) -> Result<Vec<(String, Vec<u8>)>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        if only_field.is_some_and(|wanted| wanted != field_name) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
        tracing::debug!(
            "Received upload '{}' in field '{}' ({} bytes)",
            file_name,
            field_name,
            bytes.len()
        );
        files.push((file_name, bytes.to_vec()));
    }
    Ok(files)
}

/// POST /api/analyze-document
///
/// Brief analysis of a single uploaded document (multipart field `file`).
pub async fn analyze_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<DocumentAnalysis>, AppError> {
    let files = collect_files(multipart, Some("file")).await?;
    let (file_name, bytes) = files
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    let analysis = state
        .documents
        .analyze(&file_name, &bytes)
        .await
        .context("Error analyzing document")?;

    Ok(Json(analysis))
}

/// POST /api/analyse-documents
///
/// Detailed analysis of every uploaded file, returned in upload order.
pub async fn analyse_documents(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Vec<DocumentAnalysis>>, AppError> {
    let files = collect_files(multipart, None).await?;
    if files.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    let analyses = state
        .documents
        .analyze_batch(&files)
        .await
        .context("Error analyzing documents")?;

    Ok(Json(analyses))
}

/// POST /api/save-settings
///
/// Upserts the engine weight settings record.
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let settings: EngineSettings = parse_payload(&body, "Settings")?;
    settings.validate()?;

    state
        .settings
        .save(&settings)
        .await
        .context("Error saving settings")?;

    Ok(Json(json!({ "message": "Settings saved successfully!" })))
}

/// GET /api/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StoredSettings>, AppError> {
    state
        .settings
        .load()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No settings saved yet".to_string()))
}
