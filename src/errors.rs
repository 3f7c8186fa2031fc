use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid applicant attribute, unknown enum literal, missing loan type.
    Validation(String),
    /// Request used an HTTP method the route does not serve.
    MethodNotAllowed {
        /// Method that was attempted.
        method: String,
        /// Comma separated list for the `Allow` header.
        allowed: &'static str,
    },
    /// The language-model provider throttled us.
    RateLimited(String),
    /// Error interacting with an external API (document or report collaborator).
    ExternalApiError(String),
    /// Settings persistence failure.
    DatabaseError(sqlx::Error),
    /// Resource not found error.
    NotFound(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Walks through `WithContext` wrappers to the error that decides the status code.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self.root() {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExternalApiError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalError(_)
            | AppError::WithContext { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::MethodNotAllowed { method, .. } => {
                write!(f, "Method {} not allowed", method)
            }
            AppError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and a `{"error": ...}` body.
    ///
    /// Upstream and internal failures are logged here and answered with a generic
    /// message so provider payloads never leak to the client.
    fn into_response(self) -> Response {
        if let AppError::WithContext { source, context } = &self {
            tracing::error!("Error with context: {} -> {}", context, source);
        }

        let status = self.status();
        let (error_message, allow) = match self.root() {
            AppError::Validation(msg) => (msg.clone(), None),
            AppError::MethodNotAllowed { method, allowed } => {
                (format!("Method {} not allowed", method), Some(*allowed))
            }
            AppError::RateLimited(msg) => {
                tracing::warn!("Upstream rate limit: {}", msg);
                (
                    "Rate limit exceeded. Please try again later.".to_string(),
                    None,
                )
            }
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                ("External service error".to_string(), None)
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::NotFound(msg) => (msg.clone(), None),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
            AppError::WithContext { .. } => ("Internal server error".to_string(), None),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        match allow {
            Some(allowed) => (status, [(header::ALLOW, allowed)], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::ExternalApiError(format!("request timed out: {}", err))
        } else {
            AppError::ExternalApiError(err.to_string())
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}
