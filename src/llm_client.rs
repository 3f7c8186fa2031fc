use crate::circuit_breaker::{create_llm_circuit_breaker, UpstreamBreaker};
use crate::config::Config;
use crate::context_store::ChatMessage;
use crate::errors::AppError;
use failsafe::futures::CircuitBreaker;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completion API.
///
/// Used both for document field extraction and for narrative report generation.
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    breaker: UpstreamBreaker,
}

impl ChatCompletionClient {
    /// Creates a new `ChatCompletionClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the API, e.g. `https://api.openai.com/v1`.
    /// * `api_key` - Bearer token.
    /// * `model` - Model name sent with every request.
    /// * `timeout` - Upper bound for a single request, including the response body.
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create LLM client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            breaker: create_llm_circuit_breaker(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.llm_timeout(),
        )
    }

    /// Sends one chat completion request and returns the assistant text.
    ///
    /// # Arguments
    ///
    /// * `messages` - Ordered role/content turns.
    /// * `max_tokens` - Token budget for the reply.
    ///
    /// # Returns
    ///
    /// * `Result<String, AppError>` - `RateLimited` on HTTP 429, `ExternalApiError`
    ///   on any other failure, including an open circuit.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, AppError> {
        match self.breaker.call(self.send(messages, max_tokens)).await {
            Ok(content) => Ok(content),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("LLM circuit breaker is open, rejecting request");
                Err(AppError::ExternalApiError(
                    "Language model temporarily unavailable".to_string(),
                ))
            }
        }
    }

    async fn send(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(
            "Requesting chat completion ({} message(s), max_tokens={})",
            messages.len(),
            max_tokens
        );

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ExternalApiError(format!("LLM request timed out: {}", e))
                } else {
                    AppError::ExternalApiError(format!("LLM request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(AppError::RateLimited(format!(
                    "LLM provider returned 429: {}",
                    error_text
                )));
            }
            return Err(AppError::ExternalApiError(format!(
                "LLM provider returned {}: {}",
                status, error_text
            )));
        }

        let data: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse LLM response: {}", e))
        })?;

        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::ExternalApiError("LLM response contained no message content".to_string())
            })?;

        tracing::info!("✓ Chat completion received ({} chars)", content.len());
        Ok(content)
    }
}

/// Best-effort JSON extraction from model output.
///
/// Strips a surrounding Markdown code fence if present. Returns `None` when the
/// text is not valid JSON for `T`, leaving the fallback to the caller.
pub fn parse_structured_reply<T>(raw: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    match serde_json::from_str(unfenced) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Model reply is not structured JSON: {}", e);
            None
        }
    }
}
