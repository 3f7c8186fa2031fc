//! Field extraction from uploaded loan documents via the language model.

use crate::context_store::ChatMessage;
use crate::errors::AppError;
use crate::llm_client::{parse_structured_reply, ChatCompletionClient};
use crate::models::DocumentAnalysis;

/// Characters of document text sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 4000;

/// Cuts `content` to [`MAX_DOCUMENT_CHARS`] characters, marking the cut.
pub fn truncate_document(content: &str) -> String {
    match content.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((byte_idx, _)) => format!("{}...(truncated)", &content[..byte_idx]),
        None => content.to_string(),
    }
}

fn summary_messages(document: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a helpful assistant that analyzes documents. Extract the user's name and date of birth or any related fields if present.",
        ),
        ChatMessage::user(format!(
            "Please analyze the following document for a loan application. Provide a brief summary of key points, any red flags, and extract the client name and date of birth if present. Format your response as JSON with keys: analysis, clientName, and dob.\n\n{}",
            document
        )),
    ]
}

fn detailed_messages(document: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are an AI assistant specialized in analyzing loan application documents. Your task is to extract all relevant user information and provide a comprehensive analysis.",
        ),
        ChatMessage::user(format!(
            r#"Please analyze the following document for a loan application. Extract ALL relevant user information you can find, including full name, date of birth, contact details, address, employment information, income, existing debts and assets. Also provide a brief summary of key points and any potential red flags.

Format your response as JSON with the following structure:
{{
  "analysis": "Brief summary and any red flags",
  "userInfo": {{
    "fullName": "",
    "dateOfBirth": "",
    "contactNumber": "",
    "emailAddress": "",
    "homeAddress": "",
    "employmentStatus": "",
    "employer": "",
    "monthlyIncome": "",
    "existingDebts": "",
    "assets": ""
  }},
  "additionalInfo": {{}}
}}

Here's the document content:

{}"#,
            document
        )),
    ]
}

/// Turns uploaded documents into [`DocumentAnalysis`] records.
#[derive(Clone)]
pub struct DocumentAnalyzer {
    client: ChatCompletionClient,
    max_tokens: u32,
}

impl DocumentAnalyzer {
    pub fn new(client: ChatCompletionClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    /// Brief analysis of one document: summary, client name and date of birth.
    ///
    /// A reply that is not JSON is returned as the `analysis` text.
    pub async fn analyze(&self, file_name: &str, bytes: &[u8]) -> Result<DocumentAnalysis, AppError> {
        let text = String::from_utf8_lossy(bytes);
        let document = truncate_document(&text);
        tracing::info!(
            "Analyzing document '{}' ({} bytes, {} chars sent)",
            file_name,
            bytes.len(),
            document.chars().count()
        );

        let raw = self
            .client
            .complete(&summary_messages(&document), self.max_tokens)
            .await?;

        Ok(parse_structured_reply(&raw).unwrap_or_else(|| DocumentAnalysis::from_raw(&raw)))
    }

    /// Detailed analysis of several documents, returned in upload order.
    ///
    /// Documents are analysed concurrently; the first failure fails the batch.
    pub async fn analyze_batch(
        &self,
        documents: &[(String, Vec<u8>)],
    ) -> Result<Vec<DocumentAnalysis>, AppError> {
        tracing::info!("Analyzing batch of {} document(s)", documents.len());

        let requests = documents.iter().map(|(file_name, bytes)| async move {
            let text = String::from_utf8_lossy(bytes);
            let document = truncate_document(&text);
            tracing::debug!("Batch document '{}' queued", file_name);

            let raw = self
                .client
                .complete(&detailed_messages(&document), self.max_tokens)
                .await?;
            Ok::<_, AppError>(
                parse_structured_reply(&raw).unwrap_or_else(|| DocumentAnalysis::from_raw(&raw)),
            )
        });

        futures::future::try_join_all(requests).await
    }
}
