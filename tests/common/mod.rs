//! Shared fixtures for integration tests.
#![allow(dead_code)]

use loan_scoring_api::config::Config;
use loan_scoring_api::context_store::{ContextStore, InMemoryContextStore};
use loan_scoring_api::document_analysis::DocumentAnalyzer;
use loan_scoring_api::handlers::AppState;
use loan_scoring_api::llm_client::ChatCompletionClient;
use loan_scoring_api::report::ReportGenerator;
use loan_scoring_api::settings::InMemorySettingsStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Helper function to create test config
pub fn create_test_config(llm_base_url: String) -> Config {
    Config {
        port: 8080,
        openai_api_key: "test_key".to_string(),
        openai_base_url: llm_base_url,
        openai_model: "gpt-4-turbo".to_string(),
        llm_timeout_secs: 2,
        report_max_tokens: 1500,
        analysis_max_tokens: 500,
        context_max_sessions: 100,
        context_idle_ttl_secs: None,
        database_url: None,
    }
}

pub fn create_client(config: &Config) -> ChatCompletionClient {
    ChatCompletionClient::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )
    .unwrap()
}

pub fn create_generator(config: &Config) -> (ReportGenerator, Arc<InMemoryContextStore>) {
    let store = Arc::new(InMemoryContextStore::new(config.context_max_sessions, None));
    let dyn_store: Arc<dyn ContextStore> = store.clone();
    let generator = ReportGenerator::new(
        create_client(config),
        dyn_store,
        config.context_max_sessions,
        config.report_max_tokens,
    );
    (generator, store)
}

pub fn create_state(config: Config) -> Arc<AppState> {
    let (reports, _) = create_generator(&config);
    Arc::new(AppState {
        reports,
        documents: DocumentAnalyzer::new(create_client(&config), config.analysis_max_tokens),
        settings: Arc::new(InMemorySettingsStore::new()),
        config,
    })
}

/// Chat completion body as returned by the provider.
pub fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

pub fn cash_loan_details() -> Value {
    json!({
        "clientName": "Tariro Moyo",
        "nationalId": "63-123456-A-42",
        "dob": "1988-04-12",
        "contactNumber": "+263 77 123 4567",
        "homeAddress": "12 Samora Machel Ave, Harare",
        "loanAmount": 1500,
        "collateral": "Yes",
        "collateralValue": 4000,
        "monthlyIncome": 3000,
        "expenses": { "grocery": 300, "rent": 400, "utilities": 100, "schoolFees": 200 },
        "fcbScore": "Good",
        "runningLoans": "No",
        "repaymentHistory": "Fair",
        "yearsInBusiness": 6,
        "guarantorRelationship": "Close",
        "guarantorIncome": 1200,
        "firstTimeBorrower": false,
        "historyWithOtherMFIs": "Limited"
    })
}

pub fn payg_loan_details() -> Value {
    json!({
        "clientName": "Chipo Banda",
        "nationalId": "08-778899-C-07",
        "dob": "1995-09-30",
        "contactNumber": "+263 71 000 0000",
        "homeAddress": "Mutare",
        "loanAmount": 250,
        "monthlyIncome": 400,
        "expenses": { "grocery": 100 },
        "fcbScore": "Fair",
        "guarantorRelationship": "Distant",
        "guarantorIncome": 300,
        "firstTimeBorrower": true,
        "historyWithOtherMFIs": "None",
        "productUsageHours": 6,
        "productVerified": true,
        "subscriptionCost": 12
    })
}
