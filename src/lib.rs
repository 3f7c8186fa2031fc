//! Loan Scoring API Library
//!
//! Intake and scoring service for cash and pay-as-you-go loan applications:
//! deterministic credit scoring, narrative reports with per-session
//! conversational context, document field extraction and engine settings.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Scoring engine, context store and report generation.
//! - `integrations`: External service clients.
//! - `circuit_breaker`: Circuit breaker for language-model calls.
//! - `config`: Configuration management.
//! - `context_store`: Bounded per-session conversation history.
//! - `db`: Database connection and schema bootstrap.
//! - `document_analysis`: Document field extraction.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `llm_client`: Chat completion client.
//! - `models`: Applicant attributes and request/response types.
//! - `report`: Report prompt composition and generation.
//! - `routes`: Router assembly and middleware.
//! - `scoring`: Preliminary/final scoring and risk categories.
//! - `settings`: Engine weight settings persistence.
//! - `validation`: Request boundary validation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod circuit_breaker;
pub mod config;
pub mod context_store;
pub mod db;
pub mod document_analysis;
pub mod errors;
pub mod handlers;
pub mod llm_client;
pub mod models;
pub mod report;
pub mod routes;
pub mod scoring;
pub mod settings;
pub mod validation;
