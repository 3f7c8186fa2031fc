//! Boundary validation for request payloads.
//!
//! Everything that reaches the scoring ladders or the report generator has been
//! through here first, so those stay total.

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CashLoanDetails, LoanApplication, LoanType, PaygLoanDetails, ScoringInputs,
};

const MAX_CONTEXT_ID_LEN: usize = 128;

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Parses a JSON body into `T`, rejecting empty bodies and shape errors.
///
/// Unknown enum literals, wrong numeric types and missing required fields all
/// surface as `AppError::Validation` with serde's message.
pub fn parse_payload<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Validation(format!("{} are required", what)));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Malformed JSON body: {}", e)))?;

    parse_value(value, what)
}

/// Same as [`parse_payload`] for an already decoded JSON value.
pub fn parse_value<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, AppError> {
    if is_empty_payload(&value) {
        return Err(AppError::Validation(format!("{} are required", what)));
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::Validation(format!("Invalid {}: {}", what.to_lowercase(), e)))
}

/// Rejects negative or non-finite numeric fields.
pub fn ensure_non_negative(fields: &[(&'static str, f64)]) -> Result<(), AppError> {
    for (name, value) in fields {
        if !value.is_finite() || *value < 0.0 {
            return Err(AppError::Validation(format!(
                "{} must be a non-negative number",
                name
            )));
        }
    }
    Ok(())
}

/// Validates the inputs of the preliminary and final score endpoints.
pub fn validate_scoring_inputs(inputs: &ScoringInputs) -> Result<(), AppError> {
    if inputs.total_expenses().is_none() {
        return Err(AppError::Validation(
            "monthly_expenses or expenses is required".to_string(),
        ));
    }
    ensure_non_negative(&inputs.numeric_fields())
}

/// Parses `loanDetails` for the given loan type into a validated application.
pub fn parse_application(loan_type: LoanType, details: Value) -> Result<LoanApplication, AppError> {
    match loan_type {
        LoanType::Cash => {
            let details: CashLoanDetails = parse_value(details, "Loan details")?;
            ensure_non_negative(&details.numeric_fields())?;
            Ok(LoanApplication::Cash(details))
        }
        LoanType::Payg => {
            let details: PaygLoanDetails = parse_value(details, "Loan details")?;
            ensure_non_negative(&details.numeric_fields())?;
            Ok(LoanApplication::Payg(details))
        }
    }
}

/// Returns the client's session id, or a fresh UUID when none was sent.
pub fn resolve_context_id(context_id: Option<String>) -> Result<String, AppError> {
    match context_id {
        None => Ok(Uuid::new_v4().to_string()),
        Some(id) => {
            let id = id.trim().to_string();
            if id.is_empty() {
                return Err(AppError::Validation("contextId cannot be empty".to_string()));
            }
            if id.chars().count() > MAX_CONTEXT_ID_LEN {
                return Err(AppError::Validation(format!(
                    "contextId cannot exceed {} characters",
                    MAX_CONTEXT_ID_LEN
                )));
            }
            Ok(id)
        }
    }
}
