//! Narrative due-diligence reports.
//!
//! A report request reads the session's prior turns, sends them to the language
//! model together with the loan rules and the new applicant, and records the new
//! exchange only once the model has answered.

use moka::future::Cache;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::context_store::{ChatMessage, ContextStore};
use crate::errors::AppError;
use crate::llm_client::ChatCompletionClient;
use crate::models::{
    CashLoanDetails, CreditRating, Expenses, GuarantorRelationship, LoanApplication, LoanType,
    MfiHistory, PaygLoanDetails, YesNo,
};

const CASH_LOAN_RULES: &str = "\
1. Income-to-Expense Ratio (Affordability): 0-25 points
2. Loan Amount: Evaluated but no direct points
3. Guarantor Relationship: 0-10 points
4. Guarantor's Income and Affordability: 0-15 points
5. Collateral Value: 0-20 points
6. Repayment History: -10 to 20 points
7. FCB Credit Score: -10 to 25 points
8. Age of Borrower: -5 to 10 points
9. History with Other Microfinance Institutions: -10 to 10 points
10. First-time Borrower with Good Affordability: 0-20 points
";

const PAYG_LOAN_RULES: &str = "\
1. Monthly Income-to-Expense Ratio: 0-25 points
2. Product Dependency (Hours of Usage): 0-20 points
3. Credit History (FCB Score): -10 to 25 points
4. Product Verification: -5 to 10 points
5. Subscription-to-Usage Ratio: 0-20 points
6. Guarantor Relationship: 0-10 points
7. Guarantor's Income and Affordability: 0-15 points
8. Age of Borrower: -5 to 10 points
9. History with Other Microfinance Institutions: -10 to 10 points
10. First-time Borrower with Good Affordability: 0-20 points
";

const RISK_LEVELS: &str = "\
Risk Levels:
- 80-100: Very Low Risk (Approval recommended)
- 60-79: Low Risk (Approval recommended)
- 40-59: Moderate Risk (Discretionary approval)
- 20-39: High Risk (Approval not recommended)
- Below 20: Very High Risk (Reject application)
";

/// Scoring rules handed to the model for `loan_type`.
pub fn rules_for(loan_type: LoanType) -> String {
    let rules = match loan_type {
        LoanType::Cash => CASH_LOAN_RULES,
        LoanType::Payg => PAYG_LOAN_RULES,
    };
    format!("{}\n{}", rules, RISK_LEVELS)
}

/// System turn framing the model as a credit-scoring expert for `loan_type`.
pub fn system_prompt(loan_type: LoanType) -> ChatMessage {
    let product = match loan_type {
        LoanType::Cash => "Cash Loans",
        LoanType::Payg => "Pay-as-You-Go (PAYG) Loans",
    };
    ChatMessage::system(format!(
        "You are an expert in credit scoring for {}. The following are the credit scoring rules:\n\n{}",
        product,
        rules_for(loan_type)
    ))
}

fn yes_no(value: YesNo) -> &'static str {
    match value {
        YesNo::Yes => "Yes",
        YesNo::No => "No",
    }
}

fn rating(value: CreditRating) -> &'static str {
    match value {
        CreditRating::Good => "Good",
        CreditRating::Fair => "Fair",
        CreditRating::Adverse => "Adverse",
    }
}

fn relationship(value: GuarantorRelationship) -> &'static str {
    match value {
        GuarantorRelationship::Close => "Close",
        GuarantorRelationship::Distant => "Distant",
        GuarantorRelationship::None => "None",
    }
}

fn mfi_history(value: MfiHistory) -> &'static str {
    match value {
        MfiHistory::None => "None",
        MfiHistory::Limited => "Limited",
        MfiHistory::Frequent => "Frequent",
    }
}

fn expenses_line(expenses: &Expenses) -> String {
    format!(
        "Grocery: {}, Rent: {}, Utilities: {}, School Fees: {}",
        expenses.grocery, expenses.rent, expenses.utilities, expenses.school_fees
    )
}

fn push_line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    // writing into a String cannot fail
    let _ = writeln!(out, "- {}: {}", label, value);
}

fn push_additional(out: &mut String, extra: &BTreeMap<String, String>) {
    for (key, value) in extra {
        push_line(out, key, value);
    }
}

fn describe_cash(details: &CashLoanDetails, out: &mut String) {
    push_line(out, "Loan Amount", details.loan_amount);
    push_line(out, "Monthly Income", details.monthly_income);
    push_line(
        out,
        "Collateral",
        format!(
            "{} ({})",
            yes_no(details.collateral),
            details.collateral_value
        ),
    );
    push_line(out, "Expenses", expenses_line(&details.expenses));
    push_line(out, "Years in Business", details.years_in_business);
    push_line(out, "Credit History", rating(details.fcb_score));
    push_line(out, "Running Loans", yes_no(details.running_loans));
    push_line(out, "Repayment History", rating(details.repayment_history));
    push_line(
        out,
        "Guarantor Relationship",
        relationship(details.guarantor_relationship),
    );
    push_line(out, "Guarantor Income", details.guarantor_income);
    push_line(out, "First Time Borrower", details.first_time_borrower);
    push_line(
        out,
        "History with Other MFIs",
        mfi_history(details.history_with_other_mfis),
    );
    push_additional(out, &details.additional_info);
}

fn describe_payg(details: &PaygLoanDetails, out: &mut String) {
    push_line(out, "Loan Amount", details.loan_amount);
    push_line(out, "Monthly Income", details.monthly_income);
    push_line(out, "Expenses", expenses_line(&details.expenses));
    push_line(out, "Credit History", rating(details.fcb_score));
    push_line(
        out,
        "Guarantor Relationship",
        relationship(details.guarantor_relationship),
    );
    push_line(out, "Guarantor Income", details.guarantor_income);
    push_line(out, "First Time Borrower", details.first_time_borrower);
    push_line(
        out,
        "History with Other MFIs",
        mfi_history(details.history_with_other_mfis),
    );
    push_line(out, "Product Usage Hours", details.product_usage_hours);
    push_line(out, "Product Verified", details.product_verified);
    push_line(out, "Subscription Cost", details.subscription_cost);
    push_additional(out, &details.additional_info);
}

/// Renders the applicant as the user turn of a report request.
pub fn applicant_prompt(application: &LoanApplication) -> ChatMessage {
    let loan_name = application.loan_type().display_name();
    let identity = application.identity();

    let mut out = format!("{} Applicant details:\n", loan_name);
    push_line(&mut out, "Client Name", &identity.client_name);
    push_line(&mut out, "National ID", &identity.national_id);
    push_line(&mut out, "Date of Birth", &identity.dob);
    match application {
        LoanApplication::Cash(details) => describe_cash(details, &mut out),
        LoanApplication::Payg(details) => describe_payg(details, &mut out),
    }
    let _ = write!(
        out,
        "\nBased on the rules, calculate a score, determine risk, and provide a thorough due diligence report for this {} application.",
        loan_name
    );

    ChatMessage::user(out)
}

/// Generates narrative reports and threads them through the context store.
#[derive(Clone)]
pub struct ReportGenerator {
    client: ChatCompletionClient,
    store: Arc<dyn ContextStore>,
    session_locks: Cache<String, Arc<Mutex<()>>>,
    max_tokens: u32,
}

impl ReportGenerator {
    pub fn new(
        client: ChatCompletionClient,
        store: Arc<dyn ContextStore>,
        max_sessions: u64,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            store,
            session_locks: Cache::builder().max_capacity(max_sessions).build(),
            max_tokens,
        }
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Generates a report for `application` within `session_id`.
    ///
    /// Requests for the same session are serialized so each one sees the turns
    /// recorded by the previous one. The context is only amended after the model
    /// answered; a failed, timed out or cancelled request leaves it untouched.
    ///
    /// # Returns
    ///
    /// * `Result<String, AppError>` - The raw model text.
    pub async fn generate(
        &self,
        application: &LoanApplication,
        session_id: &str,
    ) -> Result<String, AppError> {
        let lock = self
            .session_locks
            .get_with(session_id.to_string(), async { Arc::new(Mutex::new(())) })
            .await;
        let _guard = lock.lock().await;

        let loan_type = application.loan_type();
        let context = self.store.get_context(session_id).await;
        let user_turn = applicant_prompt(application);

        tracing::info!(
            "Generating {} report for session {} with {} prior turn(s)",
            loan_type.display_name(),
            session_id,
            context.len()
        );

        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(system_prompt(loan_type));
        messages.extend(context);
        messages.push(user_turn.clone());

        let report = self
            .client
            .complete(&messages, self.max_tokens)
            .await
            .map_err(|e| {
                tracing::error!("Report generation failed for session {}: {}", session_id, e);
                e
            })?;

        self.store
            .append(session_id, user_turn, ChatMessage::assistant(report.clone()))
            .await;

        Ok(report)
    }
}
