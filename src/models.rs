use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::scoring::{RiskCategory, Score, ScoringStrategy};

// ============ Closed Enumerations ============

/// Yes/No answer as submitted by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

/// Ordinal rating shared by the FCB credit score and repayment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditRating {
    Good,
    Fair,
    Adverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuarantorRelationship {
    Close,
    Distant,
    None,
}

/// Borrowing history with other microfinance institutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MfiHistory {
    None,
    Limited,
    Frequent,
}

/// Loan product a report is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Cash,
    Payg,
}

impl LoanType {
    pub fn display_name(self) -> &'static str {
        match self {
            LoanType::Cash => "Cash Loan",
            LoanType::Payg => "PAYG Loan",
        }
    }
}

// ============ Applicant Attributes ============

/// Monthly expense breakdown. Missing sub-fields count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Expenses {
    pub grocery: f64,
    pub rent: f64,
    pub utilities: f64,
    pub school_fees: f64,
}

impl Expenses {
    pub fn total(&self) -> f64 {
        self.grocery + self.rent + self.utilities + self.school_fees
    }

    fn numeric_fields(&self) -> [(&'static str, f64); 4] {
        [
            ("expenses.grocery", self.grocery),
            ("expenses.rent", self.rent),
            ("expenses.utilities", self.utilities),
            ("expenses.schoolFees", self.school_fees),
        ]
    }
}

/// Identity fields shared by both loan variants. Opaque to the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantIdentity {
    pub client_name: String,
    pub national_id: String,
    pub dob: String,
    pub contact_number: String,
    pub home_address: String,
}

/// Attributes submitted for a cash loan application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashLoanDetails {
    #[serde(flatten)]
    pub identity: ApplicantIdentity,
    pub loan_amount: f64,
    pub collateral: YesNo,
    pub collateral_value: f64,
    pub monthly_income: f64,
    #[serde(default)]
    pub expenses: Expenses,
    pub fcb_score: CreditRating,
    pub running_loans: YesNo,
    pub repayment_history: CreditRating,
    pub years_in_business: f64,
    pub guarantor_relationship: GuarantorRelationship,
    pub guarantor_income: f64,
    pub first_time_borrower: bool,
    #[serde(rename = "historyWithOtherMFIs")]
    pub history_with_other_mfis: MfiHistory,
    /// Free-form fields extracted from documents that have no typed home.
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl CashLoanDetails {
    pub fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        let mut fields = vec![
            ("loanAmount", self.loan_amount),
            ("collateralValue", self.collateral_value),
            ("monthlyIncome", self.monthly_income),
            ("yearsInBusiness", self.years_in_business),
            ("guarantorIncome", self.guarantor_income),
        ];
        fields.extend(self.expenses.numeric_fields());
        fields
    }
}

/// Attributes submitted for a pay-as-you-go product loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaygLoanDetails {
    #[serde(flatten)]
    pub identity: ApplicantIdentity,
    pub loan_amount: f64,
    pub monthly_income: f64,
    #[serde(default)]
    pub expenses: Expenses,
    pub fcb_score: CreditRating,
    pub guarantor_relationship: GuarantorRelationship,
    pub guarantor_income: f64,
    pub first_time_borrower: bool,
    #[serde(rename = "historyWithOtherMFIs")]
    pub history_with_other_mfis: MfiHistory,
    pub product_usage_hours: f64,
    pub product_verified: bool,
    pub subscription_cost: f64,
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl PaygLoanDetails {
    pub fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        let mut fields = vec![
            ("loanAmount", self.loan_amount),
            ("monthlyIncome", self.monthly_income),
            ("guarantorIncome", self.guarantor_income),
            ("productUsageHours", self.product_usage_hours),
            ("subscriptionCost", self.subscription_cost),
        ];
        fields.extend(self.expenses.numeric_fields());
        fields
    }
}

/// A validated application of either loan variant.
#[derive(Debug, Clone, PartialEq)]
pub enum LoanApplication {
    Cash(CashLoanDetails),
    Payg(PaygLoanDetails),
}

impl LoanApplication {
    pub fn loan_type(&self) -> LoanType {
        match self {
            LoanApplication::Cash(_) => LoanType::Cash,
            LoanApplication::Payg(_) => LoanType::Payg,
        }
    }

    pub fn identity(&self) -> &ApplicantIdentity {
        match self {
            LoanApplication::Cash(details) => &details.identity,
            LoanApplication::Payg(details) => &details.identity,
        }
    }
}

// ============ Scoring Requests / Responses ============

/// Raw attributes consumed by the preliminary scoring ladders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringInputs {
    pub monthly_income: f64,
    /// Total monthly expenses. Takes precedence over `expenses` when both are sent.
    #[serde(default)]
    pub monthly_expenses: Option<f64>,
    #[serde(default)]
    pub expenses: Option<Expenses>,
    pub collateral: bool,
    #[serde(default)]
    pub business_type: String,
    pub years_in_business: f64,
    pub loan_amount: f64,
    /// Payback period in months.
    pub payback_period: f64,
}

impl ScoringInputs {
    /// Monthly expenses as scored: the explicit total, else the summed breakdown.
    pub fn total_expenses(&self) -> Option<f64> {
        self.monthly_expenses
            .or_else(|| self.expenses.as_ref().map(Expenses::total))
    }

    pub fn is_established_business(&self) -> bool {
        self.business_type == "Established"
    }

    pub fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        let mut fields = vec![
            ("monthly_income", self.monthly_income),
            ("years_in_business", self.years_in_business),
            ("loan_amount", self.loan_amount),
            ("payback_period", self.payback_period),
        ];
        if let Some(total) = self.monthly_expenses {
            fields.push(("monthly_expenses", total));
        }
        if let Some(ref expenses) = self.expenses {
            fields.extend(expenses.numeric_fields());
        }
        fields
    }
}

/// Secondary risk factors applied on top of a preliminary score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustments {
    pub fcb_score: CreditRating,
    /// Outcome of collateral verification, not collateral presence.
    pub collateral_validity: bool,
    pub running_loans: bool,
    pub repayment_history: CreditRating,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreliminaryScoreRequest {
    #[serde(flatten)]
    pub inputs: ScoringInputs,
    #[serde(default)]
    pub strategy: Option<ScoringStrategy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalScoreRequest {
    #[serde(flatten)]
    pub inputs: ScoringInputs,
    #[serde(flatten)]
    pub adjustments: Adjustments,
    #[serde(default)]
    pub strategy: Option<ScoringStrategy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreliminaryScoreResponse {
    pub preliminary_score: f64,
    pub scale: crate::scoring::ScoreScale,
    pub strategy: ScoringStrategy,
    /// `None` when the score is not on the 0-100 scale the thresholds assume.
    pub risk_category: Option<RiskCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalScoreResponse {
    pub final_score: f64,
    pub risk_category: RiskCategory,
    pub preliminary: Score,
    pub strategy: ScoringStrategy,
}

// ============ Report Requests / Responses ============

/// Body of `/api/cash-loan` and `/api/payg-loan`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanReportRequest {
    #[serde(default)]
    pub loan_details: Value,
    #[serde(default)]
    pub context_id: Option<String>,
}

/// Body of `/api/report`, where the loan type travels with the payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedReportRequest {
    #[serde(default)]
    pub loan_type: Option<LoanType>,
    #[serde(default)]
    pub loan_details: Value,
    #[serde(default)]
    pub context_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub report: String,
    pub context_id: String,
}

// ============ Document Analysis ============

/// Result of analysing one uploaded document.
///
/// Every field other than `analysis` is best effort; the model may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    #[serde(default)]
    pub analysis: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub dob: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_info: Option<BTreeMap<String, Option<String>>>,
    #[serde(
        default,
        deserialize_with = "lenient_object",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_info: Option<serde_json::Map<String, Value>>,
}

/// Model output as text: strings as-is, other scalars and arrays in JSON form.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_text))
}

fn lenient_text_map<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, Option<String>>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_object(deserializer)?.map(|map| {
        map.into_iter()
            .map(|(key, value)| (key, value_to_text(value)))
            .collect()
    }))
}

/// Keeps the field only when the model sent an object.
fn lenient_object<'de, D>(deserializer: D) -> Result<Option<serde_json::Map<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Ok(Some(map)),
        _ => Ok(None),
    }
}

impl DocumentAnalysis {
    /// Wraps unparsable model output so the caller still gets the text.
    pub fn from_raw(raw: &str) -> Self {
        Self {
            analysis: raw.to_string(),
            ..Default::default()
        }
    }
}
