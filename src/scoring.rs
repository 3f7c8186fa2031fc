//! Deterministic credit scoring.
//!
//! Two preliminary strategies coexist because they score different products:
//!
//! - [`ScoringStrategy::WeightedRatioLadder`] sums six weighted sub-scores. Its
//!   result lands roughly in `[5.6, 19.5]` and is tagged [`ScoreScale::WeightedPoints`].
//! - [`ScoringStrategy::FlatPointLadder`] sums four unweighted ladders into
//!   `[40, 90]` and is tagged [`ScoreScale::Percent`].
//!
//! Risk thresholds (80/60/40/20) are only meaningful on the percent scale, so
//! [`Score::risk_category`] refuses to categorize weighted points.
//!
//! Every function here is total. Inputs are validated at the HTTP boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Adjustments, CreditRating, ScoringInputs};

// ============ Aggregation ============

/// Ratios derived from the applicant's monthly figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinancialRatios {
    pub income_to_expense: f64,
    pub loan_to_payback: f64,
    pub loan_to_income: f64,
}

/// Derives the ratios the ladders consume. Denominators are floored at 1.
pub fn aggregate(
    monthly_income: f64,
    monthly_expenses: f64,
    loan_amount: f64,
    payback_period: f64,
) -> FinancialRatios {
    FinancialRatios {
        income_to_expense: monthly_income / monthly_expenses.max(1.0),
        loan_to_payback: loan_amount / payback_period.max(1.0),
        loan_to_income: loan_amount / monthly_income.max(1.0),
    }
}

impl FinancialRatios {
    pub fn from_inputs(inputs: &ScoringInputs) -> Self {
        aggregate(
            inputs.monthly_income,
            inputs.total_expenses().unwrap_or(0.0),
            inputs.loan_amount,
            inputs.payback_period,
        )
    }
}

// ============ Scores ============

/// Scale a score value is expressed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// Sum of weighted ladder points, not comparable with risk thresholds.
    WeightedPoints,
    /// 0-100 scale the risk thresholds are defined on.
    Percent,
}

/// A score value that carries the scale it was produced on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    pub scale: ScoreScale,
}

impl Score {
    pub fn percent(value: f64) -> Self {
        Self {
            value,
            scale: ScoreScale::Percent,
        }
    }

    pub fn weighted_points(value: f64) -> Self {
        Self {
            value,
            scale: ScoreScale::WeightedPoints,
        }
    }

    /// Risk category for percent-scale scores, `None` otherwise.
    pub fn risk_category(&self) -> Option<RiskCategory> {
        match self.scale {
            ScoreScale::Percent => Some(risk_category(self.value)),
            ScoreScale::WeightedPoints => None,
        }
    }
}

// ============ Strategies ============

/// Preliminary scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Weighted general-loan score (six sub-scores times fixed weights).
    WeightedRatioLadder,
    /// Unweighted cash/PAYG score (four flat ladders).
    FlatPointLadder,
}

impl ScoringStrategy {
    pub fn score(self, inputs: &ScoringInputs) -> Score {
        match self {
            ScoringStrategy::WeightedRatioLadder => weighted_ratio_ladder(inputs),
            ScoringStrategy::FlatPointLadder => flat_point_ladder(inputs),
        }
    }
}

/// Factor a weighted sub-score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightedFactor {
    IncomeToExpenseRatio,
    Collateral,
    BusinessType,
    YearsInBusiness,
    LoanAmount,
    PaybackPeriod,
}

/// Percentage weights of the weighted ladder. Always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeightTable {
    pub income_to_expense_ratio: u32,
    pub collateral: u32,
    pub business_type: u32,
    pub years_in_business: u32,
    pub loan_amount: u32,
    pub payback_period: u32,
}

pub const WEIGHTS: WeightTable = WeightTable {
    income_to_expense_ratio: 30,
    collateral: 20,
    business_type: 15,
    years_in_business: 15,
    loan_amount: 10,
    payback_period: 10,
};

impl WeightTable {
    pub fn weight(&self, factor: WeightedFactor) -> u32 {
        match factor {
            WeightedFactor::IncomeToExpenseRatio => self.income_to_expense_ratio,
            WeightedFactor::Collateral => self.collateral,
            WeightedFactor::BusinessType => self.business_type,
            WeightedFactor::YearsInBusiness => self.years_in_business,
            WeightedFactor::LoanAmount => self.loan_amount,
            WeightedFactor::PaybackPeriod => self.payback_period,
        }
    }

    pub fn total(&self) -> u32 {
        self.income_to_expense_ratio
            + self.collateral
            + self.business_type
            + self.years_in_business
            + self.loan_amount
            + self.payback_period
    }
}

/// One weighted sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub factor: WeightedFactor,
    pub points: u32,
    pub weight: u32,
    pub weighted: f64,
}

impl ScoreComponent {
    fn new(factor: WeightedFactor, points: u32) -> Self {
        let weight = WEIGHTS.weight(factor);
        Self {
            factor,
            points,
            weight,
            weighted: f64::from(points * weight) / 100.0,
        }
    }
}

/// The six sub-scores summed by the weighted ladder, in table order.
pub fn weighted_components(inputs: &ScoringInputs) -> [ScoreComponent; 6] {
    let ratios = FinancialRatios::from_inputs(inputs);
    let ie = ratios.income_to_expense;

    let income_points = if ie > 3.0 {
        30
    } else if ie > 2.0 {
        25
    } else if ie > 1.5 {
        20
    } else if ie > 1.0 {
        15
    } else if ie > 0.5 {
        10
    } else {
        5
    };

    let collateral_points = if inputs.collateral { 20 } else { 10 };

    let years = inputs.years_in_business;
    let business_points = match (inputs.is_established_business(), years > 5.0) {
        (true, true) => 15,
        (true, false) => 10,
        _ => 5,
    };

    let years_points = if years > 10.0 {
        15
    } else if years > 5.0 {
        12
    } else if years > 2.0 {
        10
    } else {
        5
    };

    let lti = ratios.loan_to_income;
    let loan_points = if lti < 0.5 {
        10
    } else if lti < 0.75 {
        7
    } else if lti < 1.0 {
        5
    } else {
        3
    };

    let months = inputs.payback_period;
    let payback_points = if months <= 12.0 {
        10
    } else if months <= 24.0 {
        7
    } else if months <= 36.0 {
        5
    } else {
        3
    };

    [
        ScoreComponent::new(WeightedFactor::IncomeToExpenseRatio, income_points),
        ScoreComponent::new(WeightedFactor::Collateral, collateral_points),
        ScoreComponent::new(WeightedFactor::BusinessType, business_points),
        ScoreComponent::new(WeightedFactor::YearsInBusiness, years_points),
        ScoreComponent::new(WeightedFactor::LoanAmount, loan_points),
        ScoreComponent::new(WeightedFactor::PaybackPeriod, payback_points),
    ]
}

/// Strategy A: weighted general-loan score.
pub fn weighted_ratio_ladder(inputs: &ScoringInputs) -> Score {
    let total = weighted_components(inputs)
        .iter()
        .map(|component| component.weighted)
        .sum();
    Score::weighted_points(total)
}

/// Strategy B: flat cash/PAYG score.
pub fn flat_point_ladder(inputs: &ScoringInputs) -> Score {
    let ratios = FinancialRatios::from_inputs(inputs);
    let mut score = 0u32;

    let ie = ratios.income_to_expense;
    score += if ie > 3.0 {
        25
    } else if ie > 2.0 {
        20
    } else if ie > 1.5 {
        15
    } else {
        10
    };

    score += if inputs.collateral { 20 } else { 10 };

    let years = inputs.years_in_business;
    score += if inputs.is_established_business() && years > 5.0 {
        25
    } else if years > 2.0 {
        20
    } else {
        10
    };

    let ltp = ratios.loan_to_payback;
    score += if ltp < 200.0 {
        20
    } else if ltp < 300.0 {
        15
    } else {
        10
    };

    Score::percent(f64::from(score))
}

// ============ Final Score ============

fn rating_delta(rating: CreditRating) -> f64 {
    match rating {
        CreditRating::Good => 10.0,
        CreditRating::Fair => 5.0,
        CreditRating::Adverse => -10.0,
    }
}

/// Sum of the secondary-factor deltas, before clamping.
pub fn adjustment_delta(adjustments: &Adjustments) -> f64 {
    let collateral = if adjustments.collateral_validity {
        10.0
    } else {
        -10.0
    };
    let running_loans = if adjustments.running_loans { -10.0 } else { 0.0 };

    rating_delta(adjustments.fcb_score)
        + collateral
        + running_loans
        + rating_delta(adjustments.repayment_history)
}

/// Applies the secondary factors to a preliminary score and clamps to `[0, 100]`.
///
/// The preliminary value is taken as-is whatever its scale; the result is
/// always on the percent scale because of the clamp.
pub fn final_score(preliminary: &Score, adjustments: &Adjustments) -> Score {
    let adjusted = preliminary.value + adjustment_delta(adjustments);
    Score::percent(adjusted.clamp(0.0, 100.0))
}

// ============ Risk Categories ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "Very low risk")]
    VeryLow,
    #[serde(rename = "Low risk")]
    Low,
    #[serde(rename = "Moderate risk")]
    Moderate,
    #[serde(rename = "High risk")]
    High,
    #[serde(rename = "Very high risk")]
    VeryHigh,
}

impl RiskCategory {
    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::VeryLow => "Very low risk",
            RiskCategory::Low => "Low risk",
            RiskCategory::Moderate => "Moderate risk",
            RiskCategory::High => "High risk",
            RiskCategory::VeryHigh => "Very high risk",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a 0-100 score to its risk category. Lower bounds are inclusive.
pub fn risk_category(score: f64) -> RiskCategory {
    if score >= 80.0 {
        RiskCategory::VeryLow
    } else if score >= 60.0 {
        RiskCategory::Low
    } else if score >= 40.0 {
        RiskCategory::Moderate
    } else if score >= 20.0 {
        RiskCategory::High
    } else {
        RiskCategory::VeryHigh
    }
}
