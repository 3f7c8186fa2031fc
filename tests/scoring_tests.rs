/// Scenario tests for the scoring engine
/// Covers the documented boundary cases end to end through the public API
use loan_scoring_api::handlers::score_final;
use loan_scoring_api::models::{
    Adjustments, CreditRating, Expenses, FinalScoreRequest, ScoringInputs,
};
use loan_scoring_api::scoring::{
    aggregate, flat_point_ladder, risk_category, weighted_components, RiskCategory, Score,
    ScoringStrategy, WeightedFactor,
};

fn applicant() -> ScoringInputs {
    ScoringInputs {
        monthly_income: 3000.0,
        monthly_expenses: Some(1000.0),
        expenses: None,
        collateral: true,
        business_type: "Established".to_string(),
        years_in_business: 7.0,
        loan_amount: 1200.0,
        payback_period: 12.0,
    }
}

#[cfg(test)]
mod aggregation_tests {
    use super::*;

    #[test]
    fn test_ratios() {
        let ratios = aggregate(3000.0, 1000.0, 1200.0, 12.0);
        assert_eq!(ratios.income_to_expense, 3.0);
        assert_eq!(ratios.loan_to_payback, 100.0);
        assert_eq!(ratios.loan_to_income, 0.4);
    }

    #[test]
    fn test_expense_breakdown_is_summed() {
        let mut inputs = applicant();
        inputs.monthly_expenses = None;
        inputs.expenses = Some(Expenses {
            grocery: 250.0,
            rent: 500.0,
            utilities: 150.0,
            school_fees: 100.0,
        });

        assert_eq!(inputs.total_expenses(), Some(1000.0));
        assert_eq!(
            flat_point_ladder(&inputs),
            flat_point_ladder(&applicant())
        );
    }
}

#[cfg(test)]
mod strategy_tests {
    use super::*;

    #[test]
    fn test_ratio_of_exactly_three_is_not_top_band() {
        let components = weighted_components(&applicant());
        let income = components
            .iter()
            .find(|c| c.factor == WeightedFactor::IncomeToExpenseRatio)
            .unwrap();
        assert_eq!(income.points, 25);
        assert!((income.weighted - 7.5).abs() < 1e-9);

        // flat ladder: 3 fails > 3, passes > 2
        let flat = flat_point_ladder(&applicant());
        assert_eq!(flat.value, 20.0 + 20.0 + 25.0 + 20.0);
    }

    #[test]
    fn test_weighted_breakdown_for_reference_applicant() {
        let score = ScoringStrategy::WeightedRatioLadder.score(&applicant());
        // 7.5 + 4 + 2.25 + 1.8 + 1 + 1
        assert!((score.value - 17.55).abs() < 1e-9);
        assert_eq!(score.risk_category(), None);
    }

    #[test]
    fn test_flat_ladder_loan_to_payback_bands() {
        let mut inputs = applicant();
        inputs.payback_period = 6.0;

        inputs.loan_amount = 1199.0; // ratio just under 200
        let high = flat_point_ladder(&inputs).value;
        inputs.loan_amount = 1200.0; // ratio exactly 200
        let mid = flat_point_ladder(&inputs).value;
        inputs.loan_amount = 1800.0; // ratio exactly 300
        let low = flat_point_ladder(&inputs).value;

        assert_eq!(high - mid, 5.0);
        assert_eq!(mid - low, 5.0);
    }
}

#[cfg(test)]
mod final_score_tests {
    use super::*;

    #[test]
    fn test_all_adverse_from_fifty() {
        let adjustments = Adjustments {
            fcb_score: CreditRating::Adverse,
            collateral_validity: false,
            running_loans: true,
            repayment_history: CreditRating::Adverse,
        };
        let result = loan_scoring_api::scoring::final_score(&Score::percent(50.0), &adjustments);

        assert_eq!(result.value, 10.0);
        assert_eq!(risk_category(result.value), RiskCategory::VeryHigh);
        assert_eq!(risk_category(result.value).to_string(), "Very high risk");
    }

    #[test]
    fn test_final_request_defaults_to_weighted_ladder() {
        let request = FinalScoreRequest {
            inputs: applicant(),
            adjustments: Adjustments {
                fcb_score: CreditRating::Good,
                collateral_validity: true,
                running_loans: false,
                repayment_history: CreditRating::Good,
            },
            strategy: None,
        };
        let response = score_final(&request);

        assert_eq!(response.strategy, ScoringStrategy::WeightedRatioLadder);
        assert!((response.final_score - 47.55).abs() < 1e-9);
        assert_eq!(response.risk_category, RiskCategory::Moderate);
    }

    #[test]
    fn test_final_request_with_flat_ladder_clamps() {
        let request = FinalScoreRequest {
            inputs: applicant(),
            adjustments: Adjustments {
                fcb_score: CreditRating::Good,
                collateral_validity: true,
                running_loans: false,
                repayment_history: CreditRating::Fair,
            },
            strategy: Some(ScoringStrategy::FlatPointLadder),
        };
        let response = score_final(&request);

        assert_eq!(response.final_score, 100.0);
        assert_eq!(response.risk_category, RiskCategory::VeryLow);
    }
}

#[cfg(test)]
mod risk_category_tests {
    use super::*;

    #[test]
    fn test_every_integer_score_has_one_label() {
        for score in 0..=100 {
            let category = risk_category(f64::from(score));
            let expected = match score {
                80..=100 => RiskCategory::VeryLow,
                60..=79 => RiskCategory::Low,
                40..=59 => RiskCategory::Moderate,
                20..=39 => RiskCategory::High,
                _ => RiskCategory::VeryHigh,
            };
            assert_eq!(category, expected, "score {}", score);
        }
    }
}
