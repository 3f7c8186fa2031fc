//! Offline scorer: reads a final-score request and prints every score for it.
//!
//! Usage: `score-applicant <request.json>` or `score-applicant -` to read stdin.

use std::io::Read;

use loan_scoring_api::api::handlers::score_final;
use loan_scoring_api::api::validation::{parse_payload, validate_scoring_inputs};
use loan_scoring_api::core::models::FinalScoreRequest;
use loan_scoring_api::core::scoring::{weighted_components, ScoringStrategy};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: score-applicant <request.json | ->"))?;

    let mut body = Vec::new();
    if path == "-" {
        std::io::stdin().read_to_end(&mut body)?;
    } else {
        body = std::fs::read(&path)?;
    }

    let request: FinalScoreRequest = parse_payload(&body, "Scoring inputs")?;
    validate_scoring_inputs(&request.inputs)?;

    let weighted = ScoringStrategy::WeightedRatioLadder.score(&request.inputs);
    let flat = ScoringStrategy::FlatPointLadder.score(&request.inputs);
    let outcome = score_final(&request);

    let report = json!({
        "preliminary": {
            "weighted_ratio_ladder": weighted,
            "flat_point_ladder": {
                "score": flat,
                "risk_category": flat.risk_category(),
            },
            "weighted_components": weighted_components(&request.inputs),
        },
        "final": outcome,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
