use std::env;

use loan_scoring_api::db::Database;
use loan_scoring_api::settings::{EngineSettings, PostgresSettingsStore, SettingsStore};

/// Smoke test for the Postgres settings store.
/// Ignored by default since it overwrites the settings row; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn save_and_load_settings_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let store = PostgresSettingsStore::new(db.pool.clone());

    let settings = EngineSettings {
        income_to_expense_ratio: 30.0,
        collateral: 20.0,
        business_type: 15.0,
        years_in_business: 15.0,
        loan_amount: 10.0,
        payback_period: 10.0,
    };

    let saved = store
        .save(&settings)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let loaded = store
        .load()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("settings row missing after save"))?;

    assert_eq!(loaded.weights, settings);
    assert_eq!(loaded.updated_at, saved.updated_at);
    Ok(())
}
