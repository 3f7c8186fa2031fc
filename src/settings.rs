//! Persisted engine weight settings.
//!
//! The record is written and read back through its own endpoints only. The
//! scoring functions use the compile-time [`crate::scoring::WEIGHTS`]; wiring
//! stored weights into scoring is an explicit, not yet implemented step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::errors::{AppError, ResultExt};
use crate::validation::ensure_non_negative;

/// Weight percentages per scoring factor, as edited on the settings page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub income_to_expense_ratio: f64,
    pub collateral: f64,
    pub business_type: f64,
    pub years_in_business: f64,
    pub loan_amount: f64,
    pub payback_period: f64,
}

impl EngineSettings {
    fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("income_to_expense_ratio", self.income_to_expense_ratio),
            ("collateral", self.collateral),
            ("business_type", self.business_type),
            ("years_in_business", self.years_in_business),
            ("loan_amount", self.loan_amount),
            ("payback_period", self.payback_period),
        ]
    }

    pub fn total(&self) -> f64 {
        self.fields().iter().map(|(_, weight)| weight).sum()
    }

    /// Weights must be non-negative and add up to 100.
    pub fn validate(&self) -> Result<(), AppError> {
        ensure_non_negative(&self.fields())?;
        let total = self.total();
        if (total - 100.0).abs() > 1e-6 {
            return Err(AppError::Validation(format!(
                "Weights must sum to 100, got {}",
                total
            )));
        }
        Ok(())
    }
}

/// Settings as stored, with the time of the last write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSettings {
    #[serde(flatten)]
    pub weights: EngineSettings,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Inserts or replaces the single settings record.
    async fn save(&self, settings: &EngineSettings) -> Result<StoredSettings, AppError>;

    /// The current record, `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<StoredSettings>, AppError>;
}

/// Settings kept in Postgres, one row in `engine_settings`.
pub struct PostgresSettingsStore {
    pool: PgPool,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    async fn save(&self, settings: &EngineSettings) -> Result<StoredSettings, AppError> {
        let (updated_at,): (DateTime<Utc>,) = sqlx::query_as(
            "INSERT INTO engine_settings (id, weights, updated_at)
             VALUES (1, $1, NOW())
             ON CONFLICT (id) DO UPDATE
               SET weights = EXCLUDED.weights, updated_at = EXCLUDED.updated_at
             RETURNING updated_at",
        )
        .bind(Json(settings))
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert engine settings")?;

        tracing::info!("Engine settings saved");
        Ok(StoredSettings {
            weights: settings.clone(),
            updated_at,
        })
    }

    async fn load(&self) -> Result<Option<StoredSettings>, AppError> {
        let row: Option<(Json<EngineSettings>, DateTime<Utc>)> =
            sqlx::query_as("SELECT weights, updated_at FROM engine_settings WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .context("Failed to load engine settings")?;

        Ok(row.map(|(Json(weights), updated_at)| StoredSettings {
            weights,
            updated_at,
        }))
    }
}

/// Settings kept for the process lifetime only, used when no database is configured.
#[derive(Default)]
pub struct InMemorySettingsStore {
    current: RwLock<Option<StoredSettings>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn save(&self, settings: &EngineSettings) -> Result<StoredSettings, AppError> {
        let stored = StoredSettings {
            weights: settings.clone(),
            updated_at: Utc::now(),
        };
        *self.current.write().await = Some(stored.clone());
        Ok(stored)
    }

    async fn load(&self) -> Result<Option<StoredSettings>, AppError> {
        Ok(self.current.read().await.clone())
    }
}
