use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Single-row table holding the engine weights
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS engine_settings (
                id SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
                weights JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}
