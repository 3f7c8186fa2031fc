use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub llm_timeout_secs: u64,
    pub report_max_tokens: u32,
    pub analysis_max_tokens: u32,
    pub context_max_sessions: u64,
    pub context_idle_ttl_secs: Option<u64>, // None keeps sessions until evicted by capacity
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("OPENAI_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            openai_model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "gpt-4-turbo".to_string()),
            llm_timeout_secs: parse_positive("LLM_TIMEOUT_SECS", 60)?,
            report_max_tokens: parse_positive("REPORT_MAX_TOKENS", 1500)?,
            analysis_max_tokens: parse_positive("ANALYSIS_MAX_TOKENS", 500)?,
            context_max_sessions: parse_positive("CONTEXT_MAX_SESSIONS", 10_000)?,
            context_idle_ttl_secs: match std::env::var("CONTEXT_IDLE_TTL_SECS") {
                Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("CONTEXT_IDLE_TTL_SECS must be a number of seconds")
                })?),
                _ => None,
            },
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        config.validate()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("LLM Base URL: {}", config.openai_base_url);
        tracing::debug!("LLM Model: {}", config.openai_model);
        match config.database_url {
            Some(ref url) => {
                tracing::debug!("Database URL: {}...", url_prefix(url))
            }
            None => tracing::info!("No database configured, settings are kept in memory"),
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.openai_base_url.starts_with("http://")
            && !self.openai_base_url.starts_with("https://")
        {
            anyhow::bail!("OPENAI_BASE_URL must start with http:// or https://");
        }
        if let Some(ref url) = self.database_url {
            if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
            }
        }
        Ok(())
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn context_idle_ttl(&self) -> Option<Duration> {
        self.context_idle_ttl_secs.map(Duration::from_secs)
    }
}

/// First 20 characters of `url`, for logging.
fn url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

fn parse_positive<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value = match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a positive number", name))?,
        _ => default,
    };
    if value <= T::default() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
