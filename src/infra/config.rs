//! Centralized configuration (environment variables + defaults).

use anyhow::{anyhow, Context};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Which implementation backs the document and counter stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is postgres.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// `token:uid` pairs accepted without a remote call.
    pub static_api_tokens: Vec<(String, String)>,
    pub identity_verify_url: Option<String>,
    pub object_store_url: Option<String>,
    pub counter_max_attempts: u32,
    pub counter_retry_backoff: Duration,
    pub publish_max_in_flight: usize,
    pub publish_run_timeout: Duration,
    pub publish_scheduler_enabled: bool,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let store_backend: StoreBackend = try_load("STORE_BACKEND", "postgres")?;
        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORE_BACKEND=postgres"));
        }

        let static_api_tokens = match optional("STATIC_API_TOKENS") {
            Some(raw) => parse_token_pairs(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            port: try_load("PORT", "3000")?,
            store_backend,
            database_url,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            static_api_tokens,
            identity_verify_url: optional("IDENTITY_VERIFY_URL"),
            object_store_url: optional("OBJECT_STORE_URL"),
            counter_max_attempts: try_load::<u32>("COUNTER_MAX_ATTEMPTS", "5")?.max(1),
            counter_retry_backoff: Duration::from_millis(try_load("COUNTER_RETRY_BACKOFF_MS", "50")?),
            publish_max_in_flight: try_load::<usize>("PUBLISH_MAX_IN_FLIGHT", "16")?.max(1),
            publish_run_timeout: Duration::from_secs(try_load("PUBLISH_RUN_TIMEOUT_SECS", "300")?),
            publish_scheduler_enabled: try_load("PUBLISH_SCHEDULER_ENABLED", "true")?,
        })
    }

    /// Database URL, failing with a readable error when it is not configured.
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value '{raw}': {e}"))
}

/// Parses `token:uid,token:uid`.
pub fn parse_token_pairs(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (token, uid) = pair
                .split_once(':')
                .with_context(|| format!("STATIC_API_TOKENS entry '{pair}' is not token:uid"))?;
            Ok((token.trim().to_string(), uid.trim().to_string()))
        })
        .collect()
}
