use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_CACHE_EXPIRY_SECS: u64 = 24 * 60 * 60;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub provider_base_url: String,
    pub provider_api_key: Option<String>,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub cache_expiry: Duration,
    pub provider_timeout: Duration,
    pub max_batch_size: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            provider_base_url: require_env("PROVIDER_BASE_URL")?,
            provider_api_key: optional_env("PROVIDER_API_KEY"),
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_audience: optional_env("JWT_AUDIENCE"),
            cache_expiry: Duration::from_secs(parse_env_or(
                "CACHE_EXPIRY_SECS",
                DEFAULT_CACHE_EXPIRY_SECS,
            )?),
            provider_timeout: Duration::from_secs(parse_env_or(
                "PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )?),
            max_batch_size: parse_env_or("MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE)?,
            port: parse_env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.cache_expiry.is_zero() {
            bail!("CACHE_EXPIRY_SECS must be greater than zero");
        }
        if self.provider_timeout.is_zero() {
            bail!("PROVIDER_TIMEOUT_SECS must be greater than zero");
        }
        if self.max_batch_size == 0 {
            bail!("MAX_BATCH_SIZE must be greater than zero");
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
