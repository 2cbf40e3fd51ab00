use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_FETCH_MAX_ATTEMPTS, DEFAULT_FETCH_RETRY_DELAY_MS, DEFAULT_FETCH_TIMEOUT_SECS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Safe transaction service
    pub safe_api_key: Option<String>,
    pub safe_networks: Vec<String>,

    // Retry policy
    pub fetch_max_attempts: u32,
    pub fetch_retry_delay_ms: u64,
    pub fetch_timeout_secs: u64,

    // Address book override
    pub address_book_path: Option<PathBuf>,

    // CORS
    pub cors_allowed_origins: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            safe_api_key: None,
            safe_networks: Vec::new(),
            fetch_max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            fetch_retry_delay_ms: DEFAULT_FETCH_RETRY_DELAY_MS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            address_book_path: None,
            cors_allowed_origins: "*".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        Ok(Config {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),

            safe_api_key: env::var("SAFE_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            safe_networks: env::var("SAFE_NETWORKS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),

            fetch_max_attempts: env::var("FETCH_MAX_ATTEMPTS")
                .unwrap_or_else(|_| defaults.fetch_max_attempts.to_string())
                .parse()?,
            fetch_retry_delay_ms: env::var("FETCH_RETRY_DELAY_MS")
                .unwrap_or_else(|_| defaults.fetch_retry_delay_ms.to_string())
                .parse()?,
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.fetch_timeout_secs.to_string())
                .parse()?,

            address_book_path: env::var("ADDRESS_BOOK_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("HOST is empty");
        }
        if self.fetch_max_attempts == 0 {
            anyhow::bail!("FETCH_MAX_ATTEMPTS must be at least 1");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("FETCH_TIMEOUT_SECS must be at least 1");
        }

        if self.safe_api_key.is_none() {
            tracing::warn!("SAFE_API_KEY is not set; every lookup will fail");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
