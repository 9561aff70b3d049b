//! Oracle endpoint configuration.
//!
//! Configuration is read from environment variables, matching how the
//! deployment provisions the Potens credentials.

use docflow_core::error::{DocflowError, Result};
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Connection settings for the Potens chat endpoint.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Full URL of the chat endpoint.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Connect/read timeout per request.
    pub timeout: Duration,
    /// Total attempts per call, retrying only on 429/5xx and transport
    /// errors.
    pub max_attempts: u32,
}

impl OracleConfig {
    /// Creates a config with default timeout and retry settings.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Required: `POTENS_API_URL`, `POTENS_API_KEY`.
    /// Optional: `DOCFLOW_ORACLE_TIMEOUT_SECS`, `DOCFLOW_ORACLE_MAX_ATTEMPTS`.
    pub fn try_from_env() -> Result<Self> {
        let api_url = env::var("POTENS_API_URL")
            .map_err(|_| DocflowError::config("POTENS_API_URL not set"))?;
        let api_key = env::var("POTENS_API_KEY")
            .map_err(|_| DocflowError::config("POTENS_API_KEY not set"))?;

        let mut config = Self::new(api_url, api_key);
        if let Ok(secs) = env::var("DOCFLOW_ORACLE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| DocflowError::config("DOCFLOW_ORACLE_TIMEOUT_SECS must be an integer"))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(attempts) = env::var("DOCFLOW_ORACLE_MAX_ATTEMPTS") {
            let attempts: u32 = attempts.parse().map_err(|_| {
                DocflowError::config("DOCFLOW_ORACLE_MAX_ATTEMPTS must be an integer")
            })?;
            config.max_attempts = attempts.max(1);
        }

        Ok(config)
    }
}
