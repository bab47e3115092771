//! Configuration types.
//!
//! Everything is read from environment variables. The database location and the
//! LLM API key are mandatory; a missing value is a startup failure, never a
//! runtime error.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const ENV_DB: &str = "VOICE_CLASSIFIER_DB";
pub const ENV_DB_AUTH_TOKEN: &str = "VOICE_CLASSIFIER_DB_AUTH_TOKEN";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "VOICE_CLASSIFIER_MODEL";
pub const ENV_LLM_BASE_URL: &str = "VOICE_CLASSIFIER_LLM_BASE_URL";
pub const ENV_POLL_INTERVAL: &str = "VOICE_CLASSIFIER_POLL_INTERVAL_SECS";
pub const ENV_HTTP_ADDR: &str = "VOICE_CLASSIFIER_HTTP_ADDR";

/// Default chat-completion model.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Default OpenAI-compatible API root.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default scheduler cadence.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

/// Where the libSQL database lives.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Local path, `:memory:`, or a `libsql://` / `http(s)://` URL.
    pub url: String,
    /// Auth token for remote URLs. Empty for local databases.
    pub auth_token: String,
}

impl DatabaseConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = required(&lookup, ENV_DB)?;
        let auth_token = lookup(ENV_DB_AUTH_TOKEN).unwrap_or_default();
        Ok(Self { url, auth_token })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Configuration for the classifier service binary.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub database: DatabaseConfig,
    pub api_key: SecretString,
    pub model: String,
    pub llm_base_url: String,
    /// Time between scheduler ticks.
    pub poll_interval: Duration,
}

impl ClassifierConfig {
    /// Build from an arbitrary key lookup. `from_env` is the production entry point.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_lookup(&lookup)?;
        let api_key = SecretString::from(required(&lookup, ENV_API_KEY)?);

        let model = optional(&lookup, ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let llm_base_url = optional(&lookup, ENV_LLM_BASE_URL)
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let poll_secs = match optional(&lookup, ENV_POLL_INTERVAL) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e| ConfigError::InvalidValue {
                    key: ENV_POLL_INTERVAL.to_string(),
                    message: format!("{raw:?} is not a whole number of seconds: {e}"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_POLL_INTERVAL.to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                secs
            }
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            database,
            api_key,
            model,
            llm_base_url,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Configuration for the read-only HTTP API binary.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_lookup(&lookup)?;
        let raw = optional(&lookup, ENV_HTTP_ADDR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let bind_addr = raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: ENV_HTTP_ADDR.to_string(),
            message: format!("{raw:?}: {e}"),
        })?;
        Ok(Self {
            database,
            bind_addr,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Non-empty value or `None`.
fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}
