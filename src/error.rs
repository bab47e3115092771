//! Error types for the voice classifier.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),
}

/// Configuration-related errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which round-trip of the two-stage classifier produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyStage {
    Intent,
    Datetime,
}

impl std::fmt::Display for ClassifyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifyStage::Intent => write!(f, "intent"),
            ClassifyStage::Datetime => write!(f, "datetime"),
        }
    }
}

/// Errors from classifying a single voice call.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Failed to parse {stage} response: {reason}")]
    InvalidJson { stage: ClassifyStage, reason: String },

    #[error("Intent response has no string 'intent' field")]
    MissingIntent,

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid agreed datetime '{value}': {reason}")]
    InvalidDatetime { value: String, reason: String },
}

/// Errors from processing one campaign thread.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Failed to classify voice call {call_id}: {source}")]
    Classify {
        call_id: String,
        #[source]
        source: ClassifyError,
    },

    #[error("Thread {thread_id} is not awaiting classification (status: {status})")]
    NotPending { thread_id: String, status: String },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
