//! Voice call classification.
//!
//! A `Classifier` turns one transcript into an [`Intent`] plus, for the
//! interested and call-back intents, the local date/time the caller agreed to.
//! [`LlmClassifier`] is the production implementation; tests substitute their
//! own.

pub mod datetime;
pub mod prompts;
mod voice;

pub use voice::LlmClassifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::campaign::Intent;
use crate::error::ClassifyError;

/// Input for a single classification.
#[derive(Debug, Clone)]
pub struct ClassifyParams {
    pub transcript: String,
    /// IANA timezone of the call.
    pub timezone: String,
    pub called_at: DateTime<Utc>,
}

/// Outcome of a single classification.
///
/// Extracted times carry the call's own timezone, never UTC.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassifyResponse {
    pub intent: Intent,
    pub interested_time: Option<DateTime<Tz>>,
    pub call_back_time: Option<DateTime<Tz>>,
}

/// Produces a [`ClassifyResponse`] from [`ClassifyParams`].
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, params: ClassifyParams) -> Result<ClassifyResponse, ClassifyError>;
}
