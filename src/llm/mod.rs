//! LLM integration.
//!
//! The classifier talks to any OpenAI-compatible chat-completions endpoint
//! through the `LlmProvider` trait, so tests can swap in a scripted provider.

mod costs;
pub mod openai;
pub mod provider;

pub use costs::model_cost;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider =
        OpenAiProvider::new(&config.base_url, config.api_key.clone(), &config.model)?;
    tracing::info!("Using OpenAI-compatible endpoint {} (model: {})", config.base_url, config.model);
    Ok(Arc::new(provider))
}
