//! Voice Classifier: classifies campaign voice calls and advances their threads.

pub mod api;
pub mod campaign;
pub mod classifier;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod store;
