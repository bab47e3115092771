//! Campaign threads, voice calls, and classifications.

pub mod model;

pub use model::{CampaignThread, Classification, Intent, NewClassification, ThreadStatus, VoiceCall};
