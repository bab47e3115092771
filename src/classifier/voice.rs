//! Two-stage LLM classifier.
//!
//! 1. Intent round-trip: system instruction + transcript → `{"intent": ...}`.
//! 2. Only for interested / wants-call-back: the same conversation continues
//!    with the first answer as an assistant turn and an extraction prompt →
//!    `{"agreedDatetime": ...}` in local wall-clock time.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::datetime::{format_call_time, load_timezone, localize, parse_agreed_datetime};
use super::prompts;
use super::{Classifier, ClassifyParams, ClassifyResponse};
use crate::campaign::Intent;
use crate::error::{ClassifyError, ClassifyStage};
use crate::llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider};

/// Classification must be reproducible.
const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// Both answers are a one-field JSON object.
const CLASSIFY_MAX_TOKENS: u32 = 256;

/// LLM-backed [`Classifier`].
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    async fn round_trip(
        &self,
        messages: &[ChatMessage],
        stage: ClassifyStage,
    ) -> Result<CompletionResponse, ClassifyError> {
        let request = CompletionRequest::new(messages.to_vec())
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_max_tokens(CLASSIFY_MAX_TOKENS)
            .with_json_response();

        let response = self.llm.complete(request).await?;
        debug!(
            stage = %stage,
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost_usd = %response.cost(self.llm.cost_per_token()),
            "Classification round-trip complete"
        );
        Ok(response)
    }
}

/// Decode a JSON object answer.
fn parse_json(raw: &str, stage: ClassifyStage) -> Result<Value, ClassifyError> {
    serde_json::from_str(raw.trim()).map_err(|e| ClassifyError::InvalidJson {
        stage,
        reason: e.to_string(),
    })
}

/// Read `intent` from the first answer. Unrecognised labels are kept as given.
fn parse_intent(raw: &str) -> Result<Intent, ClassifyError> {
    let value = parse_json(raw, ClassifyStage::Intent)?;
    value
        .get("intent")
        .and_then(Value::as_str)
        .map(Intent::from)
        .ok_or(ClassifyError::MissingIntent)
}

/// Read `agreedDatetime` from the second answer. Anything but a string means no date.
fn parse_agreed_field(raw: &str) -> Result<Option<String>, ClassifyError> {
    let value = parse_json(raw, ClassifyStage::Datetime)?;
    Ok(value
        .get("agreedDatetime")
        .and_then(Value::as_str)
        .map(str::to_string))
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, params: ClassifyParams) -> Result<ClassifyResponse, ClassifyError> {
        let mut ret = ClassifyResponse::default();

        let mut messages = vec![
            ChatMessage::system(prompts::intent_system_prompt()),
            ChatMessage::user(prompts::intent_user_prompt(&params.transcript)),
        ];
        let first = self.round_trip(&messages, ClassifyStage::Intent).await?;
        ret.intent = parse_intent(&first.content)?;

        if !ret.intent.needs_datetime() {
            return Ok(ret);
        }

        let tz = load_timezone(&params.timezone)?;
        let call_time = format_call_time(params.called_at, tz);
        let extraction_prompt = if ret.intent == Intent::Interested {
            prompts::interested_datetime_prompt(&call_time)
        } else {
            prompts::call_back_datetime_prompt(&call_time)
        };
        messages.push(ChatMessage::assistant(first.content));
        messages.push(ChatMessage::user(extraction_prompt));

        let second = self.round_trip(&messages, ClassifyStage::Datetime).await?;
        let Some(agreed) = parse_agreed_field(&second.content)? else {
            return Ok(ret);
        };
        let Some(naive) = parse_agreed_datetime(&agreed)? else {
            return Ok(ret);
        };

        let local = localize(naive, tz)?;
        match ret.intent {
            Intent::Interested => ret.interested_time = Some(local),
            Intent::WantsCallBack => ret.call_back_time = Some(local),
            _ => {}
        }
        Ok(ret)
    }
}
