//! Free-form generation from the model's own knowledge
//!
//! Wraps a separate completion call, typically a cheaper model at
//! temperature 0, so an agent can answer general questions without search.

use super::{string_setting, Settings};
use crate::capabilities::{Capability, CapabilityDescription, CapabilityError};
use crate::llm::{CompletionRequest, LlmProvider, Message};
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";

pub struct GenerationCapability {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
}

impl GenerationCapability {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
        }
    }

    /// Settings: `model`, `temperature`
    pub fn from_settings(
        settings: Option<&Settings>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self, CapabilityError> {
        let model = settings
            .and_then(|s| string_setting(s, "model"))
            .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string());
        let temperature = match settings.and_then(|s| s.get("temperature")) {
            None => 0.0,
            Some(value) => value.as_f64().ok_or_else(|| {
                CapabilityError::InitializationError(
                    "generation 'temperature' must be a number".to_string(),
                )
            })? as f32,
        };
        Ok(Self::new(llm, model, temperature))
    }
}

#[async_trait]
impl Capability for GenerationCapability {
    fn describe(&self) -> CapabilityDescription {
        CapabilityDescription::with_query(
            "generation",
            "Answer general-knowledge or creative questions from the model's own knowledge",
        )
    }

    fn operation(&self) -> &str {
        "generation"
    }

    async fn invoke(&self, query: &str) -> Result<String, CapabilityError> {
        let mut request = CompletionRequest::new(self.model.clone(), vec![Message::user(query)]);
        request.temperature = Some(self.temperature);

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| CapabilityError::ExecutionError(e.to_string()))?;

        response
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| CapabilityError::ExecutionError("model returned no text".to_string()))
    }
}
