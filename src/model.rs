//! `LanguageModel`: the pluggable generation backend (spec §2, §4.4,
//! §4.5).

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::error::AgentError;
use crate::item::ModelResponse;
use crate::message::Message;
use crate::part::Part;
use crate::stream_accumulator::ModelPartial;

/// Requested output modalities for a generation (spec Glossary).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modality {
    Text,
    Audio,
}

/// A tool definition as presented to the language model: name,
/// description, and JSON-Schema parameters. Distinct from
/// [`crate::tool::AgentTool`], which also knows how to execute itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Everything a `LanguageModel` needs for one turn: the resolved
/// system prompt, the projected message history, the active tool
/// definitions, and sampling/response knobs (spec §6, §9).
#[derive(Clone, Debug, Default)]
pub struct LanguageModelInput {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: Option<Value>,
    pub modalities: Vec<Modality>,
    pub audio: Option<Value>,
    pub reasoning: Option<Value>,
}

/// The pluggable generation backend. Implementations call out to a
/// provider API; the runtime only depends on this trait, never on a
/// concrete provider SDK (spec §2: "Non-goals" excludes any bundled
/// provider integration).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, input: LanguageModelInput) -> Result<ModelResponse, AgentError>;

    /// Streams partials; the caller merges them with the
    /// [`crate::stream_accumulator::StreamAccumulator`]. Default
    /// implementation falls back to a single `generate` call emitted
    /// as one partial covering every part — suitable for models or
    /// test doubles with no native incremental streaming.
    async fn stream(
        &self,
        input: LanguageModelInput,
    ) -> Result<BoxStream<'static, Result<ModelPartial, AgentError>>, AgentError> {
        let response = self.generate(input).await?;
        let mut partials: Vec<Result<ModelPartial, AgentError>> = response
            .content
            .into_iter()
            .enumerate()
            .map(|(index, part)| Ok(ModelPartial::from_complete_part(index, part)))
            .collect();
        if response.usage.is_some() || response.cost.is_some() {
            partials.push(Ok(ModelPartial {
                part: None,
                usage: response.usage,
                cost: response.cost,
            }));
        }
        Ok(Box::pin(futures_util::stream::iter(partials)))
    }
}

/// A scripted test double: returns one queued [`ModelResponse`] per
/// call to `generate`, in order, and records every input it was given.
/// Grounded in the reference port's `MockLlm`-style fixtures used
/// across the test scenarios in spec §8.
pub struct MockLanguageModel {
    responses: tokio::sync::Mutex<std::collections::VecDeque<ModelResponse>>,
    calls: tokio::sync::Mutex<Vec<LanguageModelInput>>,
}

impl MockLanguageModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: tokio::sync::Mutex::new(responses.into()),
            calls: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ModelResponse::new(vec![Part::text(text)])])
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, input: LanguageModelInput) -> Result<ModelResponse, AgentError> {
        self.calls.lock().await.push(input);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AgentError::language_model(ExhaustedMock))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("MockLanguageModel has no more queued responses")]
struct ExhaustedMock;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_queued_responses_in_order() {
        let model = MockLanguageModel::new(vec![
            ModelResponse::new(vec![Part::text("first")]),
            ModelResponse::new(vec![Part::text("second")]),
        ]);

        let r1 = model.generate(LanguageModelInput::default()).await.unwrap();
        let r2 = model.generate(LanguageModelInput::default()).await.unwrap();
        assert_eq!(r1.content, vec![Part::text("first")]);
        assert_eq!(r2.content, vec![Part::text("second")]);
        assert_eq!(model.call_count().await, 2);
    }

    #[tokio::test]
    async fn exhausted_mock_is_language_model_error() {
        let model = MockLanguageModel::new(vec![]);
        let err = model
            .generate(LanguageModelInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::LanguageModel(_)));
    }
}
