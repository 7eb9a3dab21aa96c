//! `RunSession`: orchestrates init → loop(process → model-call →
//! append) → close (spec §4.1, §4.4, §4.5).

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::error::AgentError;
use crate::instruction::{join_toolkit_instructions, resolve_instructions, Instruction};
use crate::item::AgentItem;
use crate::model::{LanguageModel, LanguageModelInput, Modality, ToolDefinition};
use crate::process::{decide, ProcessEvent};
use crate::state::{Response, RunState};
use crate::stream_accumulator::StreamAccumulator;
use crate::stream_event::AgentStreamEvent;
use crate::tool::AgentTool;
use crate::toolkit::{close_sessions, open_sessions, Toolkit, ToolkitSession};
use crate::tracing_support::{model_call_span, run_span};

/// Sampling and response-shaping knobs forwarded to the language model
/// without mutation (spec §4.1, §6).
#[derive(Clone, Debug)]
pub struct SamplingOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub modalities: Vec<Modality>,
    pub audio: Option<serde_json::Value>,
    pub reasoning: Option<serde_json::Value>,
    pub response_format: Option<serde_json::Value>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: crate::config::default_temperature(None),
            top_p: None,
            top_k: None,
            presence_penalty: None,
            frequency_penalty: None,
            modalities: Vec::new(),
            audio: None,
            reasoning: None,
            response_format: None,
        }
    }
}

/// The construction-time options for an [`crate::agent::Agent`] /
/// [`RunSession`] (spec §6: `NewAgent` options).
pub struct AgentOptions<C> {
    pub instructions: Vec<Instruction<C>>,
    pub tools: Vec<Arc<dyn AgentTool<C>>>,
    pub toolkits: Vec<Arc<dyn Toolkit<C>>>,
    pub max_turns: usize,
    pub sampling: SamplingOptions,
}

impl<C> Default for AgentOptions<C> {
    fn default() -> Self {
        Self {
            instructions: Vec::new(),
            tools: Vec::new(),
            toolkits: Vec::new(),
            max_turns: crate::config::max_turns(None),
            sampling: SamplingOptions::default(),
        }
    }
}

struct Initialized<C> {
    /// The resolved static instructions (literal strings plus
    /// context-resolvers), joined once at session creation. Toolkit
    /// instruction fragments are deliberately NOT folded in here — they
    /// are re-read from `toolkit_sessions` and rejoined on every turn
    /// (spec §4.1, §4.7).
    static_prompt: Option<String>,
    toolkit_sessions: Vec<Box<dyn ToolkitSession<C>>>,
}

/// A live session bound to one caller context `C` for its entire life
/// (spec §3 "Lifetimes"). Created via [`RunSession::create`]; must be
/// [`RunSession::close`]d exactly once.
pub struct RunSession<C> {
    name: String,
    model: Arc<dyn LanguageModel>,
    static_tools: Vec<Arc<dyn AgentTool<C>>>,
    max_turns: usize,
    sampling: SamplingOptions,
    context: C,
    state: Mutex<Option<Initialized<C>>>,
}

impl<C: Send + Sync + 'static> RunSession<C> {
    /// Resolves instructions, opens every toolkit session concurrently,
    /// and rolls back (best-effort closes of any sessions that did open)
    /// if any fails (spec §4.1).
    pub async fn create(
        name: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        options: AgentOptions<C>,
        context: C,
    ) -> Result<Self, AgentError> {
        let toolkit_sessions = match open_sessions(&options.toolkits, &context).await {
            Ok(sessions) => sessions,
            Err(err) => return Err(err),
        };

        let static_prompt = resolve_instructions(&options.instructions, Vec::new(), &context).await;

        Ok(Self {
            name: name.into(),
            model,
            static_tools: options.tools,
            max_turns: options.max_turns,
            sampling: options.sampling,
            context,
            state: Mutex::new(Some(Initialized {
                static_prompt,
                toolkit_sessions,
            })),
        })
    }

    /// Idempotent. Closes all toolkit sessions concurrently (best-effort:
    /// every close is attempted even if an earlier one failed) and marks
    /// the session uninitialized. Subsequent `run`/`run_stream` calls
    /// fail with `Invariant`.
    pub async fn close(&self) -> Result<(), AgentError> {
        let initialized = self.state.lock().await.take();
        match initialized {
            Some(init) => close_sessions(&init.toolkit_sessions).await,
            None => Ok(()),
        }
    }

    fn active_tools(&self, toolkit_sessions: &[Box<dyn ToolkitSession<C>>]) -> Vec<Arc<dyn AgentTool<C>>> {
        let mut tools = self.static_tools.clone();
        for session in toolkit_sessions {
            tools.extend(session.tools());
        }
        tools
    }

    /// `TurnParams`: recomputes the resolved system prompt and active
    /// tool set from the live toolkit sessions (spec §4.1: "on each LM
    /// call, the session computes `(input, tools)`"; §4.7: toolkit tool
    /// lists and prompt fragments may change across turns, so both are
    /// re-read here rather than cached once at `create`). Called once
    /// per model call, not once per loop wakeup — the caller carries the
    /// returned `tools` forward to the next iteration's `process` call
    /// per spec §4.4's loop pseudocode.
    async fn turn_context(&self) -> Result<(Option<String>, Vec<Arc<dyn AgentTool<C>>>), AgentError> {
        let guard = self.state.lock().await;
        let init = guard
            .as_ref()
            .ok_or_else(|| AgentError::invariant("session is closed"))?;
        let toolkit_instructions = init
            .toolkit_sessions
            .iter()
            .flat_map(|s| s.instructions())
            .collect();
        let system_prompt = join_toolkit_instructions(&init.static_prompt, toolkit_instructions);
        Ok((system_prompt, self.active_tools(&init.toolkit_sessions)))
    }

    fn turn_params(
        &self,
        system_prompt: &Option<String>,
        messages: Vec<crate::message::Message>,
        tools: &[Arc<dyn AgentTool<C>>],
    ) -> LanguageModelInput {
        LanguageModelInput {
            system_prompt: system_prompt.clone(),
            messages,
            tools: tools
                .iter()
                .map(|t| ToolDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters(),
                })
                .collect(),
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            top_k: self.sampling.top_k,
            presence_penalty: self.sampling.presence_penalty,
            frequency_penalty: self.sampling.frequency_penalty,
            max_tokens: None,
            response_format: self.sampling.response_format.clone(),
            modalities: self.sampling.modalities.clone(),
            audio: self.sampling.audio.clone(),
            reasoning: self.sampling.reasoning.clone(),
        }
    }

    /// Non-streaming run loop (spec §4.4).
    pub async fn run(&self, input: Vec<AgentItem>) -> Result<Response, AgentError> {
        let span = run_span(&self.name, self.max_turns);
        self.run_inner(input).instrument(span).await
    }

    async fn run_inner(&self, input: Vec<AgentItem>) -> Result<Response, AgentError> {
        let state = RunState::new(input, self.max_turns);
        // `tools ← union(static_tools, toolkit tools)` (spec §4.4): the
        // initial snapshot, before any `TurnParams` call.
        let (_, mut tools) = self.turn_context().await?;

        loop {
            let mut events = decide(&state, &tools, &self.context);
            let mut next_requested = false;
            while let Some(event) = events.next().await {
                match event? {
                    ProcessEvent::Response(content) => {
                        return Ok(state.create_response(content).await);
                    }
                    ProcessEvent::Item(item) => {
                        state.append_item(item.into()).await;
                    }
                    ProcessEvent::Next => {
                        next_requested = true;
                        break;
                    }
                }
            }
            drop(events);
            if !next_requested {
                return Err(AgentError::invariant(
                    "next-step decider stream ended without a decision",
                ));
            }

            state.turn().await?;
            let messages = state.get_turn_messages().await;
            let turn = state.current_turn().await;
            // `(input, tools) ← session.TurnParams(state)`: recomputed
            // fresh for this LM call, then carried into the next
            // iteration's `process(state, tools)` above.
            let (system_prompt, turn_tools) = self.turn_context().await?;
            tools = turn_tools;
            let model_input = self.turn_params(&system_prompt, messages, &tools);
            let span = model_call_span(&self.name, turn);
            let response = self
                .model
                .generate(model_input)
                .instrument(span)
                .await?;
            state.append_model_response(response).await;
        }
    }

    /// Streaming run loop (spec §4.5). The returned stream yields
    /// `Partial`, `Item`, and exactly one terminal `Response` event.
    pub fn run_stream<'a>(
        &'a self,
        input: Vec<AgentItem>,
    ) -> BoxStream<'a, Result<AgentStreamEvent, AgentError>> {
        Box::pin(try_stream! {
            let state = RunState::new(input, self.max_turns);
            let (_, mut tools) = self.turn_context().await?;

            loop {
                let mut events = decide(&state, &tools, &self.context);
                let mut next_requested = false;
                let mut terminal_response = None;
                while let Some(event) = events.next().await {
                    match event? {
                        ProcessEvent::Response(content) => {
                            terminal_response = Some(content);
                            break;
                        }
                        ProcessEvent::Item(item) => {
                            let index = state.append_item(item.clone().into()).await;
                            yield AgentStreamEvent::Item { index, item: item.into() };
                        }
                        ProcessEvent::Next => {
                            next_requested = true;
                            break;
                        }
                    }
                }
                drop(events);

                if let Some(content) = terminal_response {
                    let response = state.create_response(content).await;
                    yield AgentStreamEvent::Response {
                        content: response.content,
                        output: response.output,
                    };
                    return;
                }
                if !next_requested {
                    Err(AgentError::invariant(
                        "next-step decider stream ended without a decision",
                    ))?;
                }

                state.turn().await?;
                let messages = state.get_turn_messages().await;
                let turn = state.current_turn().await;
                let (system_prompt, turn_tools) = self.turn_context().await?;
                tools = turn_tools;
                let model_input = self.turn_params(&system_prompt, messages, &tools);
                let span = model_call_span(&self.name, turn);

                let mut partials = self.model.stream(model_input).instrument(span).await?;
                let mut accumulator = StreamAccumulator::new();
                while let Some(partial) = partials.next().await {
                    let partial = partial?;
                    accumulator.add_partial(partial.clone())?;
                    yield AgentStreamEvent::Partial(partial);
                }
                let response = accumulator.compute_response()?;
                let index = state.append_item(response.clone().into()).await;
                yield AgentStreamEvent::Item { index, item: response.into() };
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
