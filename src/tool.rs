//! `AgentTool` and the tool invoker (spec §4.3).

use async_trait::async_trait;
use serde_json::Value;
use tracing::Instrument;

use crate::error::AgentError;
use crate::item::ToolItem;
use crate::part::{Part, ToolCallPart};
use crate::state::RunState;

/// The result of a tool's `execute`: content parts plus whether they
/// represent an error. This is the "tool-returned is_error=true" channel
/// (spec §4.3) — distinct from the tool raising, which is the other
/// channel and aborts the run.
#[derive(Clone, Debug, Default)]
pub struct ToolExecutionResult {
    pub content: Vec<Part>,
    pub is_error: bool,
}

impl ToolExecutionResult {
    pub fn ok(content: Vec<Part>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn error(content: Vec<Part>) -> Self {
        Self {
            content,
            is_error: true,
        }
    }
}

/// A single tool that can be called by the model.
///
/// Generic over the caller-provided context type `C` (spec §9: "Generics
/// over caller context"), shared with instruction resolvers.
#[async_trait]
pub trait AgentTool<C>: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema object describing the tool's arguments.
    fn parameters(&self) -> Value;

    /// Executes the tool. Returning `Err` is the "tool raises" failure
    /// channel (§4.3): the run aborts with `AgentError::ToolExecution`.
    /// Returning `Ok` with `is_error: true` is accepted normally — the
    /// model sees the error content on its next turn and may recover.
    async fn execute(
        &self,
        args: Value,
        context: &C,
        run_state: &RunState,
    ) -> Result<ToolExecutionResult, Box<dyn std::error::Error + Send + Sync>>;
}

/// Locates `tool_call` by name in `tools`, invokes it inside a tracing
/// span tagged `{tool.call.id, tool.name, tool.description}`, and wraps
/// the two failure channels per spec §4.3.
pub async fn invoke_tool<C: Send + Sync>(
    tool: &(dyn AgentTool<C> + '_),
    tool_call: &ToolCallPart,
    context: &C,
    run_state: &RunState,
) -> Result<ToolItem, AgentError> {
    let span = tracing::info_span!(
        "agent.tool_call",
        tool.call.id = %tool_call.tool_call_id,
        tool.name = %tool.name(),
        tool.description = %tool.description(),
        error = tracing::field::Empty,
    );

    async move {
        match tool.execute(tool_call.args.clone(), context, run_state).await {
            Ok(result) => Ok(ToolItem {
                tool_call_id: tool_call.tool_call_id.clone(),
                tool_name: tool_call.tool_name.clone(),
                input: tool_call.args.clone(),
                output: result.content,
                is_error: result.is_error,
            }),
            Err(err) => {
                tracing::Span::current().record("error", tracing::field::display(&err));
                Err(AgentError::tool_execution_boxed(err))
            }
        }
    }
    .instrument(span)
    .await
}

/// Finds an `AgentTool` by name in the active tool set (§4.2 step 6:
/// "Invariant if absent").
pub fn find_tool<'a, C>(
    tools: &'a [std::sync::Arc<dyn AgentTool<C>>],
    name: &str,
) -> Result<&'a std::sync::Arc<dyn AgentTool<C>>, AgentError> {
    tools
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| AgentError::invariant(format!("tool {name} not found for tool call")))
}
