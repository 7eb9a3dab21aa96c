//! The next-step decider (spec §4.2): inspects the tail of `RunState`
//! and decides whether to invoke tools, emit a `Response`, or ask the
//! caller to run another model turn.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::stream::BoxStream;

use crate::error::AgentError;
use crate::item::{AgentItem, ToolItem};
use crate::message::Message;
use crate::part::Part;
use crate::state::RunState;
use crate::tool::{find_tool, invoke_tool, AgentTool};

/// One yielded decision from [`decide`].
pub enum ProcessEvent {
    /// A tool call was invoked; the caller should append this to state
    /// and keep decoding (there may be more tool calls in this turn).
    Item(ToolItem),
    /// The tail content had no further tool calls: this is the run's
    /// final output.
    Response(Vec<Part>),
    /// No decision could be made from existing state alone; the caller
    /// must run another model turn and append its `ModelResponse`.
    Next,
}

/// Walks `state`'s item tail and decides the next action, per the seven
/// steps of spec §4.2. Tool calls already answered by a prior tool
/// result (`processed`) are skipped; any tool call name without a
/// matching entry in `tools` is an invariant violation.
pub fn decide<'a, C>(
    state: &'a RunState,
    tools: &'a [Arc<dyn AgentTool<C>>],
    context: &'a C,
) -> BoxStream<'a, Result<ProcessEvent, AgentError>>
where
    C: Send + Sync,
{
    Box::pin(try_stream! {
        let items = state.items().await;
        let tail = items
            .last()
            .ok_or_else(|| AgentError::invariant("run state has no items"))?;

        let (content, mut processed): (Vec<Part>, std::collections::HashSet<String>) = match tail {
            // Step 2: tail is a user message — nothing to decide yet, run
            // the model.
            AgentItem::Message(Message::User(_)) => {
                yield ProcessEvent::Next;
                return;
            }

            // Tail is a model turn or an assistant message recorded
            // directly: its content is the content to inspect.
            AgentItem::Model(_) | AgentItem::Message(Message::Assistant(_)) => {
                (tail.assistant_content().unwrap().to_vec(), Default::default())
            }

            // Tail is a collapsed tool-result message: gather the ids it
            // already answers, then resolve content from the assistant
            // item immediately preceding it.
            AgentItem::Message(Message::Tool(body)) => {
                let mut processed = std::collections::HashSet::new();
                for part in &body.content {
                    if let Some(id) = part.tool_call_id() {
                        processed.insert(id.to_string());
                    }
                }
                let prev = items
                    .len()
                    .checked_sub(2)
                    .and_then(|i| items.get(i))
                    .and_then(|i| i.assistant_content())
                    .ok_or_else(|| {
                        AgentError::invariant(
                            "tool message not preceded by an assistant-produced item",
                        )
                    })?;
                (prev.to_vec(), processed)
            }

            // Tail is a bare Tool item: walk backwards collecting ids
            // answered by Tool items/tool-result messages until the
            // most recent assistant-produced content is found.
            AgentItem::Tool(_) => {
                let mut processed = std::collections::HashSet::new();
                let mut content: Option<Vec<Part>> = None;
                for item in items.iter().rev() {
                    match item {
                        AgentItem::Tool(t) => {
                            processed.insert(t.tool_call_id.clone());
                        }
                        AgentItem::Message(Message::Tool(body)) => {
                            for part in &body.content {
                                if let Some(id) = part.tool_call_id() {
                                    processed.insert(id.to_string());
                                }
                            }
                        }
                        AgentItem::Message(Message::User(_)) => {
                            Err(AgentError::invariant(
                                "tool item not preceded by an assistant-produced item",
                            ))?;
                        }
                        other => {
                            content = other.assistant_content().map(|c| c.to_vec());
                            break;
                        }
                    }
                }
                let content = content.ok_or_else(|| {
                    AgentError::invariant("tool item not preceded by an assistant-produced item")
                })?;
                (content, processed)
            }
        };

        if content.is_empty() {
            Err(AgentError::invariant("assistant-produced content is empty"))?;
        }

        let tool_calls: Vec<_> = content
            .iter()
            .filter_map(|p| match p {
                Part::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect();

        if tool_calls.is_empty() {
            yield ProcessEvent::Response(content);
            return;
        }

        for tc in tool_calls {
            if processed.contains(&tc.tool_call_id) {
                continue;
            }
            processed.insert(tc.tool_call_id.clone());

            let tool = find_tool(tools, &tc.tool_name)?;
            let item = invoke_tool(tool.as_ref(), tc, context, state).await?;
            yield ProcessEvent::Item(item);
        }

        yield ProcessEvent::Next;
    })
}
