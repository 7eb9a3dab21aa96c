//! `RunState`: per-invocation append-only item log plus turn counter
//! (spec §3, §4.4).

use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::item::AgentItem;
use crate::message::Message;
use crate::part::Part;

/// The result of a completed `Run`/`RunStream` invocation (spec §6).
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// The final parts from the last model turn.
    pub content: Vec<Part>,
    /// The run's appended `AgentItem`s, in order.
    pub output: Vec<AgentItem>,
}

/// Per-invocation state: the caller-provided `input` sequence (immutable
/// for the run) and the runtime-appended `output` sequence, plus a
/// turn counter bounded by `max_turns`.
///
/// A single lock guards all mutations (spec §5: "the runtime itself
/// serializes writes to its own state with a lock on Run State
/// mutations"); `input` needs no lock since it is set once at
/// construction and never mutated.
pub struct RunState {
    max_turns: usize,
    input: Vec<AgentItem>,
    inner: Mutex<Inner>,
}

struct Inner {
    current_turn: usize,
    output: Vec<AgentItem>,
}

impl RunState {
    pub fn new(input: Vec<AgentItem>, max_turns: usize) -> Self {
        Self {
            max_turns,
            input,
            inner: Mutex::new(Inner {
                current_turn: 0,
                output: Vec::new(),
            }),
        }
    }

    /// `Items()`: the concatenation of `input` and `output`.
    pub async fn items(&self) -> Vec<AgentItem> {
        let inner = self.inner.lock().await;
        self.input
            .iter()
            .cloned()
            .chain(inner.output.iter().cloned())
            .collect()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub async fn current_turn(&self) -> usize {
        self.inner.lock().await.current_turn
    }

    /// Increments `current_turn`; fails with `MaxTurnsExceeded` once it
    /// exceeds `max_turns`.
    pub async fn turn(&self) -> Result<(), AgentError> {
        let mut inner = self.inner.lock().await;
        inner.current_turn += 1;
        if inner.current_turn > self.max_turns {
            return Err(AgentError::MaxTurnsExceeded(self.max_turns));
        }
        Ok(())
    }

    /// Appends an `AgentItem` and returns its index in `output`.
    pub async fn append_item(&self, item: AgentItem) -> usize {
        let mut inner = self.inner.lock().await;
        inner.output.push(item);
        inner.output.len() - 1
    }

    /// Appends a model response as an `AgentItem::Model` and returns the
    /// created item plus its index.
    pub async fn append_model_response(
        &self,
        response: crate::item::ModelResponse,
    ) -> (AgentItem, usize) {
        let item = AgentItem::Model(response);
        let mut inner = self.inner.lock().await;
        inner.output.push(item.clone());
        (item, inner.output.len() - 1)
    }

    /// Projects `Items()` into the LM-visible message list: `Message`
    /// items pass through, `ModelResponse` becomes an assistant
    /// `Message`, and each maximal contiguous run of `Tool` items
    /// collapses into a single `Tool` `Message` whose content is the
    /// ordered `ToolResult` parts (spec §3 invariant 4, §6).
    pub async fn get_turn_messages(&self) -> Vec<Message> {
        let inner = self.inner.lock().await;
        let mut messages = Vec::new();
        let iter = self.input.iter().chain(inner.output.iter());

        for item in iter {
            match item {
                AgentItem::Message(msg) => messages.push(msg.clone()),
                AgentItem::Model(response) => {
                    messages.push(Message::assistant(response.content.clone()));
                }
                AgentItem::Tool(tool) => {
                    let tool_part = Part::tool_result(
                        tool.tool_call_id.clone(),
                        tool.tool_name.clone(),
                        tool.output.clone(),
                        tool.is_error,
                    );
                    match messages.last_mut() {
                        Some(Message::Tool(body)) => body.content.push(tool_part),
                        _ => messages.push(Message::tool(vec![tool_part])),
                    }
                }
            }
        }

        messages
    }

    /// `CreateResponse(c)`: returns `{content: c, output: state.output}`.
    pub async fn create_response(&self, content: Vec<Part>) -> Response {
        let inner = self.inner.lock().await;
        Response {
            content,
            output: inner.output.clone(),
        }
    }
}
