//! `AgentItem`: one unit of the append-only conversation log (spec §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::part::{Cost, Part, Usage};

/// One LM generation: its parts plus optional usage/cost metadata.
/// Semantically equivalent to an assistant [`Message`] for prompt
/// reconstruction (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Cost>,
}

impl ModelResponse {
    pub fn new(content: Vec<Part>) -> Self {
        Self {
            content,
            usage: None,
            cost: None,
        }
    }
}

/// One concrete tool-call result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolItem {
    pub tool_call_id: String,
    pub tool_name: String,
    /// The original args the model supplied for this call.
    pub input: Value,
    pub output: Vec<Part>,
    pub is_error: bool,
}

/// One unit of the append-only conversation log. Exactly one of three
/// shapes (spec §3 invariant 1: items are append-only within a run;
/// earlier items are never rewritten).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentItem {
    Message(Message),
    Model(ModelResponse),
    Tool(ToolItem),
}

impl AgentItem {
    /// The Parts this item contributes to "the latest assistant-produced
    /// content", when it is a Model or Assistant-Message item.
    pub fn assistant_content(&self) -> Option<&[Part]> {
        match self {
            AgentItem::Model(m) => Some(&m.content),
            AgentItem::Message(Message::Assistant(b)) => Some(&b.content),
            _ => None,
        }
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, AgentItem::Tool(_))
    }

    pub fn as_tool_message(&self) -> Option<&Message> {
        match self {
            AgentItem::Message(m @ Message::Tool(_)) => Some(m),
            _ => None,
        }
    }
}

impl From<Message> for AgentItem {
    fn from(m: Message) -> Self {
        AgentItem::Message(m)
    }
}

impl From<ModelResponse> for AgentItem {
    fn from(m: ModelResponse) -> Self {
        AgentItem::Model(m)
    }
}

impl From<ToolItem> for AgentItem {
    fn from(t: ToolItem) -> Self {
        AgentItem::Tool(t)
    }
}
