//! `Part`: one piece of message content (spec §3, Glossary).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage for one model generation. Accumulates additively across
/// stream partials (spec §4.6).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

/// Cost estimate for one model generation, accumulated the same way as
/// [`Usage`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl std::ops::Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost {
            input_cost: self.input_cost + rhs.input_cost,
            output_cost: self.output_cost + rhs.output_cost,
            total_cost: self.total_cost + rhs.total_cost,
        }
    }
}

/// A citation attached to a [`Part::Text`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source: Option<String>,
    pub text: Option<String>,
}

/// A single piece of message content. Mirrors the tagged union in spec
/// §3: at minimum Text, ToolCall, ToolResult; the Glossary additionally
/// lists Image, Audio, Reasoning, Source, all merged by the Stream
/// Accumulator (spec §4.6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text(TextPart),
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
    Image(ImagePart),
    Audio(AudioPart),
    Reasoning(ReasoningPart),
    Source(SourcePart),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart {
            text: text.into(),
            citations: Vec::new(),
        })
    }

    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Part::ToolCall(ToolCallPart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
            id: None,
        })
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: Vec<Part>,
        is_error: bool,
    ) -> Self {
        Part::ToolResult(ToolResultPart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content,
            is_error,
        })
    }

    /// The tool_call_id carried by this part, if it is a ToolCall or
    /// ToolResult.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Part::ToolCall(p) => Some(&p.tool_call_id),
            Part::ToolResult(p) => Some(&p.tool_call_id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: Value,
    /// Provider-assigned id distinct from `tool_call_id`, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: Vec<Part>,
    pub is_error: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePart {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    #[default]
    Linear16,
    Other(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioPart {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub format: Option<AudioFormat>,
    pub transcript: Option<String>,
    pub id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPart {
    pub text: String,
    pub signature: Option<String>,
    pub id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePart {
    pub text: String,
    pub source: Option<String>,
    pub id: Option<String>,
}
