//! `Message`: a conversational message with a role and ordered parts
//! (spec §3).

use serde::{Deserialize, Serialize};

use crate::part::Part;

/// One conversational message. Invariant 3 (spec §3): a `User` message
/// never directly follows another `User` message within the segment
/// the runtime itself produces — callers may freely seed input that
/// violates this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User(MessageBody),
    Assistant(MessageBody),
    Tool(MessageBody),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub content: Vec<Part>,
}

impl Message {
    pub fn user(content: Vec<Part>) -> Self {
        Message::User(MessageBody { content })
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Message::user(vec![Part::text(text)])
    }

    pub fn assistant(content: Vec<Part>) -> Self {
        Message::Assistant(MessageBody { content })
    }

    pub fn tool(content: Vec<Part>) -> Self {
        Message::Tool(MessageBody { content })
    }

    pub fn content(&self) -> &[Part] {
        match self {
            Message::User(b) | Message::Assistant(b) | Message::Tool(b) => &b.content,
        }
    }

    pub fn content_mut(&mut self) -> &mut Vec<Part> {
        match self {
            Message::User(b) | Message::Assistant(b) | Message::Tool(b) => &mut b.content,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User(_))
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, Message::Tool(_))
    }
}
