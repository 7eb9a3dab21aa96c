//! A tool-augmented conversation loop around a pluggable language model.
//!
//! The core orchestrates: assembling a model request from accumulated
//! conversation state, invoking the model (once or as a stream),
//! detecting and executing tool calls in its output, and deciding
//! whether another turn is needed or the run is complete. See
//! [`agent::Agent`] for the entry point.

pub mod agent;
pub mod config;
pub mod error;
pub mod instruction;
pub mod item;
pub mod message;
pub mod model;
pub mod part;
pub mod process;
pub mod session;
pub mod state;
pub mod stream_accumulator;
pub mod stream_event;
pub mod tool;
pub mod toolkit;
pub mod tracing_support;

pub use agent::Agent;
pub use error::AgentError;
pub use instruction::Instruction;
pub use item::{AgentItem, ModelResponse, ToolItem};
pub use message::{Message, MessageBody};
pub use model::{LanguageModel, LanguageModelInput, Modality, MockLanguageModel, ToolDefinition};
pub use part::{AudioFormat, Citation, Cost, Part, Usage};
pub use session::{AgentOptions, RunSession, SamplingOptions};
pub use state::{Response, RunState};
pub use stream_accumulator::{IndexedPartDelta, ModelPartial, PartDelta, StreamAccumulator};
pub use stream_event::AgentStreamEvent;
pub use tool::{AgentTool, ToolExecutionResult};
pub use toolkit::{Toolkit, ToolkitSession};
