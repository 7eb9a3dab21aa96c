//! Error taxonomy shared by every other component (spec §8).

use std::fmt;

/// The single error type returned across the public surface of this crate.
///
/// Each variant corresponds to one row of the error taxonomy table: who
/// raises it and what recovery is expected. Tool and toolkit errors are
/// boxed at the point they cross into the runtime; this type never
/// downcasts them back.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Instruction resolution or toolkit-session creation failed during
    /// `RunSession::create`. Non-recoverable: the caller must create a new
    /// session.
    #[error("agent init failed: {0}")]
    Init(#[source] BoxError),

    /// The underlying language model's `generate`/`stream` call failed.
    /// The run aborts mid-turn and accumulated state is discarded.
    #[error("language model call failed: {0}")]
    LanguageModel(#[source] BoxError),

    /// A tool's execute function raised rather than returning an
    /// `is_error` result. The run aborts.
    #[error("tool execution failed: {0}")]
    ToolExecution(#[source] BoxError),

    /// An internal consistency violation: a referenced tool was not
    /// found, the model stream was malformed, a turn's content was
    /// unexpectedly empty, or the `RunState` tail had no preceding
    /// assistant-produced content.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// `RunState::turn` was called after `current_turn` had already
    /// reached `max_turns`.
    #[error("exceeded max turns ({0})")]
    MaxTurnsExceeded(usize),
}

impl AgentError {
    /// Builds an [`AgentError::Invariant`] from a `format!`-style message.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Wraps any boxable error as [`AgentError::Init`].
    pub fn init(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Init(BoxError(Box::new(err)))
    }

    /// Wraps any boxable error as [`AgentError::LanguageModel`].
    pub fn language_model(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::LanguageModel(BoxError(Box::new(err)))
    }

    /// Wraps any boxable error as [`AgentError::ToolExecution`].
    pub fn tool_execution(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ToolExecution(BoxError(Box::new(err)))
    }

    /// Wraps an already-boxed error (as returned by a tool's `execute`)
    /// as [`AgentError::ToolExecution`].
    pub fn tool_execution_boxed(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::ToolExecution(BoxError(err))
    }

    /// Wraps an already-boxed error (as returned by a toolkit's
    /// `create_session`) as [`AgentError::Init`].
    pub fn init_boxed(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Init(BoxError(err))
    }
}

/// A type-erased `source()`-preserving wrapper so `AgentError` can carry
/// arbitrary collaborator errors (init, model, tool) without becoming
/// generic over their concrete types.
pub struct BoxError(Box<dyn std::error::Error + Send + Sync>);

impl fmt::Debug for BoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for BoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for BoxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn invariant_carries_message() {
        let err = AgentError::invariant(format!("tool {} not found", "search"));
        assert_eq!(err.to_string(), "invariant violated: tool search not found");
    }

    #[test]
    fn wrapped_errors_preserve_display() {
        let err = AgentError::tool_execution(Boom);
        assert_eq!(err.to_string(), "tool execution failed: boom");
    }

    #[test]
    fn max_turns_exceeded_carries_limit() {
        let err = AgentError::MaxTurnsExceeded(10);
        assert_eq!(err.to_string(), "exceeded max turns (10)");
    }
}
