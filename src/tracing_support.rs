//! Span helpers for the two top-level operations the runtime traces
//! (spec §7: `agent.run`, `agent.model_call`; `agent.tool_call` lives
//! alongside the invoker in `tool.rs`, where the fields it needs are
//! already in scope).

use tracing::Span;

/// Opens the span wrapping one `RunSession::run`/`run_stream` call.
pub fn run_span(name: &str, max_turns: usize) -> Span {
    tracing::info_span!(
        "agent.run",
        agent.name = %name,
        agent.max_turns = max_turns,
        otel.kind = "run",
    )
}

/// Opens the span wrapping one `LanguageModel::generate`/`stream` call
/// within a turn.
pub fn model_call_span(name: &str, turn: usize) -> Span {
    tracing::info_span!("agent.model_call", agent.name = %name, turn = turn)
}
