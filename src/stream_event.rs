//! `AgentStreamEvent`: the tagged union yielded by `RunSession::run_stream`
//! (spec §4.5).

use crate::item::AgentItem;
use crate::part::Part;
use crate::stream_accumulator::ModelPartial;

/// One event in a streamed run. Ordering guarantees (spec §4.5):
/// every `Partial` for a model turn precedes the `Item`s produced by
/// that turn's decisions, and exactly one `Response` is yielded, last.
#[derive(Clone, Debug)]
pub enum AgentStreamEvent {
    /// Forwarded verbatim from the `LanguageModel`'s stream.
    Partial(ModelPartial),
    /// An `AgentItem` was appended to the run's state (a `ToolItem` or
    /// a finalized `ModelResponse`).
    Item { index: usize, item: AgentItem },
    /// The run's terminal output. Always the last event.
    Response {
        content: Vec<Part>,
        output: Vec<AgentItem>,
    },
}
