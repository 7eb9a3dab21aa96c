//! Instruction resolution: static strings plus context-resolved
//! strings, joined with `"\n"` and filtered of empties (spec §9).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// One source of system-prompt text: either a literal string known up
/// front, or a function of the run's context resolved at session
/// creation time.
#[derive(Clone)]
pub enum Instruction<C> {
    Literal(String),
    Resolver(Arc<dyn Fn(&C) -> BoxFuture<'static, String> + Send + Sync>),
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

impl<C> Instruction<C> {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn resolver<F, Fut>(f: F) -> Self
    where
        F: Fn(&C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        Self::Resolver(Arc::new(move |c| Box::pin(f(c))))
    }

    async fn resolve(&self, context: &C) -> String {
        match self {
            Instruction::Literal(text) => text.clone(),
            Instruction::Resolver(f) => f(context).await,
        }
    }
}

/// Resolves every instruction source (static strings, context
/// resolvers, and additional strings contributed by toolkit sessions)
/// against `context`, drops empty results, and joins the rest with
/// `"\n"`.
pub async fn resolve_instructions<C: Sync>(
    instructions: &[Instruction<C>],
    toolkit_instructions: Vec<String>,
    context: &C,
) -> Option<String> {
    let mut resolved = Vec::with_capacity(instructions.len() + toolkit_instructions.len());
    for instruction in instructions {
        resolved.push(instruction.resolve(context).await);
    }
    resolved.extend(toolkit_instructions);

    let joined = resolved
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Joins an already-resolved static prompt with freshly read toolkit
/// instruction fragments, using the same empty-filtering/`"\n"`-join
/// rule as [`resolve_instructions`]. The static prompt is resolved once
/// at session creation; toolkit fragments are re-read every turn (spec
/// §4.7: a `ToolkitSession`'s prompt contribution may change across
/// turns), so the two are joined fresh on each call rather than cached
/// together.
pub fn join_toolkit_instructions(
    static_prompt: &Option<String>,
    toolkit_instructions: Vec<String>,
) -> Option<String> {
    let mut parts: Vec<String> = static_prompt.iter().cloned().collect();
    parts.extend(toolkit_instructions.into_iter().filter(|s| !s.is_empty()));

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}
