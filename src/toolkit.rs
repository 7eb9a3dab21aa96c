//! Toolkits: caller-supplied providers of dynamic, per-run tools and
//! instructions (spec §9, "Toolkit").

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::AgentError;
use crate::tool::AgentTool;

/// A long-lived provider of tools/instructions, independent of any one
/// run. A `Toolkit` opens one [`ToolkitSession`] per `RunSession`
/// (spec §9: "sessions are created fresh per run and closed at its
/// end").
#[async_trait]
pub trait Toolkit<C>: Send + Sync {
    async fn create_session(
        &self,
        context: &C,
    ) -> Result<Box<dyn ToolkitSession<C>>, Box<dyn std::error::Error + Send + Sync>>;
}

/// The per-run handle returned by a [`Toolkit`]. Supplies the tools and
/// instruction strings available for the lifetime of one `RunSession`,
/// and is closed when that session ends.
#[async_trait]
pub trait ToolkitSession<C>: Send + Sync {
    fn tools(&self) -> Vec<Arc<dyn AgentTool<C>>>;

    /// Additional instruction text contributed by this session, if any
    /// (spec §9: toolkits may contribute to the resolved instructions
    /// the same way static strings and context resolvers do).
    fn instructions(&self) -> Vec<String> {
        Vec::new()
    }

    async fn close(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Opens every toolkit session concurrently (spec §4.1: "Creates every
/// ToolkitSession concurrently"). If any fails, every session that did
/// open is closed best-effort before returning `AgentError::Init`
/// (spec §4.1: "aborts initialization, closes any already-created
/// toolkit sessions").
pub async fn open_sessions<C: Send + Sync>(
    toolkits: &[Arc<dyn Toolkit<C>>],
    context: &C,
) -> Result<Vec<Box<dyn ToolkitSession<C>>>, AgentError> {
    let results = join_all(toolkits.iter().map(|tk| tk.create_session(context))).await;

    let mut sessions = Vec::with_capacity(results.len());
    let mut first_err = None;
    for result in results {
        match result {
            Ok(session) => sessions.push(session),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }

    if let Some(err) = first_err {
        let _ = close_sessions(&sessions).await;
        return Err(AgentError::init_boxed(err));
    }

    Ok(sessions)
}

/// Closes every session concurrently. Individual close failures are
/// collected but do not stop other sessions from closing; the first
/// error (if any) is returned after all have been attempted.
pub async fn close_sessions<C: Send + Sync>(
    sessions: &[Box<dyn ToolkitSession<C>>],
) -> Result<(), AgentError> {
    let results = join_all(sessions.iter().map(|s| s.close())).await;
    for result in results {
        result.map_err(AgentError::init_boxed)?;
    }
    Ok(())
}
