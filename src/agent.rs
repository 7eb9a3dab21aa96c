//! The `Agent` facade: single-shot `Run`/`RunStream` over a short-lived
//! session, plus `CreateSession` for stateful multi-turn use (spec §6).

use std::sync::Arc;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::error::AgentError;
use crate::item::AgentItem;
use crate::model::LanguageModel;
use crate::session::{AgentOptions, RunSession};
use crate::state::Response;
use crate::stream_event::AgentStreamEvent;

/// A named, configured agent bound to a `LanguageModel`. Stateless
/// between calls to `run`/`run_stream`: each call creates a fresh
/// `RunSession`, runs it to completion, and closes it.
pub struct Agent<C> {
    name: String,
    model: Arc<dyn LanguageModel>,
    make_options: Box<dyn Fn() -> AgentOptions<C> + Send + Sync>,
}

impl<C: Send + Sync + 'static> Agent<C> {
    /// `options_factory` is invoked once per session creation so that
    /// `AgentOptions` (which holds non-`Clone` trait objects) can be
    /// rebuilt fresh for every `run`/`run_stream`/`create_session` call.
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        options_factory: impl Fn() -> AgentOptions<C> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            make_options: Box::new(options_factory),
        }
    }

    /// Creates a fresh session, runs it to completion, and guarantees
    /// `close` on every exit path (spec §6: "guarantee Close on all
    /// paths").
    pub async fn run(&self, input: Vec<AgentItem>, context: C) -> Result<Response, AgentError> {
        let session =
            RunSession::create(self.name.clone(), self.model.clone(), (self.make_options)(), context)
                .await?;
        let result = session.run(input).await;
        let close_result = session.close().await;
        match result {
            Ok(response) => close_result.map(|()| response),
            Err(err) => {
                if let Err(close_err) = close_result {
                    tracing::warn!(error = %close_err, "toolkit session close failed after a run error");
                }
                Err(err)
            }
        }
    }

    /// Streaming equivalent of [`Agent::run`]. The session is closed
    /// once the returned stream is fully drained or dropped.
    pub async fn run_stream(
        &self,
        input: Vec<AgentItem>,
        context: C,
    ) -> Result<BoxStream<'static, Result<AgentStreamEvent, AgentError>>, AgentError> {
        let session = Arc::new(
            RunSession::create(self.name.clone(), self.model.clone(), (self.make_options)(), context)
                .await?,
        );

        let stream = async_stream::try_stream! {
            let session = session;
            let mut inner = session.run_stream(input);
            let mut stream_err = None;
            while let Some(event) = inner.next().await {
                match event {
                    Ok(event) => yield event,
                    Err(err) => {
                        stream_err = Some(err);
                        break;
                    }
                }
            }
            drop(inner);
            let close_result = session.close().await;
            if let Some(err) = stream_err {
                Err(err)?;
            }
            close_result?;
        };
        Ok(Box::pin(stream))
    }

    /// Creates a long-lived session the caller drives directly and must
    /// `close` itself (spec §6: "the caller owns lifetime").
    pub async fn create_session(&self, context: C) -> Result<RunSession<C>, AgentError> {
        RunSession::create(self.name.clone(), self.model.clone(), (self.make_options)(), context).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
