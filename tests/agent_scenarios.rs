//! End-to-end scenarios mirrored from the concrete test table: plain
//! text, single and parallel tool calls, max-turns, a raising tool,
//! streaming text, and instruction composition.


use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};

use skein::{
    Agent, AgentError, AgentItem, AgentOptions, AgentStreamEvent, AgentTool, Instruction, Message,
    MockLanguageModel, ModelResponse, Part, RunState, ToolExecutionResult,
};

struct EchoArgsTool {
    name: &'static str,
}

#[async_trait]
impl AgentTool<()> for EchoArgsTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "echoes its input back as text"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(
        &self,
        _args: Value,
        _context: &(),
        _state: &RunState,
    ) -> Result<ToolExecutionResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ToolExecutionResult::ok(vec![Part::text("Tool result")]))
    }
}

struct FailingTool;

#[async_trait]
impl AgentTool<()> for FailingTool {
    fn name(&self) -> &str {
        "failing_tool"
    }
    fn description(&self) -> &str {
        "always raises"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(
        &self,
        _args: Value,
        _context: &(),
        _state: &RunState,
    ) -> Result<ToolExecutionResult, Box<dyn std::error::Error + Send + Sync>> {
        Err("Tool execution failed".into())
    }
}

#[tokio::test]
async fn s1_plain_text() {
    let agent = Agent::new(
        "greeter",
        Arc::new(MockLanguageModel::text("Hi!")),
        AgentOptions::default,
    );
    let response = agent
        .run(vec![Message::user_text("Hello!").into()], ())
        .await
        .unwrap();

    assert_eq!(response.content, vec![Part::text("Hi!")]);
    assert_eq!(response.output.len(), 1);
    assert!(matches!(&response.output[0], AgentItem::Model(m) if m.content == vec![Part::text("Hi!")]));
}

#[tokio::test]
async fn s2_single_tool_call() {
    let model = MockLanguageModel::new(vec![
        ModelResponse::new(vec![Part::tool_call(
            "call_1",
            "test_tool",
            json!({"param": "value"}),
        )]),
        ModelResponse::new(vec![Part::text("Final response")]),
    ]);
    let agent = Agent::new(
        "worker",
        Arc::new(model),
        || AgentOptions {
            tools: vec![Arc::new(EchoArgsTool { name: "test_tool" })],
            ..AgentOptions::default()
        },
    );

    let response = agent
        .run(vec![Message::user_text("Use the tool").into()], ())
        .await
        .unwrap();

    assert_eq!(response.content, vec![Part::text("Final response")]);
    assert_eq!(response.output.len(), 3);
    assert!(matches!(response.output[0], AgentItem::Model(_)));
    match &response.output[1] {
        AgentItem::Tool(t) => assert_eq!(t.tool_call_id, "call_1"),
        other => panic!("expected Tool item, got {other:?}"),
    }
    assert!(matches!(response.output[2], AgentItem::Model(_)));
}

#[tokio::test]
async fn s3_parallel_tool_calls_in_one_turn() {
    let model = MockLanguageModel::new(vec![
        ModelResponse::new(vec![
            Part::tool_call("call_1", "tool_a", json!({})),
            Part::tool_call("call_2", "tool_b", json!({})),
        ]),
        ModelResponse::new(vec![Part::text("done")]),
    ]);
    let agent = Agent::new(
        "worker",
        Arc::new(model),
        || AgentOptions {
            tools: vec![
                Arc::new(EchoArgsTool { name: "tool_a" }),
                Arc::new(EchoArgsTool { name: "tool_b" }),
            ],
            ..AgentOptions::default()
        },
    );

    let response = agent
        .run(vec![Message::user_text("go").into()], ())
        .await
        .unwrap();

    assert_eq!(response.output.len(), 4);
    let tool_items: Vec<_> = response
        .output
        .iter()
        .filter_map(|item| match item {
            AgentItem::Tool(t) => Some(t.tool_call_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(tool_items, vec!["call_1", "call_2"]);
}

#[tokio::test]
async fn s4_max_turns_exceeded_before_third_generate() {
    let make_call = |id: &str| ModelResponse::new(vec![Part::tool_call(id, "loop_tool", json!({}))]);
    let model = MockLanguageModel::new(vec![make_call("call_1"), make_call("call_2"), make_call("call_3")]);

    let agent = Agent::new(
        "looper",
        Arc::new(model),
        || AgentOptions {
            tools: vec![Arc::new(EchoArgsTool { name: "loop_tool" })],
            max_turns: 2,
            ..AgentOptions::default()
        },
    );

    let err = agent
        .run(vec![Message::user_text("go").into()], ())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::MaxTurnsExceeded(2)));
}

#[tokio::test]
async fn s5_tool_raises() {
    let model = MockLanguageModel::new(vec![ModelResponse::new(vec![Part::tool_call(
        "call_1",
        "failing_tool",
        json!({}),
    )])]);
    let agent = Agent::new(
        "worker",
        Arc::new(model),
        || AgentOptions {
            tools: vec![Arc::new(FailingTool)],
            ..AgentOptions::default()
        },
    );

    let err = agent
        .run(vec![Message::user_text("go").into()], ())
        .await
        .unwrap_err();
    match err {
        AgentError::ToolExecution(_) => {
            assert_eq!(err.to_string(), "tool execution failed: Tool execution failed");
        }
        other => panic!("expected ToolExecution, got {other:?}"),
    }
}

#[tokio::test]
async fn s6_streaming_text() {
    use skein::{IndexedPartDelta, ModelPartial, PartDelta};

    struct ChunkedModel;
    #[async_trait]
    impl skein::LanguageModel for ChunkedModel {
        async fn generate(
            &self,
            _input: skein::LanguageModelInput,
        ) -> Result<ModelResponse, AgentError> {
            unreachable!("this test only exercises stream()")
        }

        async fn stream(
            &self,
            _input: skein::LanguageModelInput,
        ) -> Result<
            futures_util::stream::BoxStream<'static, Result<ModelPartial, AgentError>>,
            AgentError,
        > {
            let chunks = ["Hel", "lo", "!"];
            let partials = chunks
                .into_iter()
                .map(|chunk| {
                    Ok(ModelPartial {
                        part: Some(IndexedPartDelta {
                            index: 0,
                            delta: PartDelta::Text {
                                text: chunk.to_string(),
                                citation: None,
                            },
                        }),
                        usage: None,
                        cost: None,
                    })
                })
                .collect::<Vec<_>>();
            Ok(Box::pin(futures_util::stream::iter(partials)))
        }
    }

    let agent = Agent::new("streamer", Arc::new(ChunkedModel), AgentOptions::default);
    let mut stream = agent
        .run_stream(vec![Message::user_text("hi").into()], ())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }

    let partial_count = events
        .iter()
        .filter(|e| matches!(e, AgentStreamEvent::Partial(_)))
        .count();
    assert_eq!(partial_count, 3);

    let item_content = events.iter().find_map(|e| match e {
        AgentStreamEvent::Item {
            item: AgentItem::Model(m),
            ..
        } => Some(m.content.clone()),
        _ => None,
    });
    assert_eq!(item_content, Some(vec![Part::text("Hello!")]));

    match events.last().unwrap() {
        AgentStreamEvent::Response { content, .. } => {
            assert_eq!(content, &vec![Part::text("Hello!")]);
        }
        other => panic!("expected Response as final event, got {other:?}"),
    }
}

#[tokio::test]
async fn s7_instructions_composition() {
    struct RoleContext {
        role: String,
    }

    let captured_prompt = Arc::new(tokio::sync::Mutex::new(None));
    struct CapturingModel {
        captured: Arc<tokio::sync::Mutex<Option<Option<String>>>>,
    }

    #[async_trait]
    impl skein::LanguageModel for CapturingModel {
        async fn generate(
            &self,
            input: skein::LanguageModelInput,
        ) -> Result<ModelResponse, AgentError> {
            *self.captured.lock().await = Some(input.system_prompt);
            Ok(ModelResponse::new(vec![Part::text("ok")]))
        }
    }

    let agent = Agent::new(
        "briefed",
        Arc::new(CapturingModel {
            captured: captured_prompt.clone(),
        }),
        move || AgentOptions {
            instructions: vec![
                Instruction::literal("A"),
                Instruction::resolver(|ctx: &RoleContext| {
                    let role = ctx.role.clone();
                    async move { format!("The user is a {role}.") }
                }),
                Instruction::literal("C"),
            ],
            ..AgentOptions::default()
        },
    );

    agent
        .run(
            vec![Message::user_text("hi").into()],
            RoleContext {
                role: "developer".to_string(),
            },
        )
        .await
        .unwrap();

    let prompt = captured_prompt.lock().await.clone().unwrap();
    assert_eq!(prompt, Some("A\nThe user is a developer.\nC".to_string()));
}

#[tokio::test]
async fn property_idempotent_tool_skipping_does_not_reinvoke() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AgentTool<()> for CountingTool {
        fn name(&self) -> &str {
            "counted"
        }
        fn description(&self) -> &str {
            "counts invocations"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            _args: Value,
            _context: &(),
            _state: &RunState,
        ) -> Result<ToolExecutionResult, Box<dyn std::error::Error + Send + Sync>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolExecutionResult::ok(vec![Part::text("done")]))
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let model = MockLanguageModel::new(vec![ModelResponse::new(vec![Part::text("already answered")])]);

    let seed = vec![
        Message::user_text("go").into(),
        ModelResponse::new(vec![Part::tool_call("call_1", "counted", json!({}))]).into(),
        skein::ToolItem {
            tool_call_id: "call_1".to_string(),
            tool_name: "counted".to_string(),
            input: json!({}),
            output: vec![Part::text("prior result")],
            is_error: false,
        }
        .into(),
    ];

    let calls_for_assert = calls.clone();
    let agent = Agent::new(
        "resumer",
        Arc::new(model),
        move || AgentOptions {
            tools: vec![Arc::new(CountingTool {
                calls: calls.clone(),
            })],
            ..AgentOptions::default()
        },
    );

    let response = agent.run(seed, ()).await.unwrap();
    assert_eq!(response.content, vec![Part::text("already answered")]);
    assert_eq!(calls_for_assert.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn toolkit_tool_list_shrinking_mid_run_does_not_invalidate_a_pending_call() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct VanishingTool;
    #[async_trait]
    impl AgentTool<()> for VanishingTool {
        fn name(&self) -> &str {
            "vanishing_tool"
        }
        fn description(&self) -> &str {
            "present only while the model can still be asked to call it"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            _args: Value,
            _context: &(),
            _state: &RunState,
        ) -> Result<ToolExecutionResult, Box<dyn std::error::Error + Send + Sync>> {
            Ok(ToolExecutionResult::ok(vec![Part::text("still here")]))
        }
    }

    struct VanishingSession {
        calls: Arc<AtomicUsize>,
    }
    #[async_trait]
    impl skein::ToolkitSession<()> for VanishingSession {
        fn tools(&self) -> Vec<Arc<dyn AgentTool<()>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < 2 {
                vec![Arc::new(VanishingTool)]
            } else {
                Vec::new()
            }
        }
    }

    struct VanishingToolkit {
        calls: Arc<AtomicUsize>,
    }
    #[async_trait]
    impl skein::Toolkit<()> for VanishingToolkit {
        async fn create_session(
            &self,
            _context: &(),
        ) -> Result<Box<dyn skein::ToolkitSession<()>>, Box<dyn std::error::Error + Send + Sync>>
        {
            Ok(Box::new(VanishingSession {
                calls: self.calls.clone(),
            }))
        }
    }

    let model = MockLanguageModel::new(vec![
        ModelResponse::new(vec![Part::tool_call("call_1", "vanishing_tool", json!({}))]),
        ModelResponse::new(vec![Part::text("done")]),
    ]);

    let calls = Arc::new(AtomicUsize::new(0));
    let agent = Agent::new(
        "vanisher",
        Arc::new(model),
        move || AgentOptions {
            toolkits: vec![Arc::new(VanishingToolkit {
                calls: calls.clone(),
            })],
            ..AgentOptions::default()
        },
    );

    // The toolkit's tool list is only present for the first two reads
    // (the pre-loop snapshot and the TurnParams call that produces the
    // model input carrying the tool call below) and is gone by the
    // third read. A tool call made against a still-current snapshot
    // must still execute on the next loop iteration, even though the
    // toolkit has since dropped the tool.
    let response = agent.run(vec![Message::user_text("go").into()], ()).await.unwrap();

    assert_eq!(response.content, vec![Part::text("done")]);
    assert!(response
        .output
        .iter()
        .any(|item| matches!(item, AgentItem::Tool(t) if t.tool_call_id == "call_1" && !t.is_error)));
}
