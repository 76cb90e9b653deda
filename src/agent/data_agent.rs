//! Data-query agent and its tool executor stage.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{AgentDefaults, WindowConfig};
use crate::error::Result;
use crate::providers::{ChatOptions, LLMProvider};
use crate::session::Message;
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};

use super::context::{with_system_prompt, AGENT_PROMPT};
use super::events::{relay_completion, EventSink, GraphEvent, Stage};
use super::window::{trim_messages, WindowPolicy};

pub struct DataAgent {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    model: String,
    options: ChatOptions,
    policy: WindowPolicy,
}

impl DataAgent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        agents: &AgentDefaults,
        window: &WindowConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            model: agents.model.clone(),
            options: ChatOptions::new()
                .with_max_tokens(agents.max_tokens)
                .with_temperature(agents.temperature),
            policy: WindowPolicy::agent(window),
        }
    }

    /// One agent invocation. The returned turn either carries tool calls or
    /// is the structured payload for the summarizer.
    ///
    /// Text drafted here is emitted as `Stage::Agent` deltas, which callers
    /// do not show.
    pub async fn draft(&self, messages: &[Message], sink: &EventSink) -> Result<Message> {
        let view = trim_messages(&with_system_prompt(messages, AGENT_PROMPT), self.policy);
        debug!(turns = view.len(), tools = self.tools.len(), "Agent window");

        let stream = sink
            .guard(self.provider.chat_stream(
                view,
                self.tools.definitions(),
                Some(&self.model),
                self.options.clone(),
            ))
            .await?;
        let completion = relay_completion(stream, sink, Stage::Agent).await?;
        Ok(completion.into_message())
    }

    /// Execute every call in `call_turn` and return the tool-result turns.
    ///
    /// Tool-level failures come back as error results for the agent to read.
    /// An `Err` from the executor ends the turn.
    pub async fn run_tools(
        &self,
        call_turn: &Message,
        ctx: &ToolContext,
        sink: &EventSink,
    ) -> Result<Vec<Message>> {
        let calls = call_turn.tool_calls.as_deref().unwrap_or_default();
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            sink.emit(GraphEvent::ToolStarted {
                name: call.name.clone(),
                call_id: call.id.clone(),
            })
            .await?;

            let output = match serde_json::from_str::<Value>(&call.arguments) {
                Ok(args) => {
                    sink.guard(self.tools.execute(&call.name, args, ctx))
                        .await?
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool arguments are not valid JSON");
                    ToolOutput::error(format!("Invalid arguments: {}", e))
                }
            };
            info!(tool = %call.name, is_error = output.is_error, "Tool call finished");

            sink.emit(GraphEvent::ToolFinished {
                name: call.name.clone(),
                call_id: call.id.clone(),
                is_error: output.is_error,
            })
            .await?;
            results.push(Message::tool_result(&call.id, &output.content));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::providers::{LLMResponse, LLMToolCall, ToolDefinition};
    use crate::session::ToolCall;
    use crate::tools::Tool;
    use async_trait::async_trait;

    struct ToolCallingProvider;

    #[async_trait]
    impl LLMProvider for ToolCallingProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            tools: Vec<ToolDefinition>,
            _model: Option<&str>,
            _options: ChatOptions,
        ) -> Result<LLMResponse> {
            assert_eq!(messages[0], Message::system(AGENT_PROMPT));
            assert_eq!(tools.len(), 1);
            Ok(LLMResponse::with_tools(
                "thinking",
                vec![LLMToolCall::new("c1", "count_rows", r#"{"table":"orders"}"#)],
            ))
        }

        fn default_model(&self) -> &str {
            "tools"
        }

        fn name(&self) -> &str {
            "tools"
        }
    }

    struct CountRows;

    #[async_trait]
    impl Tool for CountRows {
        fn name(&self) -> &str {
            "count_rows"
        }
        fn description(&self) -> &str {
            "Count rows in a table"
        }
        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"table": {"type": "string"}}})
        }
        async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
            match args["table"].as_str() {
                Some("broken") => Err(BridgeError::Tool("executor down".into())),
                Some(table) => Ok(ToolOutput::ok(format!(
                    "{}:{}",
                    table,
                    ctx.thread_id.as_deref().unwrap_or("-")
                ))),
                None => Ok(ToolOutput::error("missing table")),
            }
        }
    }

    fn agent() -> DataAgent {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CountRows));
        DataAgent::new(
            Arc::new(ToolCallingProvider),
            Arc::new(registry),
            &AgentDefaults::default(),
            &WindowConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_draft_returns_tool_call_turn_without_chat_deltas() {
        let (sink, mut rx) = EventSink::channel(8);
        let turn = agent().draft(&[Message::user("orders?")], &sink).await.unwrap();

        assert_eq!(turn.tool_call_ids(), vec!["c1"]);
        match rx.recv().await {
            Some(GraphEvent::Delta { stage, .. }) => assert_eq!(stage, Stage::Agent),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_tools_emits_progress_and_results() {
        let (sink, mut rx) = EventSink::channel(8);
        let call_turn = Message::assistant_with_tools(
            "",
            vec![
                ToolCall::new("a", "count_rows", r#"{"table":"orders"}"#),
                ToolCall::new("b", "count_rows", "{}"),
                ToolCall::new("c", "count_rows", "not json"),
            ],
        );
        let ctx = ToolContext::new().with_thread("t1");

        let results = agent().run_tools(&call_turn, &ctx, &sink).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Message::tool_result("a", "orders:t1"));
        assert_eq!(results[1], Message::tool_result("b", "missing table"));
        assert!(results[2].content.starts_with("Invalid arguments"));

        let mut finished = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let GraphEvent::ToolFinished { call_id, is_error, .. } = event {
                finished.push((call_id, is_error));
            }
        }
        assert_eq!(
            finished,
            vec![
                ("a".to_string(), false),
                ("b".to_string(), true),
                ("c".to_string(), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_run_tools_executor_failure_ends_turn() {
        let (sink, _rx) = EventSink::channel(8);
        let call_turn = Message::assistant_with_tools(
            "",
            vec![ToolCall::new("a", "count_rows", r#"{"table":"broken"}"#)],
        );
        let err = agent()
            .run_tools(&call_turn, &ToolContext::new(), &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Tool(_)));
    }
}
