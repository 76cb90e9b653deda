//! Conversational responder: answers directly from trimmed history.

use std::sync::Arc;

use tracing::debug;

use crate::config::{AgentDefaults, WindowConfig};
use crate::error::Result;
use crate::providers::{ChatOptions, LLMProvider};
use crate::session::Message;

use super::context::{with_system_prompt, CHAT_PROMPT};
use super::events::{relay_completion, EventSink, Stage};
use super::window::{trim_messages, window_cost, WindowPolicy};

pub struct Responder {
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: ChatOptions,
    policy: WindowPolicy,
}

impl Responder {
    pub fn new(provider: Arc<dyn LLMProvider>, agents: &AgentDefaults, window: &WindowConfig) -> Self {
        Self {
            provider,
            model: agents.model.clone(),
            options: ChatOptions::new()
                .with_max_tokens(agents.max_tokens)
                .with_temperature(agents.temperature),
            policy: WindowPolicy::chat(window),
        }
    }

    /// Produce one assistant turn, streaming its text as `Stage::Chat` deltas.
    pub async fn respond(&self, messages: &[Message], sink: &EventSink) -> Result<Message> {
        let view = trim_messages(&with_system_prompt(messages, CHAT_PROMPT), self.policy);
        debug!(
            turns = view.len(),
            cost = window_cost(&view, self.policy),
            "Chat window"
        );

        let stream = sink
            .guard(
                self.provider
                    .chat_stream(view, vec![], Some(&self.model), self.options.clone()),
            )
            .await?;
        let completion = relay_completion(stream, sink, Stage::Chat).await?;
        Ok(Message::assistant(&completion.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::events::GraphEvent;
    use crate::providers::{LLMResponse, ToolDefinition};
    use crate::session::Role;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            tools: Vec<ToolDefinition>,
            _model: Option<&str>,
            _options: ChatOptions,
        ) -> Result<LLMResponse> {
            assert!(tools.is_empty());
            *self.seen.lock().unwrap() = messages;
            Ok(LLMResponse::text("Hello there"))
        }

        fn default_model(&self) -> &str {
            "recording"
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_respond_uses_chat_prompt_and_streams() {
        let provider = Arc::new(RecordingProvider::default());
        let responder = Responder::new(
            provider.clone(),
            &AgentDefaults::default(),
            &WindowConfig::default(),
        );
        let (sink, mut rx) = EventSink::channel(8);
        let history = vec![Message::system("router prompt"), Message::user("hi")];

        let reply = responder.respond(&history, &sink).await.unwrap();

        assert_eq!(reply, Message::assistant("Hello there"));
        assert_eq!(
            rx.recv().await,
            Some(GraphEvent::Delta {
                stage: Stage::Chat,
                text: "Hello there".into()
            })
        );
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0], Message::system(CHAT_PROMPT));
        assert_eq!(seen.iter().filter(|m| m.role == Role::System).count(), 1);
    }
}
