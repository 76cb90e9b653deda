//! Result summarizer: turns the agent's structured payload into the answer.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::AgentDefaults;
use crate::error::Result;
use crate::providers::{ChatOptions, LLMProvider};
use crate::session::{Message, Role};
use crate::utils::string::json_object_span;

use super::context::{summarize_request, NO_DATA_ANSWER, SUMMARIZE_PROMPT};
use super::events::{relay_completion, EventSink, GraphEvent, Stage};

/// Extract the JSON object embedded in `text`.
pub fn extract_payload(text: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(json_object_span(text)?).ok()?;
    value.is_object().then_some(value)
}

pub struct Summarizer {
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: ChatOptions,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn LLMProvider>, agents: &AgentDefaults) -> Self {
        Self {
            provider,
            model: agents.model.clone(),
            options: ChatOptions::new()
                .with_max_tokens(agents.max_tokens)
                .with_temperature(agents.temperature),
        }
    }

    /// Produce the final answer, streamed as `Stage::Summarize` deltas.
    ///
    /// A missing question or payload yields [`NO_DATA_ANSWER`] without a
    /// model call.
    pub async fn summarize(&self, messages: &[Message], sink: &EventSink) -> Result<Message> {
        let question = messages.iter().rev().find(|m| m.role == Role::User);
        let payload = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.has_tool_calls())
            .and_then(|m| extract_payload(&m.content));

        let (Some(question), Some(payload)) = (question, payload) else {
            warn!("No structured payload to summarize");
            sink.emit(GraphEvent::Delta {
                stage: Stage::Summarize,
                text: NO_DATA_ANSWER.to_string(),
            })
            .await?;
            return Ok(Message::assistant(NO_DATA_ANSWER));
        };

        info!("Summarizing query result");
        let prompt = vec![
            Message::system(SUMMARIZE_PROMPT),
            Message::user(&summarize_request(&question.content, &payload)),
        ];
        let stream = sink
            .guard(
                self.provider
                    .chat_stream(prompt, vec![], Some(&self.model), self.options.clone()),
            )
            .await?;
        let completion = relay_completion(stream, sink, Stage::Summarize).await?;
        Ok(Message::assistant(&completion.content))
    }
}
