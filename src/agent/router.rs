//! Intent router
//!
//! Classifies the latest question as a data lookup or plain conversation
//! through one JSON-mode model call over a short lookback of the thread.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AgentDefaults, RouterConfig};
use crate::error::{BridgeError, Result};
use crate::providers::{ChatOptions, LLMProvider};
use crate::session::{Message, Role};
use crate::utils::string::{json_object_span, preview};

use super::context::{ROUTER_PROMPT, ROUTER_RETRY_INSTRUCTION};

/// Which responder handles a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Conversational responder
    #[default]
    Chat,
    /// Data-query agent with tools
    DataQuery,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Chat => write!(f, "chat"),
            Route::DataQuery => write!(f, "data_query"),
        }
    }
}

impl FromStr for Route {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "conversational" => Ok(Route::Chat),
            "sql" | "data_query" | "data-query" => Ok(Route::DataQuery),
            other => Err(BridgeError::Config(format!("unknown route '{}'", other))),
        }
    }
}

/// Outcome of one routing decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub route: Route,
    /// Model-reported confidence in `[0, 1]`
    pub confidence: f64,
    /// True when neither attempt parsed and the configured fallback was used
    pub fell_back: bool,
}

#[derive(Deserialize)]
struct RawClassification {
    route: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parse a router reply, tolerating prose around the JSON object.
pub fn parse_classification(text: &str) -> Option<Classification> {
    let raw: RawClassification = serde_json::from_str(text.trim())
        .ok()
        .or_else(|| serde_json::from_str(json_object_span(text)?).ok())?;

    let route = raw.route.parse().ok()?;
    let confidence = raw.confidence.unwrap_or(0.5);
    if !(0.0..=1.0).contains(&confidence) {
        return None;
    }
    Some(Classification {
        route,
        confidence,
        fell_back: false,
    })
}

/// The last `lookback` human and assistant turns, skipping tool traffic.
pub fn routing_view(messages: &[Message], lookback: usize) -> Vec<Message> {
    let mut recent: Vec<Message> = messages
        .iter()
        .rev()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant) && !m.has_tool_calls())
        .take(lookback)
        .cloned()
        .collect();
    recent.reverse();
    recent
}

/// Routes each turn with a structured-output model call.
pub struct IntentRouter {
    provider: Arc<dyn LLMProvider>,
    config: RouterConfig,
    model: String,
}

impl IntentRouter {
    pub fn new(provider: Arc<dyn LLMProvider>, config: RouterConfig, agents: &AgentDefaults) -> Self {
        Self {
            provider,
            config,
            model: agents.model.clone(),
        }
    }

    /// Classify the latest question in `messages`.
    ///
    /// Unparseable replies are retried once (when enabled) and then resolve
    /// to the configured fallback route. Provider failures are returned.
    pub async fn classify(&self, messages: &[Message]) -> Result<Classification> {
        let mut prompt = vec![Message::system(ROUTER_PROMPT)];
        prompt.extend(routing_view(messages, self.config.lookback));

        let reply = self.ask(prompt.clone()).await?;
        if let Some(found) = parse_classification(&reply) {
            info!(route = %found.route, confidence = found.confidence, "Routed turn");
            return Ok(found);
        }
        warn!(reply = %preview(&reply, 120), "Router reply did not parse");

        if self.config.retry_on_parse_failure {
            prompt.push(Message::assistant(&reply));
            prompt.push(Message::user(ROUTER_RETRY_INSTRUCTION));
            let retry = self.ask(prompt).await?;
            if let Some(found) = parse_classification(&retry) {
                info!(route = %found.route, confidence = found.confidence, "Routed turn on retry");
                return Ok(found);
            }
            warn!(reply = %preview(&retry, 120), "Router retry did not parse");
        }

        info!(route = %self.config.fallback, "Using fallback route");
        Ok(Classification {
            route: self.config.fallback,
            confidence: 0.0,
            fell_back: true,
        })
    }

    async fn ask(&self, prompt: Vec<Message>) -> Result<String> {
        debug!(turns = prompt.len(), "Calling router model");
        let options = ChatOptions::new().with_temperature(0.0).with_json_mode();
        let response = self
            .provider
            .chat(prompt, vec![], Some(&self.model), options)
            .await?;
        Ok(response.content)
    }
}
