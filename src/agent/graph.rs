//! Conversation state machine
//!
//! ```text
//!            ┌──────┐
//!  router ──>│ chat │──────────────────────> end
//!     │      └──────┘
//!     │      ┌───────┐  tool calls  ┌───────┐
//!     └─────>│ agent │─────────────>│ tools │
//!            │       │<─────────────│       │
//!            └───────┘              └───────┘
//!                │ no tool calls
//!                ▼
//!           summarize ─────────────────────> end
//! ```

use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::providers::LLMProvider;
use crate::session::Message;
use crate::tools::{ToolContext, ToolRegistry};

use super::data_agent::DataAgent;
use super::events::{EventSink, GraphEvent, Stage};
use super::responder::Responder;
use super::router::{IntentRouter, Route};
use super::summarizer::Summarizer;

/// Working state of one user turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// Full thread history, including the turns added so far
    pub messages: Vec<Message>,
    /// Set by the router, consumed by the next transition
    pub next_stage: Option<Route>,
}

impl ConversationState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            next_stage: None,
        }
    }
}

/// The stage that follows `stage`.
pub fn transition(stage: Stage, state: &mut ConversationState) -> Stage {
    match stage {
        Stage::Router => match state.next_stage.take().unwrap_or_default() {
            Route::Chat => Stage::Chat,
            Route::DataQuery => Stage::Agent,
        },
        Stage::Agent => {
            if state.messages.last().is_some_and(|m| m.has_tool_calls()) {
                Stage::Tools
            } else {
                Stage::Summarize
            }
        }
        Stage::Tools => Stage::Agent,
        Stage::Chat | Stage::Summarize | Stage::End => Stage::End,
    }
}

/// Runs one user turn through router, responders and tools.
pub struct ConversationGraph {
    router: IntentRouter,
    responder: Responder,
    agent: DataAgent,
    summarizer: Summarizer,
    step_limit: u32,
}

impl ConversationGraph {
    pub fn new(config: &Config, provider: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            router: IntentRouter::new(provider.clone(), config.router.clone(), &config.agents),
            responder: Responder::new(provider.clone(), &config.agents, &config.window),
            agent: DataAgent::new(provider.clone(), tools, &config.agents, &config.window),
            summarizer: Summarizer::new(provider, &config.agents),
            step_limit: config.agents.step_limit,
        }
    }

    /// Drive `state` from the router to the end, appending every produced
    /// turn to `state.messages`.
    ///
    /// # Errors
    ///
    /// `IterationExhausted` once more than `step_limit` steps would run,
    /// `Cancelled` when the event consumer goes away, and any model or
    /// executor failure.
    pub async fn run(
        &self,
        state: &mut ConversationState,
        ctx: &ToolContext,
        sink: &EventSink,
    ) -> Result<()> {
        let mut stage = Stage::Router;
        let mut steps = 0u32;

        while stage != Stage::End {
            steps += 1;
            if steps > self.step_limit {
                warn!(steps, limit = self.step_limit, "Step limit exceeded");
                return Err(BridgeError::IterationExhausted {
                    steps,
                    limit: self.step_limit,
                });
            }

            crate::log_component!(
                info,
                "graph",
                "Entering stage",
                stage = stage.to_string(),
                step = steps
            );
            sink.emit(GraphEvent::StageEntered(stage)).await?;
            self.step(stage, state, ctx, sink).await?;
            stage = transition(stage, state);
        }

        Ok(())
    }

    async fn step(
        &self,
        stage: Stage,
        state: &mut ConversationState,
        ctx: &ToolContext,
        sink: &EventSink,
    ) -> Result<()> {
        match stage {
            Stage::Router => {
                let decision = sink.guard(self.router.classify(&state.messages)).await?;
                state.next_stage = Some(decision.route);
            }
            Stage::Chat => {
                let reply = self.responder.respond(&state.messages, sink).await?;
                state.messages.push(reply);
            }
            Stage::Agent => {
                let draft = self.agent.draft(&state.messages, sink).await?;
                state.messages.push(draft);
            }
            Stage::Tools => {
                let results = match state.messages.last() {
                    Some(call_turn) => self.agent.run_tools(call_turn, ctx, sink).await?,
                    None => Vec::new(),
                };
                state.messages.extend(results);
            }
            Stage::Summarize => {
                let answer = self.summarizer.summarize(&state.messages, sink).await?;
                state.messages.push(answer);
            }
            Stage::End => {}
        }
        Ok(())
    }
}
