//! Events emitted by the conversation state machine while a turn runs.

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::providers::{LLMResponse, LLMToolCall, StreamEvent};
use crate::session::Message;

/// Processing stage of one user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Router,
    Chat,
    Agent,
    Tools,
    Summarize,
    End,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Router => "router",
            Stage::Chat => "chat",
            Stage::Agent => "agent",
            Stage::Tools => "tools",
            Stage::Summarize => "summarize",
            Stage::End => "end",
        };
        f.write_str(name)
    }
}

/// One observation of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// A new processing step began.
    StageEntered(Stage),
    /// A generated text chunk, tagged with the stage producing it.
    Delta { stage: Stage, text: String },
    /// A tool call is about to run.
    ToolStarted { name: String, call_id: String },
    /// A tool call returned.
    ToolFinished {
        name: String,
        call_id: String,
        is_error: bool,
    },
}

/// Sending half of the event channel.
///
/// A closed channel means the consumer went away, which the state machine
/// treats as cancellation.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<GraphEvent>,
}

impl EventSink {
    /// Create a sink and its receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<GraphEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Deliver an event, or `BridgeError::Cancelled` if nobody is listening.
    pub async fn emit(&self, event: GraphEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| BridgeError::Cancelled)
    }

    /// Resolves once the receiver has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Run `fut` unless the consumer disconnects first, in which case `fut`
    /// is dropped and `BridgeError::Cancelled` is returned.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            out = fut => out,
            _ = self.tx.closed() => Err(BridgeError::Cancelled),
        }
    }
}

/// A fully received model completion.
#[derive(Debug, Default)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<LLMToolCall>,
}

impl Completion {
    /// The assistant turn recording this completion.
    pub fn into_message(self) -> Message {
        LLMResponse::with_tools(&self.content, self.tool_calls).into_message()
    }
}

/// Drain a model stream, forwarding each text chunk as a `Delta` tagged
/// with `stage`, in arrival order.
///
/// Returning early drops `stream`, which stops the producer.
pub async fn relay_completion(
    mut stream: mpsc::Receiver<StreamEvent>,
    sink: &EventSink,
    stage: Stage,
) -> Result<Completion> {
    let mut completion = Completion::default();
    let mut streamed = String::new();

    loop {
        let event = tokio::select! {
            event = stream.recv() => event,
            _ = sink.closed() => return Err(BridgeError::Cancelled),
        };

        match event {
            Some(StreamEvent::Delta(text)) => {
                streamed.push_str(&text);
                sink.emit(GraphEvent::Delta { stage, text }).await?;
            }
            Some(StreamEvent::ToolCalls(calls)) => completion.tool_calls = calls,
            Some(StreamEvent::Done { content, usage }) => {
                if let Some(usage) = usage {
                    debug!(
                        stage = %stage,
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "Completion finished"
                    );
                }
                completion.content = if content.is_empty() { streamed } else { content };
                return Ok(completion);
            }
            Some(StreamEvent::Error(err)) => return Err(err),
            None => {
                return Err(BridgeError::Provider(
                    "completion stream ended before it finished".into(),
                ))
            }
        }
    }
}
