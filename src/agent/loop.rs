//! Conversation engine
//!
//! This module runs one user turn end to end: load the thread, drive the
//! state machine, stream frames, then persist the thread and history.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::providers::LLMProvider;
use crate::session::{ConversationStore, HistorySink, Message, Thread, OWNER_METADATA_KEY};
use crate::tools::{ToolContext, ToolRegistry};

use super::context::{with_system_prompt, RequestContext, ROUTER_PROMPT};
use super::events::EventSink;
use super::graph::{ConversationGraph, ConversationState};
use super::stream::{EventStreamTranslator, Frame};
use super::title::generate_title;

/// Frames buffered between the engine and a slow caller.
const FRAME_BUFFER: usize = 64;
/// Events buffered between the state machine and the translator.
const EVENT_BUFFER: usize = 64;

/// One question submitted by a caller.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// The user's question, as typed
    pub question: String,
    /// Existing thread to continue; a new one is created when `None`
    pub thread_id: Option<String>,
    /// Caller metadata rendered into the question and passed to tools
    pub metadata: BTreeMap<String, String>,
}

impl TurnRequest {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            ..Default::default()
        }
    }

    pub fn with_thread(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Runs user turns against a provider, tools and the two stores.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use querybridge::agent::{ConversationEngine, TurnRequest};
/// use querybridge::config::Config;
/// use querybridge::session::{HistoryStore, ThreadStore};
/// use querybridge::tools::ToolRegistry;
///
/// let engine = Arc::new(ConversationEngine::new(
///     Config::default(),
///     Arc::new(my_provider),
///     Arc::new(ToolRegistry::new()),
///     Arc::new(ThreadStore::new_memory()),
///     Arc::new(HistoryStore::new_memory()),
/// ));
/// let mut frames = engine.submit(TurnRequest::new("How many orders today?"));
/// while let Some(frame) = frames.recv().await {
///     print!("{}", frame.to_sse());
/// }
/// ```
pub struct ConversationEngine {
    /// Engine configuration
    config: Config,
    /// Model used by every stage and for titles
    provider: Arc<dyn LLMProvider>,
    /// The fixed stage graph
    graph: ConversationGraph,
    /// Thread state between requests
    store: Arc<dyn ConversationStore>,
    /// Question/answer log
    history: Arc<dyn HistorySink>,
    /// Per-thread locks to serialize concurrent turns on the same thread
    thread_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ConversationEngine {
    pub fn new(
        config: Config,
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn ConversationStore>,
        history: Arc<dyn HistorySink>,
    ) -> Self {
        let graph = ConversationGraph::new(&config, provider.clone(), tools);
        Self {
            config,
            provider,
            graph,
            store,
            history,
            thread_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a turn on its own task and return its frames.
    ///
    /// Dropping the receiver cancels the turn.
    pub fn submit(self: &Arc<Self>, request: TurnRequest) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let engine = Arc::clone(self);
        let span = info_span!("turn", thread_id = request.thread_id.as_deref().unwrap_or("new"));
        tokio::spawn(async move { engine.run_turn(request, tx).await }.instrument(span));
        rx
    }

    /// Run a turn to completion, writing frames to `out`.
    ///
    /// The last frame is always [`Frame::Done`], unless the caller has gone.
    pub async fn run_turn(&self, request: TurnRequest, out: mpsc::Sender<Frame>) {
        let mut translator = EventStreamTranslator::new(out);
        let announce = request.thread_id.is_none();
        let thread_id = request
            .thread_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Different threads still proceed concurrently.
        let thread_lock = self.acquire_thread_lock(&thread_id).await;
        let outcome = {
            let _thread_guard = thread_lock.lock().await;
            self.execute(request, &thread_id, announce, &mut translator)
                .await
        };
        drop(thread_lock);
        self.release_thread_lock(&thread_id).await;

        if let Err(e) = outcome {
            if translator.fail(&e).await.is_err() {
                debug!("Caller left before the failure was reported");
            }
        }
        translator.close().await;
    }

    async fn acquire_thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget a thread's lock once no turn holds or waits on it.
    async fn release_thread_lock(&self, thread_id: &str) {
        let mut locks = self.thread_locks.lock().await;
        if locks
            .get(thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(thread_id);
        }
    }

    async fn execute(
        &self,
        request: TurnRequest,
        thread_id: &str,
        announce: bool,
        translator: &mut EventStreamTranslator,
    ) -> Result<()> {
        translator.open(thread_id, announce).await?;

        let loaded = self.store.load(thread_id).await?;
        let created = loaded.is_none();
        let mut thread = loaded.unwrap_or_else(|| {
            let mut fresh = Thread::new(thread_id);
            if let Some(owner) = request.metadata.get(OWNER_METADATA_KEY) {
                fresh.set_owner(owner);
            }
            fresh
        });
        info!(thread_id = %thread_id, created, turns = thread.messages.len(), "Starting turn");

        let question = RequestContext::new()
            .with_current_time()
            .with_metadata(request.metadata.clone())
            .render_question(&request.question);
        let mut messages = with_system_prompt(&thread.messages, ROUTER_PROMPT);
        messages.push(Message::user(&question));

        let mut state = ConversationState::new(messages);
        let ctx = ToolContext::new()
            .with_thread(thread_id)
            .with_metadata(request.metadata.clone());

        let (sink, events) = EventSink::channel(EVENT_BUFFER);
        let graph = &self.graph;
        let run = async {
            // Dropping the sink ends the translator's pump.
            let sink = sink;
            graph.run(&mut state, &ctx, &sink).await
        };
        let (ran, pumped) = tokio::join!(run, translator.pump(events));
        pumped?;
        ran?;

        let answer = translator.answer().to_string();
        if created {
            let title = generate_title(
                self.provider.as_ref(),
                &self.config.agents.model,
                &request.question,
                &answer,
            )
            .await;
            thread.set_title(&title);
        }
        thread.replace_messages(state.messages);
        self.store.save(&thread).await?;

        if !answer.is_empty() {
            let history_id = self
                .history
                .append(&request.question, &answer, thread_id, &request.metadata)
                .await?;
            translator.persisted(history_id).await?;
        }

        info!(thread_id = %thread_id, answer_chars = answer.chars().count(), "Turn complete");
        Ok(())
    }
}
