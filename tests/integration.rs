//! Integration tests for QueryBridge
//!
//! These drive the conversation engine end to end against a scripted
//! provider and in-memory stores: routing, the agent/tool loop, the frame
//! protocol, persistence, per-thread serialization and cancellation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use querybridge::agent::context::{CHAT_PROMPT, NO_DATA_ANSWER, SUMMARIZE_PROMPT};
use querybridge::agent::stream::{APOLOGY_TEXT, TOOL_FINISHED_TEXT, TOOL_STARTED_TEXT};
use querybridge::agent::{ConversationEngine, Frame, TurnRequest};
use querybridge::config::Config;
use querybridge::error::{BridgeError, Result};
use querybridge::providers::{ChatOptions, LLMProvider, LLMResponse, LLMToolCall, ToolDefinition};
use querybridge::session::{ConversationStore, HistoryStore, Message, Role, ThreadStore};
use querybridge::tools::sql::{QueryExecutor, Row, SqlQueryTool};
use querybridge::tools::ToolRegistry;

// ============================================================================
// Scripted collaborators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Router,
    Chat,
    Agent,
    Summarize,
    Title,
}

#[derive(Debug, Clone)]
enum Reply {
    Text(&'static str),
    Query(&'static str),
    Fail,
}

/// Answers each kind of model call from its own queue, falling back to a
/// per-kind default once the queue is empty.
struct ScriptedProvider {
    queues: Mutex<HashMap<Kind, VecDeque<Reply>>>,
    defaults: HashMap<Kind, Reply>,
    calls: Mutex<Vec<Kind>>,
    completed: AtomicUsize,
    delay: Option<Duration>,
    next_call: AtomicUsize,
}

impl ScriptedProvider {
    fn new() -> Self {
        let defaults = HashMap::from([
            (Kind::Router, Reply::Text(r#"{"route":"CHAT","confidence":0.9}"#)),
            (Kind::Chat, Reply::Text("Happy to help.")),
            (Kind::Agent, Reply::Text(r#"{"data": []}"#)),
            (Kind::Summarize, Reply::Text("Nothing found.")),
            (Kind::Title, Reply::Text("Test thread")),
        ]);
        Self {
            queues: Mutex::new(HashMap::new()),
            defaults,
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            delay: None,
            next_call: AtomicUsize::new(1),
        }
    }

    fn script(self, kind: Kind, replies: Vec<Reply>) -> Self {
        self.queues.lock().unwrap().insert(kind, replies.into());
        self
    }

    fn default_for(mut self, kind: Kind, reply: Reply) -> Self {
        self.defaults.insert(kind, reply);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn count(&self, kind: Kind) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| **k == kind).count()
    }

    fn classify(messages: &[Message], tools: &[ToolDefinition], options: &ChatOptions) -> Kind {
        if options.json_mode {
            return Kind::Router;
        }
        if !tools.is_empty() {
            return Kind::Agent;
        }
        match messages.first() {
            Some(m) if m.role == Role::System && m.content == SUMMARIZE_PROMPT => Kind::Summarize,
            Some(m) if m.role == Role::System && m.content == CHAT_PROMPT => Kind::Chat,
            _ => Kind::Title,
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        _model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let kind = Self::classify(&messages, &tools, &options);
        self.calls.lock().unwrap().push(kind);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .queues
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| self.defaults[&kind].clone());

        match reply {
            Reply::Text(text) => Ok(LLMResponse::text(text)),
            Reply::Query(sql) => {
                let id = format!("call_{}", self.next_call.fetch_add(1, Ordering::SeqCst));
                let args = json!({ "query": sql }).to_string();
                Ok(LLMResponse::with_tools(
                    "Let me look that up.",
                    vec![LLMToolCall::new(&id, "query_database", &args)],
                ))
            }
            Reply::Fail => Err(BridgeError::Provider("HTTP 502: bad gateway".into())),
        }
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct FixedRows;

#[async_trait]
impl QueryExecutor for FixedRows {
    async fn query(&self, _sql: &str) -> Result<Vec<Row>> {
        let row = json!({"status": "shipped", "orders": 3});
        match row {
            Value::Object(map) => Ok(vec![map]),
            _ => Ok(vec![]),
        }
    }
}

struct Harness {
    engine: Arc<ConversationEngine>,
    provider: Arc<ScriptedProvider>,
    threads: Arc<ThreadStore>,
    history: Arc<HistoryStore>,
}

fn harness(provider: ScriptedProvider) -> Harness {
    let provider = Arc::new(provider);
    let threads = Arc::new(ThreadStore::new_memory());
    let history = Arc::new(HistoryStore::new_memory());

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(SqlQueryTool::new(Arc::new(FixedRows))));

    let engine = Arc::new(ConversationEngine::new(
        Config::default(),
        provider.clone(),
        Arc::new(tools),
        threads.clone(),
        history.clone(),
    ));
    Harness {
        engine,
        provider,
        threads,
        history,
    }
}

async fn collect(mut rx: mpsc::Receiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    frames
}

fn deltas(frames: &[Frame]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Delta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn assert_single_trailing_done(frames: &[Frame]) {
    assert_eq!(frames.iter().filter(|f| f.is_done()).count(), 1);
    assert_eq!(frames.last(), Some(&Frame::Done));
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unparseable_router_twice_resolves_to_chat() {
    let h = harness(ScriptedProvider::new().script(
        Kind::Router,
        vec![Reply::Text("definitely SQL"), Reply::Text("SQL!!")],
    ));

    let frames = collect(h.engine.submit(TurnRequest::new("hello there"))).await;

    assert_eq!(h.provider.count(Kind::Router), 2);
    assert_eq!(h.provider.count(Kind::Chat), 1);
    assert_eq!(h.provider.count(Kind::Agent), 0);
    assert_eq!(deltas(&frames), "Happy to help.");
    assert!(!frames.iter().any(|f| matches!(f, Frame::Error { .. })));
    assert_single_trailing_done(&frames);
}

#[tokio::test]
async fn test_thread_meta_only_for_new_threads() {
    let h = harness(ScriptedProvider::new());

    let fresh = collect(h.engine.submit(TurnRequest::new("hi"))).await;
    let thread_id = match &fresh[0] {
        Frame::ThreadMeta { thread_id } => thread_id.clone(),
        other => panic!("expected thread meta first, got {:?}", other),
    };

    let again = collect(h.engine.submit(TurnRequest::new("hi again").with_thread(&thread_id))).await;
    assert!(!again.iter().any(|f| matches!(f, Frame::ThreadMeta { .. })));
    assert_eq!(again[again.len() - 2], Frame::HistoryMeta { history_id: 2 });

    // Title is generated once, for the turn that created the thread.
    assert_eq!(h.provider.count(Kind::Title), 1);
    let thread = h.threads.load(&thread_id).await.unwrap().unwrap();
    assert_eq!(thread.title.as_deref(), Some("Test thread"));
}

// ============================================================================
// Data path
// ============================================================================

#[tokio::test]
async fn test_full_data_path_frame_order() {
    let h = harness(
        ScriptedProvider::new()
            .script(Kind::Router, vec![Reply::Text(r#"{"route":"SQL","confidence":0.95}"#)])
            .script(
                Kind::Agent,
                vec![
                    Reply::Query("SELECT status, COUNT(*) AS orders FROM orders GROUP BY status"),
                    Reply::Text(r#"Done: {"question": "orders by status", "data": [{"status": "shipped", "orders": 3}]}"#),
                ],
            )
            .script(Kind::Summarize, vec![Reply::Text("Three orders have shipped.")]),
    );

    let mut meta = BTreeMap::new();
    meta.insert("tenant_id".to_string(), "7".to_string());
    let frames = collect(
        h.engine
            .submit(TurnRequest::new("orders by status?").with_metadata(meta)),
    )
    .await;

    assert!(matches!(frames[0], Frame::ThreadMeta { .. }));
    assert_eq!(
        frames[1..],
        [
            Frame::Processing {
                text: TOOL_STARTED_TEXT.into()
            },
            Frame::Processing {
                text: TOOL_FINISHED_TEXT.into()
            },
            Frame::Delta {
                text: "Three orders have shipped.".into()
            },
            Frame::HistoryMeta { history_id: 1 },
            Frame::Done,
        ]
    );

    let Frame::ThreadMeta { thread_id } = &frames[0] else {
        unreachable!()
    };
    let thread = h.threads.load(thread_id).await.unwrap().unwrap();
    let roles: Vec<Role> = thread.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Assistant,
        ]
    );
    assert!(thread.messages[1].content.contains("- tenant_id: 7"));
    assert!(thread.messages[3].content.contains("\"code\":0"));

    let record = h.history.get(1).await.unwrap();
    assert_eq!(record.question, "orders by status?");
    assert_eq!(record.answer, "Three orders have shipped.");
    assert_eq!(record.metadata.get("tenant_id").map(String::as_str), Some("7"));
}

#[tokio::test]
async fn test_endless_tool_loop_hits_step_ceiling() {
    let h = harness(
        ScriptedProvider::new()
            .script(Kind::Router, vec![Reply::Text(r#"{"route":"SQL"}"#)])
            .default_for(Kind::Agent, Reply::Query("SELECT 1")),
    );

    let frames = collect(h.engine.submit(TurnRequest::new("loop forever").with_thread("t-loop"))).await;

    // Router is step 1; agent and tools alternate until step 51 is refused.
    assert_eq!(h.provider.count(Kind::Agent), 25);
    assert_eq!(h.provider.count(Kind::Summarize), 0);

    let n = frames.len();
    match &frames[n - 2] {
        Frame::Error { code, text } => {
            assert_eq!(code, "iteration_exhausted");
            assert!(text.contains("50"));
        }
        other => panic!("expected error frame, got {:?}", other),
    }
    assert_single_trailing_done(&frames);

    assert!(h.threads.load("t-loop").await.unwrap().is_none());
    assert!(h.history.get(1).await.is_none());
}

#[tokio::test]
async fn test_summarizer_without_payload_uses_fallback_answer() {
    let h = harness(
        ScriptedProvider::new()
            .script(Kind::Router, vec![Reply::Text(r#"{"route":"SQL"}"#)])
            .script(Kind::Agent, vec![Reply::Text("I could not find that table.")]),
    );

    let frames = collect(h.engine.submit(TurnRequest::new("weird question"))).await;

    assert_eq!(h.provider.count(Kind::Summarize), 0);
    assert_eq!(deltas(&frames), NO_DATA_ANSWER);
    assert!(frames.contains(&Frame::HistoryMeta { history_id: 1 }));
    assert_single_trailing_done(&frames);
    assert_eq!(h.history.get(1).await.unwrap().answer, NO_DATA_ANSWER);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_upstream_failure_sends_apology_then_done() {
    let h = harness(ScriptedProvider::new().script(Kind::Chat, vec![Reply::Fail]));

    let frames = collect(h.engine.submit(TurnRequest::new("hi").with_thread("t-fail"))).await;

    assert_eq!(
        frames,
        vec![
            Frame::Delta {
                text: APOLOGY_TEXT.into()
            },
            Frame::Done
        ]
    );
    assert!(h.threads.load("t-fail").await.unwrap().is_none());
    assert!(h.history.get(1).await.is_none());
}

#[tokio::test]
async fn test_router_failure_is_upstream_failure() {
    let h = harness(ScriptedProvider::new().script(Kind::Router, vec![Reply::Fail]));
    let frames = collect(h.engine.submit(TurnRequest::new("hi").with_thread("t"))).await;
    assert_eq!(deltas(&frames), APOLOGY_TEXT);
    assert_eq!(h.provider.count(Kind::Chat), 0);
    assert_single_trailing_done(&frames);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_turns_on_same_thread_are_serialized() {
    let h = harness(ScriptedProvider::new().with_delay(Duration::from_millis(20)));

    let first = h.engine.submit(TurnRequest::new("first").with_thread("shared"));
    let second = h.engine.submit(TurnRequest::new("second").with_thread("shared"));
    let (a, b) = tokio::join!(collect(first), collect(second));
    assert_single_trailing_done(&a);
    assert_single_trailing_done(&b);

    let thread = h.threads.load("shared").await.unwrap().unwrap();
    let roles: Vec<Role> = thread.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant
        ]
    );
}

#[tokio::test]
async fn test_different_threads_run_in_parallel() {
    let h = harness(ScriptedProvider::new().with_delay(Duration::from_millis(50)));

    let started = std::time::Instant::now();
    let a = h.engine.submit(TurnRequest::new("a").with_thread("one"));
    let b = h.engine.submit(TurnRequest::new("b").with_thread("two"));
    let (fa, fb) = tokio::join!(collect(a), collect(b));

    assert_single_trailing_done(&fa);
    assert_single_trailing_done(&fb);
    // Three sequential model calls per turn (router, chat, title) take at
    // least 150ms; two serialized turns would take 300ms.
    assert!(started.elapsed() < Duration::from_millis(290));
}

#[tokio::test]
async fn test_disconnect_cancels_without_persisting() {
    let h = harness(ScriptedProvider::new().with_delay(Duration::from_millis(100)));

    let rx = h.engine.submit(TurnRequest::new("hello").with_thread("gone"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(rx);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The router call was in flight and got dropped before finishing.
    assert_eq!(h.provider.count(Kind::Router), 1);
    assert_eq!(h.provider.completed.load(Ordering::SeqCst), 0);
    assert_eq!(h.provider.count(Kind::Chat), 0);
    assert!(h.threads.load("gone").await.unwrap().is_none());
    assert!(h.history.get(1).await.is_none());
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_file_backed_stores_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let threads_dir = dir.path().join("threads");
    let history_file = dir.path().join("history.json");

    {
        let provider = Arc::new(ScriptedProvider::new());
        let threads = Arc::new(ThreadStore::with_path(threads_dir.clone()).unwrap());
        let history = Arc::new(HistoryStore::with_path(history_file.clone()).unwrap());
        let engine = Arc::new(ConversationEngine::new(
            Config::default(),
            provider,
            Arc::new(ToolRegistry::new()),
            threads,
            history,
        ));

        for question in ["one", "two", "three"] {
            let frames = collect(engine.submit(TurnRequest::new(question).with_thread("kept"))).await;
            assert_single_trailing_done(&frames);
        }
    }

    let threads = ThreadStore::with_path(threads_dir).unwrap();
    let thread = threads.load("kept").await.unwrap().unwrap();
    assert_eq!(thread.messages.len(), 7);
    assert_eq!(threads.list().await.unwrap().len(), 1);

    let history = HistoryStore::with_path(history_file).unwrap();
    let page = history.feed("kept", None, 2).await;
    let ids: Vec<i64> = page.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 2]);
    assert!(page.has_more);

    let older = history.feed("kept", Some(2), 2).await;
    assert_eq!(older.items.len(), 1);
    assert_eq!(older.items[0].question, "one");
    assert!(!older.has_more);
}
