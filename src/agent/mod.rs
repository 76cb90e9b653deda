//! Agent module - Conversation orchestration
//!
//! This module turns one user question into a stream of typed frames. The
//! engine is responsible for:
//!
//! - Loading the thread and serializing turns on the same thread
//! - Routing the question to the conversational responder or the data agent
//! - Running the agent/tool loop under a step ceiling
//! - Keeping every model call within its token window
//! - Streaming deltas and progress, then persisting the answer
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌─────────────┐
//! │  TurnRequest │────>│ ConversationEngine│────>│ LLMProvider │
//! └──────────────┘     │  (graph + window) │     └─────────────┘
//!                      └───────────────────┘            │
//!                         │              │              ▼
//!                         ▼              ▼       ┌─────────────┐
//!                  ┌────────────┐ ┌────────────┐ │    Tools    │
//!                  │ThreadStore │ │  Frames    │ │  Registry   │
//!                  │HistoryStore│ │ (SSE out)  │ └─────────────┘
//!                  └────────────┘ └────────────┘
//! ```

pub mod context;
pub mod data_agent;
pub mod events;
pub mod graph;
mod r#loop;
pub mod responder;
pub mod router;
pub mod stream;
pub mod summarizer;
pub mod title;
pub mod tokens;
pub mod window;

pub use context::RequestContext;
pub use events::{EventSink, GraphEvent, Stage};
pub use graph::{ConversationGraph, ConversationState};
pub use r#loop::{ConversationEngine, TurnRequest};
pub use router::{Classification, IntentRouter, Route};
pub use stream::{EventStreamTranslator, Frame};
pub use window::{trim_messages, WindowPolicy};
