//! QueryBridge - conversation orchestration for a data assistant
//!
//! Routes each question to a conversational responder or a tool-using
//! data-query agent, keeps every model call inside a token window, and
//! streams typed frames back to the caller while threads and answers are
//! persisted between requests.

pub mod agent;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{ConversationEngine, Frame, TurnRequest};
pub use config::Config;
pub use error::{BridgeError, Result};
pub use providers::{ChatOptions, LLMProvider, LLMResponse, LLMToolCall, ToolDefinition, Usage};
pub use session::{Message, Role, Thread, ThreadStore, ToolCall};
