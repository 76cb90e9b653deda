//! Thread and turn types for QueryBridge
//!
//! A [`Thread`] is the durable, persisted form of a conversation. Each entry in
//! it is a [`Message`] (a "turn"), tagged with a [`Role`]. Assistant turns may
//! carry [`ToolCall`]s and tool-result turns carry the id of the call they
//! answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted conversation thread.
///
/// Threads are identified by an opaque id handed back to the caller on the
/// first turn. The turn list is appended to on every successful request and
/// never rewritten; context trimming only ever produces per-call views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Unique identifier for this thread
    pub id: String,
    /// Ordered list of turns in this conversation
    pub messages: Vec<Message>,
    /// Short display title, generated after the first answered turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// User the thread belongs to, taken from the first request's metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// When this thread was created
    pub created_at: DateTime<Utc>,
    /// When this thread was last modified
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Create a new empty thread with the given id.
    ///
    /// # Example
    /// ```
    /// use querybridge::session::Thread;
    ///
    /// let thread = Thread::new("t-123");
    /// assert!(thread.messages.is_empty());
    /// assert!(thread.title.is_none());
    /// ```
    pub fn new(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            messages: Vec::new(),
            title: None,
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the turn list with the outcome of a completed request.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.updated_at = Utc::now();
    }

    /// Set the display title.
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
        self.updated_at = Utc::now();
    }

    /// Record the user the thread belongs to.
    pub fn set_owner(&mut self, owner: &str) {
        self.owner = Some(owner.to_string());
    }

    /// Check if this thread has no turns yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A single turn in a conversation.
///
/// Turns can be from users, assistants, system prompts, or tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The text content of the message (empty for tool-call-only assistant turns)
    pub content: String,
    /// Tool calls made by the assistant (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message is responding to (for tool results)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new user (human) turn.
    ///
    /// # Example
    /// ```
    /// use querybridge::session::{Message, Role};
    ///
    /// let msg = Message::user("How many orders shipped today?");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new system turn.
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new tool result turn answering `tool_call_id`.
    ///
    /// # Example
    /// ```
    /// use querybridge::session::{Message, Role};
    ///
    /// let msg = Message::tool_result("call_123", r#"{"code":0}"#);
    /// assert_eq!(msg.role, Role::Tool);
    /// assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
    /// ```
    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.to_string()),
        }
    }

    /// Create an assistant turn carrying tool calls.
    pub fn assistant_with_tools(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Check if this message has tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|tc| !tc.is_empty())
            .unwrap_or(false)
    }

    /// Ids of the tool calls carried by this turn (empty for non-assistant turns).
    pub fn tool_call_ids(&self) -> Vec<&str> {
        self.tool_calls
            .as_ref()
            .map(|calls| calls.iter().map(|c| c.id.as_str()).collect())
            .unwrap_or_default()
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// Messages from the human asking questions
    User,
    /// Messages from the model
    Assistant,
    /// Results from tool executions
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// JSON-encoded arguments for the tool
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }
}
