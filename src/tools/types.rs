//! Tool types for QueryBridge
//!
//! This module defines the `Tool` trait the data-query agent calls through,
//! the `ToolContext` handed to every execution, and the `ToolOutput` fed back
//! to the model as a tool-result turn.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Result of one tool execution.
///
/// Both successful and failed executions produce an output that is fed back
/// to the model; `is_error` only marks the latter for logging and progress.
/// Returning `Err` from [`Tool::execute`] instead aborts the whole turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Content sent to the model as the tool result.
    pub content: String,
    /// Whether this result represents an error condition.
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful result.
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Error result. The model sees the message and may try again.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Serialize a JSON value as a successful result.
    pub fn json(value: &Value) -> Self {
        Self::ok(value.to_string())
    }
}

/// Trait that all tools must implement.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use querybridge::tools::{Tool, ToolContext, ToolOutput};
/// use querybridge::error::Result;
///
/// struct CountTool;
///
/// #[async_trait]
/// impl Tool for CountTool {
///     fn name(&self) -> &str { "count" }
///     fn description(&self) -> &str { "Counts rows" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({"type": "object", "properties": {}, "required": []})
///     }
///     async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
///         Ok(ToolOutput::ok("42"))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to request this tool.
    fn name(&self) -> &str;

    /// Description sent to the model.
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Thread the calling turn belongs to
    pub thread_id: Option<String>,
    /// Caller metadata supplied with the question (tenant, user, ...)
    pub metadata: BTreeMap<String, String>,
}

impl ToolContext {
    /// Create a new empty tool context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread id.
    ///
    /// # Example
    /// ```
    /// use querybridge::tools::ToolContext;
    ///
    /// let ctx = ToolContext::new().with_thread("t-1");
    /// assert_eq!(ctx.thread_id.as_deref(), Some("t-1"));
    /// ```
    pub fn with_thread(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
    }

    /// Attach caller metadata.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}
