//! Prompts and request context for conversation stages
//!
//! This module holds the fixed system prompts each stage runs under and the
//! `RequestContext` that renders the caller's metadata and the current time
//! into the stored human turn.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::session::{Message, Role};

/// System prompt stored with the thread; the router classifies under it.
pub const ROUTER_PROMPT: &str = r#"You are the intent router of a data assistant.

Decide whether the latest user message needs data from the business database
("SQL") or can be answered conversationally ("CHAT"). Greetings, small talk,
questions about yourself and follow-ups that only rephrase a previous answer
are CHAT. Anything asking for figures, lists, reports or records is SQL.

Reply with a single JSON object and nothing else:
{"route": "SQL" | "CHAT", "confidence": <number between 0 and 1>}"#;

/// Appended as a human turn when the first classification did not parse.
pub const ROUTER_RETRY_INSTRUCTION: &str = r#"Your previous reply was not valid JSON. Reply ONLY with {"route": "SQL" or "CHAT", "confidence": <number>} and no other text."#;

/// System prompt for the conversational responder.
pub const CHAT_PROMPT: &str = r#"You are a friendly data assistant.

Answer the user directly and concisely. You cannot query data in this mode;
if the user needs figures, suggest they ask for them explicitly."#;

/// System prompt for the data-query agent.
pub const AGENT_PROMPT: &str = r#"You are a data analyst with read-only access to a relational database.

Workflow:
1. Call `search_schema` to find the relevant tables, columns and worked examples.
2. Write one read-only SQL statement and run it with `query_database`.
3. If the result has code -1, fix the statement and try again. Code -2 means
   the statement was rejected because it modifies data.

Resolve relative dates using the current time given with the question.
When you have the data, stop calling tools and reply with a JSON object:
{"question": <the question>, "sql": <final statement>, "data": <result rows>, "note": <caveats or "">}"#;

/// System prompt for the result summarizer.
pub const SUMMARIZE_PROMPT: &str = r#"You turn query results into a clear answer.

Answer the question using only the data provided. Use a markdown table when
there are several rows. Never show SQL or internal field names."#;

/// Answer used when the agent's output carries no usable data.
pub const NO_DATA_ANSWER: &str =
    "Sorry, no data is available for this question. Please try rephrasing it or narrowing the scope.";

/// Prompt for the thread title call.
pub const TITLE_PROMPT: &str = r#"Write a title of at most 12 words for a conversation that started with the exchange below. Reply with the title only, without quotes.

Question: {question}
Answer: {answer}"#;

/// Human-turn body handed to the summarizer.
pub fn summarize_request(question: &str, payload: &Value) -> String {
    format!(
        "Question:\n{}\n\nQuery result:\n{}",
        question,
        serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
    )
}

/// Filled-in title prompt.
pub fn title_request(question: &str, answer: &str) -> String {
    TITLE_PROMPT
        .replace("{question}", question)
        .replace("{answer}", answer)
}

/// Replace every system turn in `messages` with a single leading `prompt`.
///
/// # Example
/// ```rust
/// use querybridge::agent::context::with_system_prompt;
/// use querybridge::session::{Message, Role};
///
/// let history = vec![Message::system("old"), Message::user("hi")];
/// let view = with_system_prompt(&history, "new");
/// assert_eq!(view[0].content, "new");
/// assert_eq!(view.iter().filter(|m| m.role == Role::System).count(), 1);
/// ```
pub fn with_system_prompt(messages: &[Message], prompt: &str) -> Vec<Message> {
    std::iter::once(Message::system(prompt))
        .chain(messages.iter().filter(|m| m.role != Role::System).cloned())
        .collect()
}

/// Request metadata rendered ahead of the user's question.
///
/// # Example
///
/// ```rust
/// use querybridge::agent::RequestContext;
///
/// let rendered = RequestContext::new()
///     .with_entry("tenant_id", "12")
///     .render_question("How many rooms are free tonight?");
/// assert!(rendered.contains("- tenant_id: 12"));
/// assert!(rendered.ends_with("How many rooms are free tonight?"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Local time the question was asked
    pub current_time: Option<String>,
    /// Caller metadata (tenant, user, attachment text, ...)
    pub metadata: BTreeMap<String, String>,
}

impl RequestContext {
    /// Create a new empty request context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current time to now (local time).
    pub fn with_current_time(self) -> Self {
        self.with_time(Local::now())
    }

    /// Set the time the question was asked.
    pub fn with_time(mut self, now: DateTime<Local>) -> Self {
        self.current_time = Some(now.format("%Y-%m-%d %H:%M:%S").to_string());
        self
    }

    /// Replace the caller metadata.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single metadata entry.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Check if any context field is set.
    pub fn is_empty(&self) -> bool {
        self.current_time.is_none() && self.metadata.is_empty()
    }

    /// Render the human turn stored for `question`.
    pub fn render_question(&self, question: &str) -> String {
        if self.is_empty() {
            return question.to_string();
        }

        let mut parts = Vec::new();
        if let Some(ref time) = self.current_time {
            parts.push(format!("- Current time: {}", time));
        }
        for (key, value) in &self.metadata {
            parts.push(format!("- {}: {}", key, value));
        }

        format!(
            "## Request Context\n\n{}\n\n## Question\n\n{}",
            parts.join("\n"),
            question
        )
    }
}
