//! Token estimation for context window management.
//!
//! A deterministic sub-word heuristic, used only to bound each model
//! invocation. Rules:
//! - each run of ASCII letters/digits costs one token per 4 characters
//!   (rounded up)
//! - every other non-whitespace character (punctuation, CJK) costs one token
//! - whitespace is free
//! - each turn adds a fixed framing overhead, each tool call a little more

use crate::session::Message;

/// Per-turn overhead (role label, framing tokens).
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Overhead for the tool-call JSON structure (per call).
pub const TOOL_CALL_OVERHEAD_TOKENS: usize = 3;

/// Characters of an ASCII alphanumeric run that fit in one token.
const CHARS_PER_WORD_TOKEN: usize = 4;

/// Estimate the token count of a piece of text.
pub fn estimate_text(text: &str) -> usize {
    let mut total: usize = 0;
    let mut run: usize = 0;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            run += 1;
            continue;
        }
        total += run.div_ceil(CHARS_PER_WORD_TOKEN);
        run = 0;
        if !c.is_whitespace() {
            total += 1;
        }
    }
    total + run.div_ceil(CHARS_PER_WORD_TOKEN)
}

/// Estimate the token count of one turn, including its tool calls and the
/// call identifier it answers.
pub fn estimate_message(message: &Message) -> usize {
    let mut total = MESSAGE_OVERHEAD_TOKENS + estimate_text(&message.content);

    if let Some(calls) = &message.tool_calls {
        for call in calls {
            total += TOOL_CALL_OVERHEAD_TOKENS;
            total += estimate_text(&call.name);
            total += estimate_text(&call.arguments);
        }
    }

    if let Some(id) = &message.tool_call_id {
        total += estimate_text(id);
    }

    total
}

/// Estimate the token count of a sequence of turns.
///
/// # Example
/// ```
/// use querybridge::agent::tokens::estimate_messages;
/// use querybridge::session::Message;
///
/// let turns = vec![Message::system("Be brief."), Message::user("hi")];
/// assert_eq!(estimate_messages(&turns), estimate_messages(&turns));
/// assert!(estimate_messages(&turns) > 0);
/// ```
pub fn estimate_messages(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message).sum()
}
