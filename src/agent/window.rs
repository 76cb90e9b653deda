//! Per-invocation context window for conversation history.
//!
//! [`trim_messages`] produces the view of a thread that one model call sees:
//! a suffix of the history that fits a token budget, with tool-call pairing
//! repaired and the active question always present. The stored history is
//! never modified.

use std::collections::HashSet;

use tracing::debug;

use crate::config::WindowConfig;
use crate::session::{Message, Role};

use super::tokens::{estimate_message, estimate_messages};

/// Budget settings for one consuming stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Maximum estimated tokens for the trimmed history
    pub budget: usize,
    /// Whether system turns count against `budget`
    pub count_system: bool,
}

impl WindowPolicy {
    /// Policy for the conversational responder.
    pub fn chat(config: &WindowConfig) -> Self {
        Self {
            budget: config.chat_budget,
            count_system: config.chat_counts_system,
        }
    }

    /// Policy for the data-query agent.
    pub fn agent(config: &WindowConfig) -> Self {
        Self {
            budget: config.agent_budget,
            count_system: config.agent_counts_system,
        }
    }
}

/// Trim `messages` to fit `policy`.
///
/// System turns are always kept, in front. The most recent user turn is
/// always kept. The result never contains an assistant tool-call turn
/// without all of its results, or a tool result without its call.
///
/// # Example
/// ```
/// use querybridge::agent::window::{trim_messages, WindowPolicy};
/// use querybridge::session::Message;
///
/// let history = vec![
///     Message::system("You answer questions."),
///     Message::user("first question"),
///     Message::assistant("first answer"),
///     Message::user("second question"),
/// ];
/// let policy = WindowPolicy { budget: 12, count_system: false };
/// let trimmed = trim_messages(&history, policy);
/// assert_eq!(trimmed.len(), 2);
/// assert_eq!(trimmed[1].content, "second question");
/// ```
pub fn trim_messages(messages: &[Message], policy: WindowPolicy) -> Vec<Message> {
    let (system, rest): (Vec<&Message>, Vec<&Message>) =
        messages.iter().partition(|m| m.role == Role::System);

    let active = rest.iter().rposition(|m| m.role == Role::User);

    let mut remaining = policy.budget;
    if policy.count_system {
        let system_cost: usize = system.iter().map(|m| estimate_message(m)).sum();
        remaining = remaining.saturating_sub(system_cost);
    }

    let mut start = rest.len();
    let mut used = 0;
    for (idx, msg) in rest.iter().enumerate().rev() {
        let cost = estimate_message(msg);
        if used + cost > remaining {
            break;
        }
        used += cost;
        start = idx;
    }

    let mut kept = repair_pairing(&rest, start);

    if let Some(active) = active {
        if !kept.contains(&active) {
            kept.insert(0, active);
        }
    }

    let dropped = rest.len() - kept.len();
    if dropped > 0 {
        crate::log_component!(
            debug,
            "window",
            "Trimmed history to window",
            budget = policy.budget,
            kept = kept.len(),
            dropped = dropped,
        );
    }

    system
        .into_iter()
        .cloned()
        .chain(kept.into_iter().map(|idx| rest[idx].clone()))
        .collect()
}

/// Walk `rest[start..]` and return the indices that form a structurally
/// valid sequence.
fn repair_pairing(rest: &[&Message], start: usize) -> Vec<usize> {
    let mut kept = Vec::with_capacity(rest.len() - start);
    let mut idx = start;

    while idx < rest.len() {
        let msg = rest[idx];

        if msg.has_tool_calls() {
            let mut end = idx + 1;
            while end < rest.len() && rest[end].role == Role::Tool {
                end += 1;
            }
            if results_cover_calls(msg, &rest[idx + 1..end]) {
                kept.extend(idx..end);
            } else {
                debug!(
                    dropped = end - idx,
                    "Dropping tool-call turn with broken result pairing"
                );
            }
            idx = end;
            continue;
        }

        if msg.role == Role::Tool {
            debug!("Dropping orphaned tool result");
        } else {
            kept.push(idx);
        }
        idx += 1;
    }

    kept
}

/// Every result answers one of the calls, and every call is answered.
fn results_cover_calls(call_turn: &Message, results: &[&Message]) -> bool {
    let ids: HashSet<&str> = call_turn.tool_call_ids().into_iter().collect();
    let mut answered = HashSet::new();

    for result in results {
        match result.tool_call_id.as_deref() {
            Some(id) if ids.contains(id) => {
                answered.insert(id);
            }
            _ => return false,
        }
    }
    answered.len() == ids.len()
}

/// Whether `messages` satisfies the tool-call pairing rules.
pub fn is_structurally_valid(messages: &[Message]) -> bool {
    let rest: Vec<&Message> = messages.iter().filter(|m| m.role != Role::System).collect();
    let kept = repair_pairing(&rest, 0);
    kept.len() == rest.len()
}

/// Estimated cost of `messages` under `policy`'s system accounting.
pub fn window_cost(messages: &[Message], policy: WindowPolicy) -> usize {
    if policy.count_system {
        estimate_messages(messages)
    } else {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(estimate_message)
            .sum()
    }
}
