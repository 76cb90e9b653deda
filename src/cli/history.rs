//! History, feedback, thread and preset listing command handlers.

use anyhow::{Context, Result};

use querybridge::config::Config;
use querybridge::session::{preset_page, Feedback};

use super::common::{open_history, open_threads};

/// Print one page of a thread's history as JSON.
pub(crate) async fn cmd_history(
    config: &Config,
    thread_id: &str,
    before: Option<i64>,
    limit: usize,
) -> Result<()> {
    let history = open_history(config)?;
    let page = history.feed(thread_id, before, limit).await;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

/// Rate an answer.
pub(crate) async fn cmd_feedback(config: &Config, history_id: i64, value: &str) -> Result<()> {
    let feedback: Feedback = value.parse()?;
    let history = open_history(config)?;
    history
        .set_feedback(history_id, feedback)
        .await
        .with_context(|| format!("Failed to record feedback for {}", history_id))?;
    println!("Recorded {:?} for history {}", feedback, history_id);
    Ok(())
}

/// Print one page of the whole history log as JSON.
pub(crate) async fn cmd_history_table(config: &Config, page: usize, limit: usize) -> Result<()> {
    let history = open_history(config)?;
    let table = history.table(page, limit).await?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}

/// Delete a stored thread.
pub(crate) async fn cmd_delete_thread(config: &Config, thread_id: &str) -> Result<()> {
    let threads = open_threads(config)?;
    threads
        .delete(thread_id)
        .await
        .with_context(|| format!("Failed to delete thread {}", thread_id))?;
    println!("Deleted thread {}", thread_id);
    Ok(())
}

/// List threads newest first, optionally one user's.
pub(crate) async fn cmd_threads(
    config: &Config,
    user: Option<&str>,
    before: Option<&str>,
    limit: usize,
) -> Result<()> {
    let threads = open_threads(config)?;
    let page = threads.page(user, before, limit).await?;
    if page.items.is_empty() {
        println!("No threads yet.");
        return Ok(());
    }
    for summary in &page.items {
        println!(
            "{}  {}  {:>3} turns  {}",
            summary.created_at.format("%Y-%m-%d %H:%M"),
            summary.id,
            summary.turns,
            summary.title.as_deref().unwrap_or("(untitled)")
        );
    }
    if let Some(last) = page.items.last().filter(|_| page.has_more) {
        println!("More threads: --before {}", last.id);
    }
    Ok(())
}

/// Print one page of the configured preset questions as JSON.
pub(crate) fn cmd_presets(config: &Config, page: usize, limit: usize) -> Result<()> {
    let presets = preset_page(&config.presets, page, limit)?;
    println!("{}", serde_json::to_string_pretty(&presets)?);
    Ok(())
}
