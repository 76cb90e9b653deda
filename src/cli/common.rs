//! Shared CLI helpers used across multiple command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use querybridge::agent::ConversationEngine;
use querybridge::config::Config;
use querybridge::providers::{OpenAIProvider, DEFAULT_API_BASE};
use querybridge::session::{HistoryStore, ThreadStore};
use querybridge::tools::ToolRegistry;

/// Open the file-backed thread store.
pub(crate) fn open_threads(config: &Config) -> Result<ThreadStore> {
    let dir = config.threads_dir();
    ThreadStore::with_path(dir.clone())
        .with_context(|| format!("Failed to open thread store at {}", dir.display()))
}

/// Open the file-backed history store.
pub(crate) fn open_history(config: &Config) -> Result<HistoryStore> {
    let path = config.history_file();
    HistoryStore::with_path(path.clone())
        .with_context(|| format!("Failed to open history at {}", path.display()))
}

/// Build an engine from configuration.
pub(crate) fn create_engine(config: Config) -> Result<Arc<ConversationEngine>> {
    config.validate()?;

    let api_key = config
        .provider
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .context("No API key configured. Set QUERYBRIDGE_PROVIDER_API_KEY or provider.api_key")?;
    let api_base = config
        .provider
        .api_base
        .clone()
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let provider = OpenAIProvider::with_base_url(&api_key, &api_base)
        .with_default_model(&config.agents.model);

    // Data tools need a database and a vector index supplied by the host
    // application; the command line runs conversation-only.
    let tools = ToolRegistry::new();
    warn!("No data tools configured; data questions will be answered without tools");

    let threads = open_threads(&config)?;
    let history = open_history(&config)?;

    Ok(Arc::new(ConversationEngine::new(
        config,
        Arc::new(provider),
        Arc::new(tools),
        Arc::new(threads),
        Arc::new(history),
    )))
}
