//! Session module - thread persistence and answer history
//!
//! This module provides the two storage collaborators the engine talks to:
//! - [`ConversationStore`]: thread-keyed turn storage, implemented by [`ThreadStore`]
//!   (in-memory cache with optional one-JSON-file-per-thread persistence)
//! - [`HistorySink`]: durable question/answer log, implemented by [`HistoryStore`]
//!
//! # Example
//!
//! ```
//! use querybridge::session::{ConversationStore, Message, Thread, ThreadStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = ThreadStore::new_memory();
//!
//!     let mut thread = Thread::new("t-1");
//!     thread.replace_messages(vec![Message::user("Hello!"), Message::assistant("Hi!")]);
//!     store.save(&thread).await.unwrap();
//!
//!     let loaded = store.load("t-1").await.unwrap().unwrap();
//!     assert_eq!(loaded.messages.len(), 2);
//! }
//! ```

pub mod history;
pub mod presets;
pub mod types;

pub use history::{Feedback, HistoryPage, HistoryRecord, HistorySink, HistoryStore, HistoryTable};
pub use presets::{preset_page, PresetPage, PresetQuestion};
pub use types::{Message, Role, Thread, ToolCall};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Request metadata key naming the user a new thread belongs to.
pub const OWNER_METADATA_KEY: &str = "user_id";

/// Largest page any listing returns.
pub const MAX_PAGE_SIZE: usize = 100;

/// Offset of a 1-based page.
pub(crate) fn page_offset(page: usize, limit: usize) -> Result<usize> {
    if page == 0 {
        return Err(BridgeError::Session("page numbers start at 1".to_string()));
    }
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(BridgeError::Session(format!(
            "page size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, limit
        )));
    }
    Ok((page - 1) * limit)
}

/// Thread-keyed conversation state storage.
///
/// The engine calls `load` once at the start of a request and `save` once
/// after a full answer has been assembled.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a thread, or `None` if it has never been saved.
    async fn load(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Persist a thread, replacing any previous version.
    async fn save(&self, thread: &Thread) -> Result<()>;
}

/// Listing entry for a stored thread.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub id: String,
    pub title: Option<String>,
    pub owner: Option<String>,
    pub turns: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A page of threads, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadPage {
    pub items: Vec<ThreadSummary>,
    pub has_more: bool,
}

/// Thread store with an in-memory cache and optional file persistence.
///
/// # Thread Safety
///
/// The store uses `Arc<RwLock>` internally, making it safe to clone
/// and share across async tasks. Serializing writers for the same thread is
/// the engine's job, not the store's.
///
/// # Persistence
///
/// When created with `with_path()`, threads are written as
/// `<dir>/<percent-encoded id>.json`. Use `new_memory()` for tests.
pub struct ThreadStore {
    threads: Arc<RwLock<HashMap<String, Thread>>>,
    storage_path: Option<PathBuf>,
}

impl ThreadStore {
    /// Create an in-memory store without persistence.
    pub fn new_memory() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
            storage_path: None,
        }
    }

    /// Create a store persisting threads under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    ///
    /// # Example
    /// ```no_run
    /// use querybridge::session::ThreadStore;
    /// use std::path::PathBuf;
    ///
    /// let store = ThreadStore::with_path(PathBuf::from("/tmp/threads")).unwrap();
    /// ```
    pub fn with_path(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
            storage_path: Some(path),
        })
    }

    fn file_for(&self, id: &str) -> Option<PathBuf> {
        self.storage_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", Self::sanitize_key(id))))
    }

    /// Summaries of every known thread, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the storage directory fails. Unreadable
    /// thread files are skipped.
    pub async fn list(&self) -> Result<Vec<ThreadSummary>> {
        let mut by_id: HashMap<String, ThreadSummary> = HashMap::new();

        if let Some(ref storage_path) = self.storage_path {
            let mut dir_entries = tokio::fs::read_dir(storage_path).await?;
            while let Some(entry) = dir_entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    if let Ok(content) = tokio::fs::read_to_string(&path).await {
                        if let Ok(thread) = serde_json::from_str::<Thread>(&content) {
                            by_id.insert(thread.id.clone(), summarize(&thread));
                        }
                    }
                }
            }
        }

        {
            let threads = self.threads.read().await;
            for thread in threads.values() {
                by_id.insert(thread.id.clone(), summarize(thread));
            }
        }

        let mut summaries: Vec<ThreadSummary> = by_id.into_values().collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    /// Page through threads newest-created first, optionally only one
    /// owner's.
    ///
    /// `before` is the id of the last thread of the previous page; only
    /// threads created before it are returned.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `before` names no listed thread, or a session
    /// error for an invalid page size.
    pub async fn page(
        &self,
        owner: Option<&str>,
        before: Option<&str>,
        limit: usize,
    ) -> Result<ThreadPage> {
        page_offset(1, limit)?;

        let mut summaries: Vec<ThreadSummary> = self
            .list()
            .await?
            .into_iter()
            .filter(|s| owner.is_none() || s.owner.as_deref() == owner)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let start = match before {
            Some(cursor) => {
                summaries
                    .iter()
                    .position(|s| s.id == cursor)
                    .ok_or_else(|| BridgeError::NotFound(format!("thread {}", cursor)))?
                    + 1
            }
            None => 0,
        };

        let mut items: Vec<ThreadSummary> =
            summaries.into_iter().skip(start).take(limit + 1).collect();
        let has_more = items.len() > limit;
        items.truncate(limit);
        Ok(ThreadPage { items, has_more })
    }

    /// Delete a thread from memory and disk.
    pub async fn delete(&self, id: &str) -> Result<()> {
        {
            let mut threads = self.threads.write().await;
            threads.remove(id);
        }
        if let Some(file_path) = self.file_for(id) {
            if file_path.exists() {
                tokio::fs::remove_file(&file_path).await?;
            }
        }
        Ok(())
    }

    /// Sanitize a thread id for use as a filename.
    ///
    /// Uses percent-encoding so distinct ids never collide on disk.
    fn sanitize_key(key: &str) -> String {
        let mut result = String::with_capacity(key.len() * 3);
        for c in key.chars() {
            match c {
                '/' => result.push_str("%2F"),
                '\\' => result.push_str("%5C"),
                ':' => result.push_str("%3A"),
                '*' => result.push_str("%2A"),
                '?' => result.push_str("%3F"),
                '"' => result.push_str("%22"),
                '<' => result.push_str("%3C"),
                '>' => result.push_str("%3E"),
                '|' => result.push_str("%7C"),
                '%' => result.push_str("%25"),
                c => result.push(c),
            }
        }
        result
    }
}

fn summarize(thread: &Thread) -> ThreadSummary {
    ThreadSummary {
        id: thread.id.clone(),
        title: thread.title.clone(),
        owner: thread.owner.clone(),
        turns: thread.messages.len(),
        created_at: thread.created_at,
        updated_at: thread.updated_at,
    }
}

#[async_trait]
impl ConversationStore for ThreadStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Thread>> {
        {
            let threads = self.threads.read().await;
            if let Some(thread) = threads.get(thread_id) {
                return Ok(Some(thread.clone()));
            }
        }

        if let Some(file_path) = self.file_for(thread_id) {
            if file_path.exists() {
                let content = tokio::fs::read_to_string(&file_path).await?;
                let thread: Thread = serde_json::from_str(&content)?;
                let mut threads = self.threads.write().await;
                threads.insert(thread_id.to_string(), thread.clone());
                return Ok(Some(thread));
            }
        }

        Ok(None)
    }

    async fn save(&self, thread: &Thread) -> Result<()> {
        // The cache only reflects what reached disk.
        if let Some(file_path) = self.file_for(&thread.id) {
            let content = serde_json::to_string_pretty(thread)?;
            tokio::fs::write(&file_path, content).await?;
            debug!(thread_id = %thread.id, path = %file_path.display(), "Thread persisted");
        }

        let mut threads = self.threads.write().await;
        threads.insert(thread.id.clone(), thread.clone());
        Ok(())
    }
}

impl Clone for ThreadStore {
    fn clone(&self) -> Self {
        Self {
            threads: Arc::clone(&self.threads),
            storage_path: self.storage_path.clone(),
        }
    }
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new_memory()
    }
}
