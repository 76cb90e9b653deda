//! Answer history for QueryBridge.
//!
//! Every successfully answered turn is appended here as a question/answer
//! record with the caller's metadata. Records carry a numeric id that is
//! handed back to the caller in the `history_id` meta frame, and can later be
//! paged through per thread or rated with [`Feedback`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{BridgeError, Result};

use super::page_offset;

/// Durable question/answer log consumed by the engine.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Append one answered turn, returning its history id.
    async fn append(
        &self,
        question: &str,
        answer: &str,
        thread_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<i64>;
}

/// Caller rating of an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    #[default]
    None,
    Like,
    Dislike,
}

impl std::str::FromStr for Feedback {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Feedback::None),
            "like" | "up" | "1" => Ok(Feedback::Like),
            "dislike" | "down" | "2" => Ok(Feedback::Dislike),
            other => Err(BridgeError::History(format!(
                "unknown feedback value '{}'",
                other
            ))),
        }
    }
}

/// One answered turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub thread_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub feedback: Feedback,
    pub created_at: DateTime<Utc>,
}

/// A page of history records, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub items: Vec<HistoryRecord>,
    pub has_more: bool,
}

/// A page of the whole history log with the overall record count.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryTable {
    pub items: Vec<HistoryRecord>,
    pub total_count: usize,
}

/// History store backed by memory with optional JSON file persistence.
///
/// The whole log is rewritten on every mutation, which is fine for the
/// volumes a single deployment sees per file.
pub struct HistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// Create an in-memory store.
    pub fn new_memory() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Open (or create) a file-backed store.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or an
    /// existing file cannot be parsed.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        Ok(Self {
            records: RwLock::new(records),
            path: Some(path),
        })
    }

    async fn flush(&self, records: &[HistoryRecord]) -> Result<()> {
        if let Some(ref path) = self.path {
            let content = serde_json::to_string_pretty(records)?;
            tokio::fs::write(path, content).await?;
        }
        Ok(())
    }

    /// Page through a thread's history, newest first.
    ///
    /// `before` excludes records with an id greater than or equal to it. One
    /// extra record is looked up to compute `has_more`.
    pub async fn feed(&self, thread_id: &str, before: Option<i64>, limit: usize) -> HistoryPage {
        let records = self.records.read().await;
        let mut matching: Vec<HistoryRecord> = records
            .iter()
            .rev()
            .filter(|r| r.thread_id == thread_id)
            .filter(|r| before.map(|b| r.id < b).unwrap_or(true))
            .take(limit + 1)
            .cloned()
            .collect();

        let has_more = matching.len() > limit;
        matching.truncate(limit);
        HistoryPage {
            items: matching,
            has_more,
        }
    }

    /// One page of the whole log across threads, newest first.
    ///
    /// # Errors
    ///
    /// Returns a session error when `page` is 0 or `limit` is out of range.
    pub async fn table(&self, page: usize, limit: usize) -> Result<HistoryTable> {
        let offset = page_offset(page, limit)?;
        let records = self.records.read().await;
        Ok(HistoryTable {
            items: records.iter().rev().skip(offset).take(limit).cloned().collect(),
            total_count: records.len(),
        })
    }

    /// Rate an answer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has this id.
    pub async fn set_feedback(&self, history_id: i64, feedback: Feedback) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == history_id)
            .ok_or_else(|| BridgeError::NotFound(format!("history record {}", history_id)))?;
        let previous = std::mem::replace(&mut record.feedback, feedback);
        if let Err(e) = self.flush(&records).await {
            if let Some(record) = records.iter_mut().find(|r| r.id == history_id) {
                record.feedback = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Look up a single record.
    pub async fn get(&self, history_id: i64) -> Option<HistoryRecord> {
        let records = self.records.read().await;
        records.iter().find(|r| r.id == history_id).cloned()
    }
}

#[async_trait]
impl HistorySink for HistoryStore {
    async fn append(
        &self,
        question: &str,
        answer: &str,
        thread_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<i64> {
        let mut records = self.records.write().await;
        let id = records.last().map(|r| r.id + 1).unwrap_or(1);
        records.push(HistoryRecord {
            id,
            thread_id: thread_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            metadata: metadata.clone(),
            feedback: Feedback::None,
            created_at: Utc::now(),
        });
        if let Err(e) = self.flush(&records).await {
            // Unwritten records must not be visible or consume their id.
            records.pop();
            return Err(e);
        }
        debug!(history_id = id, thread_id = %thread_id, "History record appended");
        Ok(id)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new_memory()
    }
}
