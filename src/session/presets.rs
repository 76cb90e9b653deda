//! Preset questions offered to users before they type their own.
//!
//! The list comes from configuration and is served in pages, in the order it
//! was configured.

use serde::Serialize;

use crate::error::Result;

use super::page_offset;

/// A configured starter question. Ids are 1-based positions in the list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetQuestion {
    pub id: usize,
    pub content: String,
}

/// One page of preset questions.
#[derive(Debug, Clone, Serialize)]
pub struct PresetPage {
    pub items: Vec<PresetQuestion>,
    pub total_count: usize,
}

/// Slice a page out of the configured preset questions.
///
/// Blank entries are skipped and do not consume an id.
///
/// # Errors
///
/// Returns a session error when `page` is 0 or `limit` is out of range.
pub fn preset_page(questions: &[String], page: usize, limit: usize) -> Result<PresetPage> {
    let offset = page_offset(page, limit)?;
    let usable: Vec<&str> = questions
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .collect();

    let items = usable
        .iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(idx, content)| PresetQuestion {
            id: idx + 1,
            content: content.to_string(),
        })
        .collect();

    Ok(PresetPage {
        items,
        total_count: usable.len(),
    })
}
