//! Storage module for persisting collected articles
//!
//! This module handles all persistence for the collector:
//! - SQLite database initialization and schema management
//! - Idempotent batch inserts keyed by article link
//! - Done-link and done-date queries used by dedup and frontier pruning
//! - Image files on disk

mod images;
mod schema;
mod sqlite;
mod traits;

pub use images::{hash_link, ImageStore};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::adapter::ArchiveId;
use chrono::NaiveDate;
use std::path::PathBuf;

/// One collected article
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub date: NaiveDate,
    pub archive: ArchiveId,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag: Option<String>,
    pub image: Option<ImageRef>,
    pub link: String,
    pub embedding: Option<Vec<f32>>,
}

impl ArticleRecord {
    /// Creates a record with only its identity filled in
    pub fn new(date: NaiveDate, archive: ArchiveId, link: impl Into<String>) -> Self {
        Self {
            date,
            archive,
            title: None,
            content: None,
            tag: None,
            image: None,
            link: link.into(),
            embedding: None,
        }
    }

    /// Text sent to the embedding service: title, content and tag on
    /// separate lines, missing fields left empty
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.title.as_deref().unwrap_or_default(),
            self.content.as_deref().unwrap_or_default(),
            self.tag.as_deref().unwrap_or_default()
        )
    }
}

/// Where a record's image ended up
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    /// Written to disk at this path
    Stored(PathBuf),
    /// Disk write failed; the raw bytes travel with the record
    Inline(Vec<u8>),
}
