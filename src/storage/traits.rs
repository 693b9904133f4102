//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::adapter::ArchiveId;
use crate::crawler::CrawlWindow;
use crate::storage::ArticleRecord;
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every method takes `&self`: implementations are shared between workers
/// behind an `Arc` and must serialize access internally.
pub trait Storage: Send + Sync {
    /// Ensures the record table exists
    fn create_table(&self) -> StorageResult<()>;

    /// Inserts records, silently skipping any whose link is already stored
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn insert_batch(&self, records: &[ArticleRecord]) -> StorageResult<usize>;

    /// Links already stored for an archive within a date window
    fn get_done_links(
        &self,
        archive: &ArchiveId,
        window: &CrawlWindow,
    ) -> StorageResult<HashSet<String>>;

    /// Dates that already have at least one stored record for an archive
    fn get_done_dates(
        &self,
        archive: &ArchiveId,
        window: &CrawlWindow,
    ) -> StorageResult<HashSet<NaiveDate>>;

    /// Total number of records stored for an archive
    fn count_archive(&self, archive: &ArchiveId) -> StorageResult<u64>;

    /// Looks a record up by its link
    fn get_record(&self, link: &str) -> StorageResult<Option<ArticleRecord>>;
}
