//! News-Harvest: an incremental news-archive collector
//!
//! This crate turns a date range into persisted, enriched article records by
//! crawling the per-date listing pages of a set of news archives, extracting
//! each listed article, downloading its image, scoring it with a remote
//! embedding service and inserting it idempotently into storage.

pub mod adapter;
pub mod config;
pub mod crawler;
pub mod embedding;
pub mod fetch;
pub mod jobs;
pub mod report;
pub mod sites;
pub mod storage;

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for News-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown archive '{name}'. Should be one of: {known}")]
    UnknownArchive { name: String, known: String },

    #[error("Invalid crawl window: begin date {begin} is after end date {end}")]
    InvalidWindow { begin: NaiveDate, end: NaiveDate },

    #[error("No archives selected for collection")]
    NoArchives,

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] embedding::EnrichmentError),

    #[error("Invalid URL pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crawler::ItemState,
        to: crawler::ItemState,
    },

    #[error("Job not found: {0}")]
    JobNotFound(u64),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid date '{0}', expected dd-mm-yyyy or yyyy-mm-dd")]
    InvalidDate(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for News-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use adapter::{ArchiveId, Registry, SiteAdapter};
pub use config::Config;
pub use crawler::{CrawlWindow, FrontierItem, Orchestrator, StopSignal};
pub use report::RunReport;
pub use storage::{ArticleRecord, SqliteStorage, Storage};
