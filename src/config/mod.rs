//! Configuration module for News-Harvest
//!
//! This module handles loading, parsing, and validating TOML (or JSON)
//! configuration files. Command-line flags are layered on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use news_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Collecting {:?}", config.crawl.archives);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    parse_date, Config, CrawlSettings, EmbeddingSettings, FetchSettings, StorageSettings,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
