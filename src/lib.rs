//! Post-Harvest: an incremental, resumable harvester for paginated post feeds
//!
//! This crate walks a paginated list API page by page, converts each record into
//! a canonical [`model::Post`], filters records that were already persisted in a
//! previous run, and keeps a durable checkpoint so interrupted runs resume
//! without losing or double-counting progress.

pub mod config;
pub mod dates;
pub mod harvest;
pub mod model;
pub mod output;
pub mod parser;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Post-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Post-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{HarvestRun, PaginationEngine, RunOptions, StopReason};
pub use model::{Comment, Post, ScrapingStats};
pub use state::{Checkpoint, DedupStore};
