//! Configuration module for Post-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section except `[api]` is optional and falls back to conservative defaults.
//!
//! # Example
//!
//! ```no_run
//! use post_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Requests per second: {}", config.rate_limit.qps);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, BackoffConfig, Config, HttpConfig, RateLimitConfig, ScrapeConfig, StorageConfig,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::validate;
