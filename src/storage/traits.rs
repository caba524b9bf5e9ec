//! Storage traits and error types
//!
//! This module defines the trait interface for post sinks and the
//! associated error types.

use crate::model::Post;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Wraps an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for accepted posts
///
/// The engine hands every run's collection to a `PostStore` before the
/// dedup set and checkpoint are flushed, so a failed write never advances
/// the durable cursor past unsaved posts.
pub trait PostStore {
    /// Persists a batch of posts
    ///
    /// # Returns
    ///
    /// Paths of the records that were newly written. Posts whose record
    /// already exists are skipped and not included.
    fn save_batch(&mut self, posts: &[Post]) -> StorageResult<Vec<PathBuf>>;

    /// Whether some version of this post is already stored
    fn has_post_id(&self, _post_id: i64) -> bool {
        false
    }
}

/// Discards everything; for dry runs and tests that only inspect the engine output
#[derive(Debug, Default)]
pub struct NullStore;

impl PostStore for NullStore {
    fn save_batch(&mut self, _posts: &[Post]) -> StorageResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}
