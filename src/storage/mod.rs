//! Storage module for persisting harvested posts
//!
//! This module handles everything written to disk besides the checkpoint
//! and dedup set:
//! - One JSON file per accepted post, plus optional raw records
//! - JSON-lines dataset export
//! - Atomic file replacement shared with the state module

mod files;
mod traits;

pub use files::{ExportSummary, FileStore, StoreStats};
pub use traits::{NullStore, PostStore, StorageError, StorageResult};

use std::fs;
use std::path::{Path, PathBuf};

/// Replaces `path` with `contents` via a sibling temp file and rename
///
/// Readers either see the previous file or the complete new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, contents).map_err(|e| StorageError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

/// Sibling path used while a file is being rewritten
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
