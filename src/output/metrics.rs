use crate::model::ScrapingStats;
use crate::storage::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// One line of the metrics history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub timestamp: DateTime<Utc>,
    pub stop_reason: String,
    pub total_posts: u64,
    pub total_comments: u64,
    pub new_posts: u64,
    pub updated_posts: u64,
    pub duplicates_skipped: u64,
    pub errors: u64,
    pub empty_pages: u64,
    pub retries: u64,
    pub duration_seconds: f64,
    pub success_rate: f64,
    pub http_status_codes: BTreeMap<u16, u64>,
}

impl MetricsRecord {
    pub fn from_stats(stats: &ScrapingStats, stop_reason: impl ToString) -> Self {
        Self {
            timestamp: Utc::now(),
            stop_reason: stop_reason.to_string(),
            total_posts: stats.total_posts,
            total_comments: stats.total_comments,
            new_posts: stats.new_posts,
            updated_posts: stats.updated_posts,
            duplicates_skipped: stats.duplicates_skipped,
            errors: stats.errors,
            empty_pages: stats.empty_pages,
            retries: stats.retries,
            duration_seconds: stats.duration().num_milliseconds() as f64 / 1000.0,
            success_rate: stats.success_rate(),
            http_status_codes: stats.http_status_codes.clone(),
        }
    }
}

/// Appends one record to a JSON-lines metrics file
pub fn append_metrics(path: &Path, record: &MetricsRecord) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(&line))
        .map_err(|e| StorageError::io(path, e))?;

    tracing::debug!("Appended metrics to {}", path.display());
    Ok(())
}
