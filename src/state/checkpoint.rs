use crate::model::Post;
use crate::storage::{write_atomic, StorageResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Durable harvest cursor
///
/// Created empty on the first run, read when the engine starts, and updated
/// only after a batch has been fully persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Highest post id collected by the most recent run
    #[serde(default)]
    pub last_post_id: Option<i64>,

    /// Display time of that post
    #[serde(default)]
    pub last_post_time: Option<String>,

    #[serde(default = "Utc::now", deserialize_with = "deserialize_run_time")]
    pub last_run_time: DateTime<Utc>,

    /// Posts accepted across all runs; only ever incremented
    #[serde(default)]
    pub total_posts_scraped: u64,

    /// Opaque pagination cursor for APIs that hand one out
    #[serde(default)]
    pub cursor: Option<String>,
}

impl Checkpoint {
    /// A checkpoint for a store that has never been harvested
    pub fn fresh() -> Self {
        Self {
            last_post_id: None,
            last_post_time: None,
            last_run_time: Utc::now(),
            total_posts_scraped: 0,
            cursor: None,
        }
    }

    /// First page not yet covered by earlier runs (1-based)
    pub fn resume_page(&self, page_size: u32) -> u32 {
        let covered = self.total_posts_scraped / u64::from(page_size.max(1));
        u32::try_from(covered)
            .unwrap_or(u32::MAX - 1)
            .saturating_add(1)
    }

    /// How many more posts a cumulative target still needs
    pub fn remaining_toward(&self, target: u64) -> u64 {
        target.saturating_sub(self.total_posts_scraped)
    }

    /// Folds a finished run into the checkpoint
    ///
    /// The high-water fields come from the highest post id in `posts` alone.
    /// `total_posts_scraped` grows by the number of posts collected.
    pub fn record_run(&mut self, posts: &[Post]) {
        if let Some(latest) = posts.iter().max_by_key(|p| p.post_id) {
            self.last_post_id = Some(latest.post_id);
            self.last_post_time = Some(latest.publish_time.clone());
        }
        self.total_posts_scraped += posts.len() as u64;
        self.last_run_time = Utc::now();
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Accepts RFC 3339 as well as offset-less timestamps, which are read as UTC
///
/// `null` means the time is unknown and reads as now.
fn deserialize_run_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(Utc::now());
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Reads and writes the checkpoint file
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint, falling back to a fresh one
    ///
    /// A missing, unreadable or corrupt file is never fatal.
    pub fn load(&self) -> Checkpoint {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No checkpoint at {}, starting fresh", self.path.display());
                return Checkpoint::fresh();
            }
            Err(e) => {
                tracing::warn!("Failed to read checkpoint {}: {}", self.path.display(), e);
                return Checkpoint::fresh();
            }
        };

        match serde_json::from_str(&content) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!("Ignoring corrupt checkpoint {}: {}", self.path.display(), e);
                Checkpoint::fresh()
            }
        }
    }

    /// Atomically replaces the checkpoint file
    pub fn save(&self, checkpoint: &Checkpoint) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(checkpoint)?;
        write_atomic(&self.path, &json)?;
        tracing::info!(
            "Checkpoint saved: last_post_id={:?}, total_posts_scraped={}",
            checkpoint.last_post_id,
            checkpoint.total_posts_scraped
        );
        Ok(())
    }
}
