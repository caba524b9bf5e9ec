use crate::model::Post;
use crate::storage::{write_atomic, StorageError, StorageResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Set of fingerprints that have already been persisted
///
/// Loaded once, grown in memory during a run, and rewritten in full on
/// every flush. Nothing is ever removed, so a fingerprint that was flushed
/// once stays a duplicate for every later run.
#[derive(Debug, Clone)]
pub struct DedupStore {
    path: PathBuf,
    seen: HashSet<String>,
}

impl DedupStore {
    /// Loads the set from `path`; a missing file yields an empty set
    pub fn load(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let seen = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        tracing::info!("Loaded {} seen fingerprints from {}", seen.len(), path.display());
        Ok(Self { path, seen })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_duplicate(&self, post: &Post) -> bool {
        self.contains(&post.fingerprint())
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Records the post's fingerprint; repeated calls have no further effect
    pub fn mark_seen(&mut self, post: &Post) {
        self.seen.insert(post.fingerprint());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Rewrites the whole set as sorted, newline-delimited fingerprints
    pub fn flush(&self) -> StorageResult<()> {
        let mut fingerprints: Vec<&str> = self.seen.iter().map(String::as_str).collect();
        fingerprints.sort_unstable();

        let mut content = fingerprints.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        write_atomic(&self.path, content.as_bytes())?;
        tracing::debug!("Flushed {} fingerprints to {}", self.seen.len(), self.path.display());
        Ok(())
    }
}
