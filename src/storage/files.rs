//! File-backed post store
//!
//! Layout under the data directory:
//!
//! ```text
//! posts/{post_id}_{fingerprint[..8]}.json   canonical post
//! raw/{post_id}_raw.json                    original record (optional)
//! {export}.jsonl                            dataset export
//! ```

use crate::model::Post;
use crate::storage::traits::{PostStore, StorageError, StorageResult};
use crate::storage::{temp_path_for, write_atomic};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Characters of the fingerprint used in post file names
const FILE_FINGERPRINT_CHARS: usize = 8;

/// Result of a dataset export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub records: usize,
    /// Post files that could not be read or parsed
    pub skipped: usize,
}

/// Size of the stored collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub post_files: usize,
    pub total_bytes: u64,
    pub posts_dir: PathBuf,
    pub raw_dir: PathBuf,
}

/// Writes one JSON file per post
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    posts_dir: PathBuf,
    raw_dir: PathBuf,
    include_raw: bool,
    /// Post ids with at least one stored version
    known_ids: HashSet<i64>,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `data_dir`
    pub fn open(data_dir: &Path, include_raw: bool) -> StorageResult<Self> {
        let posts_dir = data_dir.join("posts");
        let raw_dir = data_dir.join("raw");

        for dir in [data_dir, posts_dir.as_path(), raw_dir.as_path()] {
            fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }

        let mut store = Self {
            data_dir: data_dir.to_path_buf(),
            posts_dir,
            raw_dir,
            include_raw,
            known_ids: HashSet::new(),
        };
        store.known_ids = store
            .list_post_files()?
            .iter()
            .filter_map(|path| post_id_of(path))
            .collect();

        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File name is id plus a fingerprint prefix, so edited posts get a new file
    pub fn post_path(&self, post: &Post) -> PathBuf {
        let fingerprint = post.fingerprint();
        self.posts_dir.join(format!(
            "{}_{}.json",
            post.post_id,
            &fingerprint[..FILE_FINGERPRINT_CHARS]
        ))
    }

    /// Writes a single post; returns `None` when its file already exists
    pub fn save_post(&mut self, post: &Post) -> StorageResult<Option<PathBuf>> {
        let path = self.post_path(post);
        if path.exists() {
            tracing::debug!("Post {} already stored at {}", post.post_id, path.display());
            return Ok(None);
        }

        let record = if self.include_raw {
            serde_json::to_vec(post)?
        } else {
            serde_json::to_vec(&post.without_raw())?
        };
        write_atomic(&path, &record)?;

        if self.include_raw {
            if let Some(raw) = &post.raw {
                let raw_path = self.raw_dir.join(format!("{}_raw.json", post.post_id));
                write_atomic(&raw_path, &serde_json::to_vec_pretty(raw)?)?;
            }
        }

        self.known_ids.insert(post.post_id);
        tracing::debug!("Saved post {} to {}", post.post_id, path.display());
        Ok(Some(path))
    }

    /// All stored post files in sorted order
    pub fn list_post_files(&self) -> StorageResult<Vec<PathBuf>> {
        let entries =
            fs::read_dir(&self.posts_dir).map_err(|e| StorageError::io(&self.posts_dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.posts_dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Reads a stored post back
    pub fn load_post(&self, path: &Path) -> StorageResult<Post> {
        let content = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Concatenates every stored post into a JSON-lines file in the data directory
    ///
    /// Unreadable post files are logged and skipped rather than failing the export.
    pub fn export_dataset(&self, file_name: &str) -> StorageResult<ExportSummary> {
        let output_path = self.data_dir.join(file_name);
        let temp_path = temp_path_for(&output_path);
        let files = self.list_post_files()?;

        let file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;
        let mut out = BufWriter::new(file);
        let mut records = 0;
        let mut skipped = 0;

        for post_file in &files {
            let parsed = fs::read(post_file)
                .map_err(|e| StorageError::io(post_file, e))
                .and_then(|bytes| {
                    serde_json::from_slice::<serde_json::Value>(&bytes).map_err(Into::into)
                });

            match parsed {
                Ok(value) => {
                    serde_json::to_writer(&mut out, &value)?;
                    out.write_all(b"\n")
                        .map_err(|e| StorageError::io(&temp_path, e))?;
                    records += 1;
                }
                Err(e) => {
                    tracing::error!("Skipping {} during export: {}", post_file.display(), e);
                    skipped += 1;
                }
            }
        }

        out.flush().map_err(|e| StorageError::io(&temp_path, e))?;
        drop(out);
        fs::rename(&temp_path, &output_path).map_err(|e| StorageError::io(&output_path, e))?;

        tracing::info!(
            "Exported {} posts to {} ({} skipped)",
            records,
            output_path.display(),
            skipped
        );

        Ok(ExportSummary {
            path: output_path,
            records,
            skipped,
        })
    }

    /// Counts stored post files and their total size
    pub fn stats(&self) -> StorageResult<StoreStats> {
        let files = self.list_post_files()?;
        let mut total_bytes = 0;
        for file in &files {
            total_bytes += fs::metadata(file)
                .map_err(|e| StorageError::io(file, e))?
                .len();
        }

        Ok(StoreStats {
            post_files: files.len(),
            total_bytes,
            posts_dir: self.posts_dir.clone(),
            raw_dir: self.raw_dir.clone(),
        })
    }
}

impl PostStore for FileStore {
    fn save_batch(&mut self, posts: &[Post]) -> StorageResult<Vec<PathBuf>> {
        let mut saved = Vec::with_capacity(posts.len());
        for post in posts {
            if let Some(path) = self.save_post(post)? {
                saved.push(path);
            }
        }

        tracing::info!(
            "Batch saved: {} written, {} already present",
            saved.len(),
            posts.len() - saved.len()
        );

        Ok(saved)
    }

    fn has_post_id(&self, post_id: i64) -> bool {
        self.known_ids.contains(&post_id)
    }
}

/// Post id from a `{post_id}_{fingerprint}.json` file name
fn post_id_of(path: &Path) -> Option<i64> {
    path.file_stem()?
        .to_str()?
        .split_once('_')
        .and_then(|(id, _)| id.parse().ok())
}
