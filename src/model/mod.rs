//! Canonical entities produced by a harvest
//!
//! - `Post` / `Comment` / `MediaAttachment`: the records persisted to disk
//! - `fingerprint`: the content-derived identity used for deduplication
//! - `ScrapingStats`: per-process counters exposed to callers

mod post;
mod stats;

pub use post::{
    fingerprint, Comment, MediaAttachment, MediaKind, Post, ReplyType, FINGERPRINT_CONTENT_CHARS,
};
pub use stats::ScrapingStats;
