use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Number of content characters folded into a post fingerprint
pub const FINGERPRINT_CONTENT_CHARS: usize = 100;

/// Kind of media attached to a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// Media attachment in a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl MediaAttachment {
    /// Wraps a bare URL as an image attachment
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            url: url.into(),
            thumbnail_url: None,
        }
    }
}

/// Whether a comment answers the post itself or another comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyType {
    Post,
    Comment,
}

impl ReplyType {
    /// Derived solely from the reply-target username
    pub fn from_target(reply_to_username: Option<&str>) -> Self {
        match reply_to_username {
            Some(name) if !name.is_empty() => Self::Comment,
            _ => Self::Post,
        }
    }
}

/// A comment attached to a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: Option<i64>,
    pub username: String,
    pub avatar_url: Option<String>,
    pub user_type: Option<i64>,
    pub user_type_label: String,
    pub comment_time: String,
    pub comment_content: String,
    pub like_count: u64,
    pub reply_to_username: Option<String>,
    pub reply_type: ReplyType,
    pub uid: Option<i64>,
    pub gender: Option<i64>,
    pub doctor_id: Option<i64>,
    pub is_zan: Option<i64>,
    pub ip_province: Option<String>,
    pub source_url: String,
}

/// A harvested post with its comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    /// Upstream display time, often relative ("今天 14:51")
    pub publish_time: String,
    pub content: String,
    pub view_count: u64,
    pub warm_count: u64,
    pub visit_count: u64,
    pub topic_id: Option<i64>,
    pub topic_title: Option<String>,
    pub post_url: String,
    pub source_url: String,
    pub uid: Option<i64>,
    pub gender: Option<i64>,
    pub is_anonymous: bool,
    pub ask_tag: Option<String>,
    pub reply_counter: u64,
    pub is_hot: Option<i64>,
    pub is_top: Option<i64>,
    pub platform: Option<String>,
    pub ip_province: Option<String>,
    #[serde(default)]
    pub small_attachments: Vec<MediaAttachment>,
    #[serde(default)]
    pub big_attachments: Vec<MediaAttachment>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub scraped_at: DateTime<Utc>,
    /// Original API record, kept for audit when raw capture is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Post {
    /// Identity key used for deduplication across runs
    pub fn fingerprint(&self) -> String {
        fingerprint(self.post_id, &self.content, &self.publish_time)
    }

    /// Upstream author id, `None` for anonymous posts
    pub fn author_id(&self) -> Option<i64> {
        if self.is_anonymous {
            None
        } else {
            self.uid
        }
    }

    /// Returns a copy without the raw record
    pub fn without_raw(&self) -> Self {
        Self {
            raw: None,
            ..self.clone()
        }
    }
}

/// Hex SHA-1 over `"{post_id}_{content prefix}_{publish_time}"`
///
/// The prefix is the first [`FINGERPRINT_CONTENT_CHARS`] characters (not bytes),
/// so multi-byte content never gets split mid-character.
pub fn fingerprint(post_id: i64, content: &str, publish_time: &str) -> String {
    let prefix: String = content.chars().take(FINGERPRINT_CONTENT_CHARS).collect();
    let mut hasher = Sha1::new();
    hasher.update(format!("{}_{}_{}", post_id, prefix, publish_time).as_bytes());
    hex::encode(hasher.finalize())
}
