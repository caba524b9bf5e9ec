//! Record parser for list API payloads
//!
//! Converts one loosely typed record into a canonical [`Post`]. The upstream API
//! has renamed several fields over time, so every logical field is resolved
//! through an ordered alias list (see [`fields`]). Missing optional fields fall
//! back to null, zero or empty; only a missing or unusable post id makes a record
//! unparseable.

pub mod fields;

use crate::model::{Comment, MediaAttachment, MediaKind, Post, ReplyType};
use chrono::Utc;
use fields::{get_array, get_count, get_i64, get_string, RawRecord};
use serde_json::Value;
use thiserror::Error;

/// Display name the upstream uses for posts without a visible author
pub const ANONYMOUS_USERNAME: &str = "匿名";

/// Label for `user_type == 1`
pub const COUNSELOR_LABEL: &str = "倾诉师/解答师";

/// Label for every other user type
pub const ORDINARY_USER_LABEL: &str = "普通用户";

const POST_ID: &[&str] = &["id", "askId"];
const PUBLISH_TIME: &[&str] = &["timeStr", "time_str"];
const AVATAR: &[&str] = &["avatar", "header"];
const IP_PROVINCE: &[&str] = &["ipProvince", "ip"];

const COMMENT_TIME: &[&str] = &["answerCreateTime", "time_str"];
const COMMENT_USER_TYPE: &[&str] = &["userType", "user_type"];
const COMMENT_REPLY_TO: &[&str] = &["toName", "to_name"];
const COMMENT_DOCTOR_ID: &[&str] = &["doctorId", "doctor_id"];

/// Why a record could not be turned into a post
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no post id")]
    MissingId,

    #[error("record has an unusable post id: {0}")]
    InvalidId(String),
}

/// Maps raw list records to posts
#[derive(Debug, Clone)]
pub struct RecordParser {
    post_url_base: String,
    keep_raw: bool,
}

impl RecordParser {
    /// Creates a parser that links posts under `post_url_base`
    pub fn new(post_url_base: impl Into<String>) -> Self {
        Self {
            post_url_base: post_url_base.into().trim_end_matches('/').to_string(),
            keep_raw: false,
        }
    }

    /// Keeps a copy of the original record on each parsed post
    pub fn keep_raw(mut self, keep_raw: bool) -> Self {
        self.keep_raw = keep_raw;
        self
    }

    /// Parses one record
    ///
    /// # Arguments
    ///
    /// * `raw` - The record as received
    /// * `source_url` - Where the record was obtained (list endpoint or page URL)
    pub fn parse(&self, raw: &Value, source_url: &str) -> Result<Post, ParseError> {
        let record = raw.as_object().ok_or(ParseError::NotAnObject)?;
        let post_id = parse_post_id(record)?;
        let uid = get_i64(record, &["uid"]);

        let comments = get_array(record, &["comments"])
            .iter()
            .filter_map(|entry| match entry.as_object() {
                Some(comment) => Some(parse_comment(comment, source_url)),
                None => {
                    tracing::trace!("Skipping non-object comment on post {}", post_id);
                    None
                }
            })
            .collect();

        Ok(Post {
            post_id,
            username: get_string(record, &["name"])
                .unwrap_or_else(|| ANONYMOUS_USERNAME.to_string()),
            avatar_url: get_string(record, AVATAR),
            publish_time: get_string(record, PUBLISH_TIME).unwrap_or_default(),
            content: get_string(record, &["content"]).unwrap_or_default(),
            view_count: get_count(record, &["hits"]),
            warm_count: get_count(record, &["zanCount"]),
            visit_count: get_count(record, &["visitCount"]),
            topic_id: get_i64(record, &["topicId"]),
            topic_title: get_string(record, &["topicTitle"]),
            post_url: format!("{}/{}", self.post_url_base, post_id),
            source_url: source_url.to_string(),
            uid,
            gender: get_i64(record, &["gender"]),
            is_anonymous: uid == Some(0),
            ask_tag: get_string(record, &["askTag"]),
            reply_counter: get_count(record, &["replyCounter"]),
            is_hot: get_i64(record, &["isHot"]),
            is_top: get_i64(record, &["isTop"]),
            platform: get_string(record, &["from"]),
            ip_province: get_string(record, IP_PROVINCE),
            small_attachments: parse_attachments(get_array(record, &["smallAttach"])),
            big_attachments: parse_attachments(get_array(record, &["bigAttach"])),
            comments,
            scraped_at: Utc::now(),
            raw: self.keep_raw.then(|| raw.clone()),
        })
    }
}

/// Upstream id of a record without parsing the rest of it
pub fn record_id(raw: &Value) -> Option<i64> {
    raw.as_object().and_then(|record| parse_post_id(record).ok())
}

fn parse_post_id(record: &RawRecord) -> Result<i64, ParseError> {
    let value = fields::first_value(record, POST_ID).ok_or(ParseError::MissingId)?;
    fields::value_as_i64(value).ok_or_else(|| ParseError::InvalidId(value.to_string()))
}

fn parse_comment(record: &RawRecord, source_url: &str) -> Comment {
    let user_type = get_i64(record, COMMENT_USER_TYPE);
    let reply_to_username = get_string(record, COMMENT_REPLY_TO);

    Comment {
        comment_id: get_i64(record, &["id"]),
        username: get_string(record, &["name"]).unwrap_or_default(),
        avatar_url: get_string(record, &["userHead"]),
        user_type,
        user_type_label: user_type_label(user_type).to_string(),
        comment_time: get_string(record, COMMENT_TIME).unwrap_or_default(),
        comment_content: get_string(record, &["content"]).unwrap_or_default(),
        like_count: get_count(record, &["zan"]),
        reply_type: ReplyType::from_target(reply_to_username.as_deref()),
        reply_to_username,
        uid: get_i64(record, &["uid"]),
        gender: get_i64(record, &["gender"]),
        doctor_id: get_i64(record, COMMENT_DOCTOR_ID),
        is_zan: get_i64(record, &["isZan"]),
        ip_province: get_string(record, &["ipProvince"]),
        source_url: source_url.to_string(),
    }
}

/// Fixed mapping from the numeric user type to a display label
pub fn user_type_label(user_type: Option<i64>) -> &'static str {
    match user_type {
        Some(1) => COUNSELOR_LABEL,
        _ => ORDINARY_USER_LABEL,
    }
}

/// Bare URL strings become image attachments; objects need a `url` key
fn parse_attachments(items: &[Value]) -> Vec<MediaAttachment> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) if !url.is_empty() => Some(MediaAttachment::image(url.clone())),
            Value::Object(obj) => {
                let url = get_string(obj, &["url"])?;
                let mut attachment = MediaAttachment::image(url);
                attachment.thumbnail_url = get_string(obj, &["thumbnail", "thumbUrl"]);
                attachment.kind = match get_string(obj, &["type"]).as_deref() {
                    Some("audio") => MediaKind::Audio,
                    Some("video") => MediaKind::Video,
                    _ => MediaKind::Image,
                };
                Some(attachment)
            }
            _ => None,
        })
        .collect()
}
