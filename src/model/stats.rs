use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters for a single harvest process
#[derive(Debug, Clone, Serialize)]
pub struct ScrapingStats {
    /// Posts accepted this run
    pub total_posts: u64,

    /// Comments carried by the accepted posts
    pub total_comments: u64,

    /// Accepted posts whose id the post store has never held
    pub new_posts: u64,

    /// Accepted posts whose id is already stored under another fingerprint (changed content)
    pub updated_posts: u64,

    /// Records skipped because their fingerprint was already persisted
    pub duplicates_skipped: u64,

    /// Transport failures, malformed pages and unparseable records
    pub errors: u64,

    pub empty_pages: u64,

    /// Every re-issued request, for 429 cooldowns and transport backoff alike
    pub retries: u64,

    /// Histogram of HTTP status codes received
    pub http_status_codes: BTreeMap<u16, u64>,

    pub start_time: DateTime<Utc>,

    pub end_time: Option<DateTime<Utc>>,
}

impl ScrapingStats {
    pub fn new() -> Self {
        Self {
            total_posts: 0,
            total_comments: 0,
            new_posts: 0,
            updated_posts: 0,
            duplicates_skipped: 0,
            errors: 0,
            empty_pages: 0,
            retries: 0,
            http_status_codes: BTreeMap::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn add_http_status(&mut self, code: u16) {
        *self.http_status_codes.entry(code).or_insert(0) += 1;
    }

    /// Count of responses with the given status
    pub fn status_count(&self, code: u16) -> u64 {
        self.http_status_codes.get(&code).copied().unwrap_or(0)
    }

    /// Stamps the end time the first time it is called
    pub fn finish(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
        }
    }

    /// Elapsed time, measured to now while the run is still open
    pub fn duration(&self) -> chrono::Duration {
        self.end_time.unwrap_or_else(Utc::now) - self.start_time
    }

    /// Percentage of accepted posts among posts plus errors, 0 when both are 0
    pub fn success_rate(&self) -> f64 {
        let total = self.total_posts + self.errors;
        if total == 0 {
            0.0
        } else {
            self.total_posts as f64 / total as f64 * 100.0
        }
    }
}

impl Default for ScrapingStats {
    fn default() -> Self {
        Self::new()
    }
}
