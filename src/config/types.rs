use serde::Deserialize;

/// Mobile browser identity sent with every request unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_7_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Mobile/15E148 Safari/604.1";

/// Main configuration structure for Post-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// JSON list endpoint, queried with `page`, `pageSize` and `tab`
    #[serde(rename = "list-url")]
    pub list_url: String,

    /// Rendered list page carrying a preloaded state blob (fallback source)
    #[serde(rename = "page-url", default)]
    pub page_url: Option<String>,

    /// Prefix for canonical post links; the post id is appended
    #[serde(rename = "post-url-base")]
    pub post_url_base: String,

    /// Fixed tab selector sent with every list request
    #[serde(default = "default_tab")]
    pub tab: String,

    /// Application-level code that marks a successful list response
    #[serde(rename = "success-code", default = "default_success_code")]
    pub success_code: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Token bucket and HTTP 429 handling
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    #[serde(default = "default_qps")]
    pub qps: f64,

    /// Bucket capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    #[serde(rename = "jitter-min", default = "default_jitter_min")]
    pub jitter_min: f64,

    #[serde(rename = "jitter-max", default = "default_jitter_max")]
    pub jitter_max: f64,

    /// Fixed pause after an HTTP 429 before the same page is retried (milliseconds)
    #[serde(rename = "cooldown-ms", default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// How many consecutive 429 responses a single page may receive
    #[serde(rename = "max-rate-limit-retries", default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

/// Exponential backoff for transport failures
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    /// First retry delay (milliseconds)
    #[serde(rename = "base-ms", default = "default_backoff_base_ms")]
    pub base_ms: u64,

    /// Upper bound on the un-jittered delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_backoff_max_ms")]
    pub max_delay_ms: u64,

    #[serde(rename = "jitter-min", default = "default_jitter_min")]
    pub jitter_min: f64,

    #[serde(rename = "jitter-max", default = "default_jitter_max")]
    pub jitter_max: f64,

    /// Retries per page before the page is counted as an error
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,
}

/// Pagination defaults (overridable per run)
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

/// On-disk locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for post files, raw dumps and exports
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,

    #[serde(rename = "checkpoint-file", default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    /// Newline-delimited fingerprint set
    #[serde(rename = "seen-file", default = "default_seen_file")]
    pub seen_file: String,

    /// Keep the original API record next to each post
    #[serde(rename = "include-raw", default = "default_include_raw")]
    pub include_raw: bool,

    /// JSON-lines file inside `data-dir` written by the dataset export
    #[serde(rename = "export-file", default = "default_export_file")]
    pub export_file: String,

    /// Append-only run metrics history
    #[serde(rename = "metrics-file", default = "default_metrics_file")]
    pub metrics_file: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            qps: default_qps(),
            burst: default_burst(),
            jitter_min: default_jitter_min(),
            jitter_max: default_jitter_max(),
            cooldown_ms: default_cooldown_ms(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_backoff_base_ms(),
            max_delay_ms: default_backoff_max_ms(),
            jitter_min: default_jitter_min(),
            jitter_max: default_jitter_max(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            checkpoint_file: default_checkpoint_file(),
            seen_file: default_seen_file(),
            include_raw: default_include_raw(),
            export_file: default_export_file(),
            metrics_file: default_metrics_file(),
        }
    }
}

fn default_tab() -> String {
    "new".to_string()
}

fn default_success_code() -> String {
    "200".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_qps() -> f64 {
    0.5
}

fn default_burst() -> u32 {
    2
}

fn default_jitter_min() -> f64 {
    0.1
}

fn default_jitter_max() -> f64 {
    0.3
}

fn default_cooldown_ms() -> u64 {
    60_000
}

fn default_max_rate_limit_retries() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_page_size() -> u32 {
    20
}

fn default_max_pages() -> u32 {
    500
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_checkpoint_file() -> String {
    "data/checkpoint.json".to_string()
}

fn default_seen_file() -> String {
    "data/seen_ids.txt".to_string()
}

fn default_include_raw() -> bool {
    true
}

fn default_export_file() -> String {
    "dataset.jsonl".to_string()
}

fn default_metrics_file() -> String {
    "logs/metrics.jsonl".to_string()
}
