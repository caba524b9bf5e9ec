//! Pagination engine - the main harvest loop
//!
//! This module drives one harvest run from checkpoint to checkpoint:
//! - Loading the checkpoint and choosing the starting page
//! - Gating every request through the rate limiter
//! - Cooling down on 429 and backing off on transport failures
//! - Parsing records and evaluating stop conditions record by record
//! - Persisting posts, the dedup set and the checkpoint, in that order

use crate::config::{Config, ScrapeConfig};
use crate::dates::{local_now, parse_publish_time, published_between};
use crate::harvest::backoff::BackoffPolicy;
use crate::harvest::fetcher::{FetchOutcome, ListPage};
use crate::harvest::rate_limiter::RateLimiter;
use crate::harvest::source::PageSource;
use crate::model::{Post, ScrapingStats};
use crate::parser::{record_id, RecordParser};
use crate::state::{Checkpoint, CheckpointStore, DedupStore};
use crate::storage::PostStore;
use crate::Result;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The max-post target was reached
    Limit,

    /// A record older than the stop date was reached
    Date,

    /// A page came back with no records
    NoData,

    /// The page bound was reached
    MaxPages,

    /// A non-200, non-429 HTTP status
    HttpStatus(u16),

    /// The envelope carried a failure code
    Application {
        code: String,
        message: Option<String>,
    },

    /// 429 persisted through every allowed cooldown
    RateLimited,

    /// The cancellation token fired between pages
    Cancelled,
}

impl StopReason {
    /// True for reasons caused by the upstream refusing service
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus(_) | Self::Application { .. } | Self::RateLimited
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "stopped by post limit"),
            Self::Date => write!(f, "stopped by date"),
            Self::NoData => write!(f, "no more data"),
            Self::MaxPages => write!(f, "page bound reached"),
            Self::HttpStatus(code) => write!(f, "stopped by upstream (HTTP {})", code),
            Self::Application { code, message } => write!(
                f,
                "stopped by upstream (code {}: {})",
                code,
                message.as_deref().unwrap_or("no message")
            ),
            Self::RateLimited => write!(f, "stopped by upstream (rate limit persisted)"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Where the engine is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    FetchingPage(u32),
    ParsingPage(u32),
    Done,
}

/// Per-run inputs
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// First page to request; defaults to the page after the checkpoint's coverage
    pub start_page: Option<u32>,

    pub max_pages: u32,

    pub page_size: u32,

    /// Cumulative target across runs, reduced by the checkpoint total
    pub max_posts: Option<u64>,

    /// Records published before this end the run
    pub stop_date: Option<NaiveDateTime>,

    /// Records published before this, or with no readable time, are passed over
    pub start_date: Option<NaiveDateTime>,
}

impl RunOptions {
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            start_page: None,
            max_pages: config.max_pages,
            page_size: config.page_size,
            max_posts: None,
            stop_date: None,
            start_date: None,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&ScrapeConfig::default())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct HarvestRun {
    /// Accepted posts in acceptance order
    pub posts: Vec<Post>,
    pub stop_reason: StopReason,
    pub stats: ScrapingStats,
}

/// What retrying a single page produced
enum PageFetch {
    Records(ListPage),
    /// Transport retries were exhausted; the page is counted and skipped
    Skipped,
    Stop(StopReason),
}

/// Mutable bookkeeping for one run
struct RunContext {
    stats: ScrapingStats,
    posts: Vec<Post>,
    seen_this_run: HashSet<i64>,
    /// Posts this run may still accept
    remaining: Option<u64>,
    stop_date: Option<NaiveDateTime>,
    start_date: Option<NaiveDateTime>,
    /// Incremental mode keeps only ids above this
    min_post_id: Option<i64>,
    reference_time: NaiveDateTime,
}

impl RunContext {
    fn new() -> Self {
        Self {
            stats: ScrapingStats::new(),
            posts: Vec::new(),
            seen_this_run: HashSet::new(),
            remaining: None,
            stop_date: None,
            start_date: None,
            min_post_id: None,
            reference_time: local_now(),
        }
    }

    fn limit_reached(&self) -> bool {
        self.remaining
            .is_some_and(|remaining| self.posts.len() as u64 >= remaining)
    }
}

/// Drives a [`PageSource`] page by page
pub struct PaginationEngine<S> {
    source: S,
    limiter: Arc<RateLimiter>,
    backoff: BackoffPolicy,
    parser: RecordParser,
    checkpoints: CheckpointStore,
    dedup: DedupStore,
    store: Box<dyn PostStore + Send>,
    cooldown: Duration,
    max_rate_limit_retries: u32,
    cancel: CancellationToken,
    state: EngineState,
}

impl<S: PageSource> PaginationEngine<S> {
    /// Creates an engine wired from configuration
    ///
    /// Loads the dedup set from `storage.seen-file`; the checkpoint is read
    /// at the start of each run.
    ///
    /// # Arguments
    ///
    /// * `source` - Where pages come from
    /// * `config` - The harvester configuration
    /// * `store` - Destination for accepted posts
    pub fn new(source: S, config: &Config, store: Box<dyn PostStore + Send>) -> Result<Self> {
        let dedup = DedupStore::load(&config.storage.seen_file)?;

        Ok(Self {
            source,
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            backoff: BackoffPolicy::from_config(&config.backoff),
            parser: RecordParser::new(config.api.post_url_base.as_str())
                .keep_raw(config.storage.include_raw),
            checkpoints: CheckpointStore::new(&config.storage.checkpoint_file),
            dedup,
            store,
            cooldown: Duration::from_millis(config.rate_limit.cooldown_ms),
            max_rate_limit_retries: config.rate_limit.max_rate_limit_retries,
            cancel: CancellationToken::new(),
            state: EngineState::Idle,
        })
    }

    /// Shares an existing limiter instead of the one built from configuration
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Uses `token` to stop the run between pages
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current durable checkpoint
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoints.load()
    }

    /// Walks pages until a stop condition, then persists the run
    pub async fn run(&mut self, options: &RunOptions) -> Result<HarvestRun> {
        let checkpoint = self.checkpoints.load();
        let mut ctx = RunContext::new();
        ctx.stop_date = options.stop_date;
        ctx.start_date = options.start_date;
        ctx.remaining = options
            .max_posts
            .map(|target| checkpoint.remaining_toward(target));

        let start_page = if self.source.paged() {
            options
                .start_page
                .unwrap_or_else(|| checkpoint.resume_page(options.page_size))
        } else {
            1
        };

        tracing::info!(
            "Starting {} harvest at page {} (max {} pages, {} per page, checkpoint total {})",
            self.source.name(),
            start_page,
            options.max_pages,
            options.page_size,
            checkpoint.total_posts_scraped
        );

        let reason = if ctx.remaining == Some(0) {
            tracing::info!(
                "Checkpoint already holds {} posts, target met",
                checkpoint.total_posts_scraped
            );
            StopReason::Limit
        } else {
            self.paginate(start_page, options, &mut ctx).await
        };

        self.finish(checkpoint, ctx, reason)
    }

    /// Fetches page 1 only and keeps records newer than the checkpoint
    pub async fn run_incremental(&mut self, page_size: u32) -> Result<HarvestRun> {
        let checkpoint = self.checkpoints.load();
        let mut ctx = RunContext::new();
        ctx.min_post_id = checkpoint.last_post_id;

        tracing::info!(
            "Starting incremental {} harvest above post id {:?}",
            self.source.name(),
            checkpoint.last_post_id
        );

        let reason = if self.cancel.is_cancelled() {
            StopReason::Cancelled
        } else {
            match self.fetch_with_retries(1, page_size, &mut ctx).await {
                PageFetch::Records(page) if page.records.is_empty() => {
                    ctx.stats.empty_pages += 1;
                    StopReason::NoData
                }
                PageFetch::Records(page) => self
                    .process_page(1, &page, &mut ctx)
                    .unwrap_or(StopReason::MaxPages),
                PageFetch::Skipped => StopReason::MaxPages,
                PageFetch::Stop(reason) => reason,
            }
        };

        self.finish(checkpoint, ctx, reason)
    }

    async fn paginate(
        &mut self,
        start_page: u32,
        options: &RunOptions,
        ctx: &mut RunContext,
    ) -> StopReason {
        let mut page = start_page;
        let mut pages_requested = 0;

        loop {
            if pages_requested >= options.max_pages {
                tracing::info!("Reached max pages ({})", options.max_pages);
                return StopReason::MaxPages;
            }
            if self.cancel.is_cancelled() {
                tracing::info!("Cancelled before page {}", page);
                return StopReason::Cancelled;
            }

            let fetched = self.fetch_with_retries(page, options.page_size, ctx).await;
            pages_requested += 1;

            match fetched {
                PageFetch::Records(list) if list.records.is_empty() => {
                    tracing::info!("Page {} is empty, no more data", page);
                    ctx.stats.empty_pages += 1;
                    return StopReason::NoData;
                }
                PageFetch::Records(list) => {
                    if let Some(reason) = self.process_page(page, &list, ctx) {
                        return reason;
                    }
                }
                PageFetch::Skipped => {}
                PageFetch::Stop(reason) => return reason,
            }

            if pages_requested % 10 == 0 {
                tracing::info!(
                    "Progress: {} pages, {} posts, {} errors",
                    pages_requested,
                    ctx.stats.total_posts,
                    ctx.stats.errors
                );
            }

            page = page.saturating_add(1);
        }
    }

    /// Requests one page, retrying 429s and transport failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 429 | Cooldown, retry same page, up to `max-rate-limit-retries` |
    /// | Transport / malformed | Backoff, retry same page, up to `max-retries` |
    /// | Other non-200 | Stop |
    /// | Failure code | Stop |
    async fn fetch_with_retries(
        &mut self,
        page: u32,
        page_size: u32,
        ctx: &mut RunContext,
    ) -> PageFetch {
        let mut rate_limit_retries = 0;

        loop {
            self.limiter.acquire().await;
            self.state = EngineState::FetchingPage(page);

            let outcome = self.source.fetch_page(page, page_size).await;
            if let Some(code) = outcome.status_code() {
                ctx.stats.add_http_status(code);
            }

            match outcome {
                FetchOutcome::Page(list) => {
                    self.backoff.reset();
                    return PageFetch::Records(list);
                }

                FetchOutcome::RateLimited => {
                    if rate_limit_retries >= self.max_rate_limit_retries {
                        tracing::error!(
                            "Page {} still rate limited after {} cooldowns, stopping",
                            page,
                            rate_limit_retries
                        );
                        return PageFetch::Stop(StopReason::RateLimited);
                    }
                    rate_limit_retries += 1;
                    ctx.stats.retries += 1;
                    tracing::warn!(
                        "Rate limited on page {}, cooling down for {:?}",
                        page,
                        self.cooldown
                    );
                    tokio::time::sleep(self.cooldown).await;
                }

                FetchOutcome::HttpStatus(code) => {
                    tracing::error!("HTTP {} on page {}, stopping", code, page);
                    return PageFetch::Stop(StopReason::HttpStatus(code));
                }

                FetchOutcome::Application { code, message } => {
                    self.backoff.reset();
                    tracing::error!(
                        "Upstream returned code {} on page {}: {}",
                        code,
                        page,
                        message.as_deref().unwrap_or("no message")
                    );
                    return PageFetch::Stop(StopReason::Application { code, message });
                }

                FetchOutcome::Transport(error) | FetchOutcome::Malformed(error) => {
                    if self.backoff.exhausted() {
                        tracing::error!(
                            "Giving up on page {} after {} retries: {}",
                            page,
                            self.backoff.attempt(),
                            error
                        );
                        ctx.stats.errors += 1;
                        self.backoff.reset();
                        return PageFetch::Skipped;
                    }
                    ctx.stats.retries += 1;
                    tracing::warn!("Request for page {} failed: {}", page, error);
                    self.backoff.sleep_and_advance().await;
                }
            }
        }
    }

    /// Applies per-record filters and stop conditions to one page
    ///
    /// Returns the stop reason if the run must end on this page.
    fn process_page(&mut self, page: u32, list: &ListPage, ctx: &mut RunContext) -> Option<StopReason> {
        self.state = EngineState::ParsingPage(page);
        tracing::debug!("Page {}: {} records", page, list.records.len());

        for raw in &list.records {
            if let Some(id) = record_id(raw) {
                if !ctx.seen_this_run.insert(id) {
                    tracing::trace!("Post {} already seen this run", id);
                    continue;
                }
            }

            let post = match self.parser.parse(raw, &list.source_url) {
                Ok(post) => post,
                Err(e) => {
                    tracing::warn!("Skipping record on page {}: {}", page, e);
                    ctx.stats.errors += 1;
                    continue;
                }
            };

            if let Some(min_id) = ctx.min_post_id {
                if post.post_id <= min_id {
                    tracing::trace!("Post {} not above checkpoint {}", post.post_id, min_id);
                    continue;
                }
            }

            if let Some(stop_date) = ctx.stop_date {
                let published = parse_publish_time(&post.publish_time, ctx.reference_time);
                if published.is_some_and(|time| time < stop_date) {
                    tracing::info!(
                        "Post {} published {} is before {}, stopping",
                        post.post_id,
                        post.publish_time,
                        stop_date
                    );
                    return Some(StopReason::Date);
                }
            }

            if let Some(start_date) = ctx.start_date {
                if !published_between(&post, start_date, None, ctx.reference_time) {
                    tracing::trace!(
                        "Post {} published {} is outside the date range",
                        post.post_id,
                        post.publish_time
                    );
                    continue;
                }
            }

            if self.dedup.is_duplicate(&post) {
                tracing::debug!("Post {} already persisted", post.post_id);
                ctx.stats.duplicates_skipped += 1;
                continue;
            }

            self.accept(post, ctx);

            if ctx.limit_reached() {
                tracing::info!("Reached post limit ({} this run)", ctx.posts.len());
                return Some(StopReason::Limit);
            }
        }

        None
    }

    fn accept(&mut self, post: Post, ctx: &mut RunContext) {
        // A stored id with an unseen fingerprint means the post changed upstream
        if self.store.has_post_id(post.post_id) {
            ctx.stats.updated_posts += 1;
        } else {
            ctx.stats.new_posts += 1;
        }
        ctx.stats.total_posts += 1;
        ctx.stats.total_comments += post.comments.len() as u64;

        tracing::trace!("Accepted post {}", post.post_id);
        self.dedup.mark_seen(&post);
        ctx.posts.push(post);
    }

    /// Persists posts, then the dedup set, then the checkpoint
    fn finish(
        &mut self,
        mut checkpoint: Checkpoint,
        mut ctx: RunContext,
        stop_reason: StopReason,
    ) -> Result<HarvestRun> {
        ctx.stats.finish();
        self.state = EngineState::Done;

        self.store.save_batch(&ctx.posts)?;
        self.dedup.flush()?;
        checkpoint.record_run(&ctx.posts);
        self.checkpoints.save(&checkpoint)?;

        tracing::info!(
            "Harvest finished ({}): {} posts, {} duplicates, {} errors",
            stop_reason,
            ctx.stats.total_posts,
            ctx.stats.duplicates_skipped,
            ctx.stats.errors
        );

        self.state = EngineState::Idle;
        Ok(HarvestRun {
            posts: ctx.posts,
            stop_reason,
            stats: ctx.stats,
        })
    }
}
