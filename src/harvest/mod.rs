//! Harvest module for page fetching and the pagination loop
//!
//! This module contains the core harvesting logic, including:
//! - Token-bucket rate limiting of every request
//! - Exponential backoff for transport failures
//! - HTTP fetching and envelope decoding
//! - API and rendered-page sources behind one trait
//! - The pagination engine with its stop conditions

mod backoff;
mod engine;
mod fetcher;
mod html;
mod rate_limiter;
mod source;

pub use backoff::BackoffPolicy;
pub use engine::{EngineState, HarvestRun, PaginationEngine, RunOptions, StopReason};
pub use fetcher::{
    build_http_client, decode_envelope, fetch_list_page, list_page_url, FetchOutcome, ListPage,
};
pub use html::extract_preloaded_state;
pub use rate_limiter::RateLimiter;
pub use source::{ApiSource, HtmlStateSource, PageSource};
