//! Page sources feeding the pagination engine
//!
//! Both acquisition modes produce a [`FetchOutcome`] per page, so the engine
//! applies identical stop conditions whichever one is used.

use crate::config::ApiConfig;
use crate::harvest::fetcher::{self, FetchOutcome, ListPage};
use crate::harvest::html;
use reqwest::Client;
use std::future::Future;

/// Something that can produce one page of raw records
pub trait PageSource {
    /// Fetches page `page` (1-based) with `page_size` records per page
    fn fetch_page(&self, page: u32, page_size: u32) -> impl Future<Output = FetchOutcome> + Send;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// False when only the first page exists, so runs always start there
    fn paged(&self) -> bool {
        true
    }
}

/// The JSON list endpoint
#[derive(Debug, Clone)]
pub struct ApiSource {
    client: Client,
    api: ApiConfig,
}

impl ApiSource {
    pub fn new(client: Client, api: ApiConfig) -> Self {
        Self { client, api }
    }
}

impl PageSource for ApiSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> FetchOutcome {
        fetcher::fetch_list_page(&self.client, &self.api, page, page_size).await
    }

    fn name(&self) -> &'static str {
        "api"
    }
}

/// The server-rendered list page
///
/// Only the first batch is embedded in the page, so every later page is
/// reported empty without a request. Resumed runs re-read page 1 and rely on
/// the dedup set to skip what was already stored.
#[derive(Debug, Clone)]
pub struct HtmlStateSource {
    client: Client,
    page_url: String,
    success_code: String,
}

impl HtmlStateSource {
    pub fn new(client: Client, page_url: impl Into<String>, success_code: impl Into<String>) -> Self {
        Self {
            client,
            page_url: page_url.into(),
            success_code: success_code.into(),
        }
    }
}

impl PageSource for HtmlStateSource {
    async fn fetch_page(&self, page: u32, _page_size: u32) -> FetchOutcome {
        if page > 1 {
            tracing::debug!("Rendered page holds no page {}, reporting it empty", page);
            return FetchOutcome::Page(ListPage::empty(self.page_url.as_str()));
        }

        let body = match fetcher::fetch_text(&self.client, &self.page_url).await {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };

        let Some(state) = html::extract_preloaded_state(&body) else {
            return FetchOutcome::Malformed("no preloaded state in page".to_string());
        };

        match html::envelope_of(&state) {
            Some(envelope) => {
                fetcher::decode_envelope_value(envelope, &self.success_code, &self.page_url)
            }
            // A state without list data is an empty first page
            None => FetchOutcome::Page(ListPage {
                records: Vec::new(),
                source_url: self.page_url.clone(),
                http_status: Some(200),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "html"
    }

    fn paged(&self) -> bool {
        false
    }
}
