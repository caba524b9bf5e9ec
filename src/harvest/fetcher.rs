//! HTTP fetcher for the list endpoint
//!
//! This module handles every request the harvester makes, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Requesting one list page (`page`, `pageSize`, `tab`)
//! - Classifying the response into a [`FetchOutcome`]
//! - Decoding the `{code, msg, data: {data: [...]}}` envelope

use crate::config::{ApiConfig, HttpConfig};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// One page of raw records
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    /// Records in upstream order
    pub records: Vec<Value>,

    /// URL the records came from, carried onto each parsed post
    pub source_url: String,

    /// Status of the response that carried the page, if a request was made
    pub http_status: Option<u16>,
}

impl ListPage {
    /// A page with no records that was never requested
    pub fn empty(source_url: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            source_url: source_url.into(),
            http_status: None,
        }
    }
}

/// Result of a single page request
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Successful response with the application success code
    Page(ListPage),

    /// HTTP 429; the same page should be retried after a cooldown
    RateLimited,

    /// Any other non-200 HTTP status
    HttpStatus(u16),

    /// HTTP 200 whose envelope carries a failure code
    Application {
        code: String,
        message: Option<String>,
    },

    /// Connection, timeout or body read failure
    Transport(String),

    /// HTTP 200 whose body is not the expected envelope
    Malformed(String),
}

impl FetchOutcome {
    /// HTTP status observed for this outcome, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Page(page) => page.http_status,
            Self::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Self::HttpStatus(code) => Some(*code),
            Self::Application { .. } | Self::Malformed(_) => Some(StatusCode::OK.as_u16()),
            Self::Transport(_) => None,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - User agent and timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Full URL of a list page
pub fn list_page_url(
    list_url: &str,
    page: u32,
    page_size: u32,
    tab: &str,
) -> Result<Url, url::ParseError> {
    let page = page.to_string();
    let page_size = page_size.to_string();
    Url::parse_with_params(
        list_url,
        [("page", page.as_str()), ("pageSize", page_size.as_str()), ("tab", tab)],
    )
}

/// Requests one list page and classifies the response
///
/// # Response Handling
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | HTTP 429 | `RateLimited` |
/// | Other non-200 | `HttpStatus` |
/// | Timeout / connect / body error | `Transport` |
/// | 200, not the envelope | `Malformed` |
/// | 200, failure code | `Application` |
/// | 200, success code | `Page` |
pub async fn fetch_list_page(
    client: &Client,
    api: &ApiConfig,
    page: u32,
    page_size: u32,
) -> FetchOutcome {
    let url = match list_page_url(&api.list_url, page, page_size, &api.tab) {
        Ok(url) => url,
        Err(e) => return FetchOutcome::Transport(format!("invalid list URL: {}", e)),
    };

    tracing::debug!("GET {}", url);

    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return FetchOutcome::Transport(describe_request_error(&e)),
    };

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return FetchOutcome::RateLimited;
    }
    if status != StatusCode::OK {
        return FetchOutcome::HttpStatus(status.as_u16());
    }

    match response.text().await {
        Ok(body) => decode_envelope(&body, &api.success_code, url.as_str()),
        Err(e) => FetchOutcome::Transport(describe_request_error(&e)),
    }
}

/// Fetches a page body as text, mapping failures the same way as list requests
pub(crate) async fn fetch_text(client: &Client, url: &str) -> Result<String, FetchOutcome> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchOutcome::Transport(describe_request_error(&e)))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchOutcome::RateLimited);
    }
    if status != StatusCode::OK {
        return Err(FetchOutcome::HttpStatus(status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| FetchOutcome::Transport(describe_request_error(&e)))
}

/// Decodes a 200 response body
pub fn decode_envelope(body: &str, success_code: &str, source_url: &str) -> FetchOutcome {
    match serde_json::from_str::<Value>(body) {
        Ok(envelope) => decode_envelope_value(&envelope, success_code, source_url),
        Err(e) => FetchOutcome::Malformed(format!("invalid JSON: {}", e)),
    }
}

/// Decodes an already-parsed envelope
///
/// `code` may be a string or a number. A missing or null record list on a
/// success code is an empty page.
pub fn decode_envelope_value(envelope: &Value, success_code: &str, source_url: &str) -> FetchOutcome {
    let Some(object) = envelope.as_object() else {
        return FetchOutcome::Malformed("envelope is not a JSON object".to_string());
    };

    let code = match object.get("code") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return FetchOutcome::Malformed("envelope has no code".to_string()),
    };

    if code != success_code {
        let message = object.get("msg").and_then(|m| match m {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        return FetchOutcome::Application { code, message };
    }

    let records = match object.get("data").and_then(|d| d.get("data")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(records)) => records.clone(),
        Some(_) => return FetchOutcome::Malformed("data.data is not an array".to_string()),
    };

    FetchOutcome::Page(ListPage {
        records,
        source_url: source_url.to_string(),
        http_status: Some(StatusCode::OK.as_u16()),
    })
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_list_page_url_query() {
        let url = list_page_url("https://api.example.com/ask/list", 3, 20, "new").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/ask/list?page=3&pageSize=20&tab=new"
        );
    }

    #[test]
    fn test_decode_success_with_string_code() {
        let body = json!({"code": "200", "msg": null, "data": {"data": [{"id": 1}, {"id": 2}]}});
        match decode_envelope(&body.to_string(), "200", "src") {
            FetchOutcome::Page(page) => {
                assert_eq!(page.records.len(), 2);
                assert_eq!(page.source_url, "src");
                assert_eq!(page.http_status, Some(200));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_decode_numeric_code() {
        let body = json!({"code": 200, "data": {"data": []}});
        assert!(matches!(
            decode_envelope(&body.to_string(), "200", "src"),
            FetchOutcome::Page(page) if page.records.is_empty()
        ));
    }

    #[test]
    fn test_decode_application_failure() {
        let body = json!({"code": "500", "msg": "busy", "data": null});
        assert_eq!(
            decode_envelope(&body.to_string(), "200", "src"),
            FetchOutcome::Application {
                code: "500".to_string(),
                message: Some("busy".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_null_data_is_empty_page() {
        let body = json!({"code": "200", "data": null});
        assert!(matches!(
            decode_envelope(&body.to_string(), "200", "src"),
            FetchOutcome::Page(page) if page.records.is_empty()
        ));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode_envelope("<html>", "200", "src"),
            FetchOutcome::Malformed(_)
        ));
        assert!(matches!(
            decode_envelope(r#"{"code":"200","data":{"data":{}}}"#, "200", "src"),
            FetchOutcome::Malformed(_)
        ));
        assert!(matches!(
            decode_envelope("[1, 2]", "200", "src"),
            FetchOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_status_code_of_outcomes() {
        assert_eq!(FetchOutcome::RateLimited.status_code(), Some(429));
        assert_eq!(FetchOutcome::HttpStatus(503).status_code(), Some(503));
        assert_eq!(FetchOutcome::Transport("x".into()).status_code(), None);
        assert_eq!(FetchOutcome::Page(ListPage::empty("s")).status_code(), None);
    }
}
