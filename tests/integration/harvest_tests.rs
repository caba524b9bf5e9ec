//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the list API and the rendered
//! list page, and run the full fetch, parse, store and checkpoint cycle
//! against a temporary data directory.

use post_harvest::config::{parse_config, Config};
use post_harvest::harvest::{
    build_http_client, ApiSource, FetchOutcome, HtmlStateSource, PageSource, PaginationEngine,
    RunOptions, StopReason,
};
use post_harvest::state::{Checkpoint, CheckpointStore, DedupStore};
use post_harvest::storage::FileStore;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let toml = format!(
        r#"
[api]
list-url = "{base}/api/list"
page-url = "{base}/ask/list"
post-url-base = "{base}/ask"

[http]
timeout-secs = 5
connect-timeout-secs = 2

[rate-limit]
qps = 100.0
burst = 20
jitter-min = 0.0
jitter-max = 0.0
cooldown-ms = 10
max-rate-limit-retries = 1

[backoff]
base-ms = 10
max-delay-ms = 20
jitter-min = 0.0
jitter-max = 0.0
max-retries = 1

[scrape]
page-size = 5
max-pages = 5

[storage]
data-dir = "{dir}/data"
checkpoint-file = "{dir}/data/checkpoint.json"
seen-file = "{dir}/data/seen.txt"
"#,
        base = base_url,
        dir = dir.display()
    );
    parse_config(&toml).expect("Failed to parse test config")
}

fn record(id: i64) -> Value {
    json!({
        "id": id,
        "uid": 1000 + id,
        "name": format!("user{}", id),
        "content": format!("question number {}", id),
        "timeStr": "2025-01-20 10:00",
        "replyCounter": 0
    })
}

fn envelope(records: Vec<Value>) -> Value {
    json!({"code": "200", "msg": null, "data": {"data": records}})
}

fn options() -> RunOptions {
    RunOptions {
        start_page: None,
        max_pages: 5,
        page_size: 5,
        max_posts: None,
        stop_date: None,
        start_date: None,
    }
}

async fn mount_page(server: &MockServer, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/list"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_api_source_sends_paging_params() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    Mock::given(method("GET"))
        .and(path("/api/list"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "5"))
        .and(query_param("tab", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![record(7), record(6)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&config.http).unwrap();
    let source = ApiSource::new(client, config.api.clone());

    match source.fetch_page(2, 5).await {
        FetchOutcome::Page(page) => {
            assert_eq!(page.records.len(), 2);
            assert_eq!(page.http_status, Some(200));
            assert!(page.source_url.contains("page=2"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_api_source_classifies_failures() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    Mock::given(method("GET"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("page", "3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": "401", "msg": "login required", "data": null})),
        )
        .mount(&mock_server)
        .await;

    let client = build_http_client(&config.http).unwrap();
    let source = ApiSource::new(client, config.api.clone());

    assert_eq!(source.fetch_page(1, 5).await, FetchOutcome::RateLimited);
    assert_eq!(source.fetch_page(2, 5).await, FetchOutcome::HttpStatus(503));
    assert_eq!(
        source.fetch_page(3, 5).await,
        FetchOutcome::Application {
            code: "401".to_string(),
            message: Some("login required".to_string()),
        }
    );
}

#[tokio::test]
async fn test_html_source_reads_preloaded_state() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    let state = json!({"preloadedState": {"data": envelope(vec![record(3), record(2), record(1)])}});
    let page = format!(
        "<html><head><title>List</title></head><body><div id=\"app\"></div>\
         <script>window.$G = {};</script></body></html>",
        state
    );

    Mock::given(method("GET"))
        .and(path("/ask/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&config.http).unwrap();
    let page_url = config.api.page_url.clone().unwrap();
    let source = HtmlStateSource::new(client, page_url, config.api.success_code.clone());

    match source.fetch_page(1, 5).await {
        FetchOutcome::Page(page) => assert_eq!(page.records.len(), 3),
        other => panic!("unexpected outcome {:?}", other),
    }

    // Later pages never hit the server
    match source.fetch_page(2, 5).await {
        FetchOutcome::Page(page) => assert!(page.records.is_empty()),
        other => panic!("unexpected outcome {:?}", other),
    }
}

fn rendered_list_page(records: Vec<Value>) -> String {
    let state = json!({"preloadedState": {"data": envelope(records)}});
    format!(
        "<html><body><div id=\"app\"></div><script>window.$G = {};</script></body></html>",
        state
    )
}

#[tokio::test]
async fn test_html_harvest_rereads_first_page_after_progress() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    // Earlier runs already covered two full pages
    let mut checkpoint = Checkpoint::fresh();
    checkpoint.total_posts_scraped = 10;
    checkpoint.last_post_id = Some(20);
    CheckpointStore::new(&config.storage.checkpoint_file)
        .save(&checkpoint)
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/ask/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rendered_list_page(vec![record(23), record(22), record(21)]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&config.http).unwrap();
    let page_url = config.api.page_url.clone().unwrap();
    let source = HtmlStateSource::new(client, page_url, config.api.success_code.clone());
    let store = FileStore::open(Path::new(&config.storage.data_dir), false).unwrap();

    let mut engine = PaginationEngine::new(source, &config, Box::new(store)).unwrap();
    let run = engine.run(&options()).await.unwrap();

    assert_eq!(run.stop_reason, StopReason::NoData);
    assert_eq!(run.posts.len(), 3);
    assert_eq!(run.stats.status_count(200), 1);

    let checkpoint = engine.checkpoint();
    assert_eq!(checkpoint.total_posts_scraped, 13);
    assert_eq!(checkpoint.last_post_id, Some(23));
}

#[tokio::test]
async fn test_full_harvest_persists_state() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    mount_page(&mock_server, 1, envelope((6..=10).rev().map(record).collect())).await;
    mount_page(&mock_server, 2, envelope((1..=5).rev().map(record).collect())).await;
    mount_page(&mock_server, 3, envelope(vec![])).await;

    let client = build_http_client(&config.http).unwrap();
    let source = ApiSource::new(client, config.api.clone());
    let store = FileStore::open(Path::new(&config.storage.data_dir), false).unwrap();

    let mut engine = PaginationEngine::new(source, &config, Box::new(store)).unwrap();
    let run = engine.run(&options()).await.unwrap();

    assert_eq!(run.stop_reason, StopReason::NoData);
    assert_eq!(run.posts.len(), 10);
    assert_eq!(run.stats.total_posts, 10);
    assert_eq!(run.stats.new_posts, 10);
    assert_eq!(run.stats.empty_pages, 1);
    assert_eq!(run.stats.status_count(200), 3);

    // Post files
    let store = FileStore::open(Path::new(&config.storage.data_dir), false).unwrap();
    assert_eq!(store.list_post_files().unwrap().len(), 10);

    // Seen set
    let seen = DedupStore::load(&config.storage.seen_file).unwrap();
    assert_eq!(seen.len(), 10);
    assert!(run.posts.iter().all(|post| seen.is_duplicate(post)));

    // Checkpoint
    let checkpoint = CheckpointStore::new(&config.storage.checkpoint_file).load();
    assert_eq!(checkpoint.last_post_id, Some(10));
    assert_eq!(checkpoint.total_posts_scraped, 10);
    assert_eq!(checkpoint.resume_page(5), 3);
}

#[tokio::test]
async fn test_second_run_skips_stored_posts() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    mount_page(&mock_server, 1, envelope((1..=3).rev().map(record).collect())).await;
    mount_page(&mock_server, 2, envelope(vec![])).await;

    let client = build_http_client(&config.http).unwrap();
    let data_dir = Path::new(&config.storage.data_dir);

    let first = {
        let store = FileStore::open(data_dir, false).unwrap();
        let source = ApiSource::new(client.clone(), config.api.clone());
        let mut engine = PaginationEngine::new(source, &config, Box::new(store)).unwrap();
        engine.run(&options()).await.unwrap()
    };
    assert_eq!(first.posts.len(), 3);

    // Fewer than one full page was stored, so the next run starts at page 1 again
    let second = {
        let store = FileStore::open(data_dir, false).unwrap();
        let source = ApiSource::new(client, config.api.clone());
        let mut engine = PaginationEngine::new(source, &config, Box::new(store)).unwrap();
        engine.run(&options()).await.unwrap()
    };

    assert_eq!(second.stop_reason, StopReason::NoData);
    assert!(second.posts.is_empty());
    assert_eq!(second.stats.duplicates_skipped, 3);

    let checkpoint = CheckpointStore::new(&config.storage.checkpoint_file).load();
    assert_eq!(checkpoint.total_posts_scraped, 3);
    assert_eq!(checkpoint.last_post_id, Some(3));
}

#[tokio::test]
async fn test_persistent_rate_limit_stops_run() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());

    mount_page(&mock_server, 1, envelope((6..=10).rev().map(record).collect())).await;
    Mock::given(method("GET"))
        .and(path("/api/list"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = build_http_client(&config.http).unwrap();
    let source = ApiSource::new(client, config.api.clone());
    let store = FileStore::open(Path::new(&config.storage.data_dir), false).unwrap();

    let mut engine = PaginationEngine::new(source, &config, Box::new(store)).unwrap();
    let run = engine.run(&options()).await.unwrap();

    assert_eq!(run.stop_reason, StopReason::RateLimited);
    assert!(run.stop_reason.is_upstream_failure());
    assert_eq!(run.posts.len(), 5);
    assert_eq!(run.stats.status_count(429), 2);
    assert_eq!(run.stats.retries, 1);

    // Posts from before the failure are still durable
    let checkpoint = CheckpointStore::new(&config.storage.checkpoint_file).load();
    assert_eq!(checkpoint.total_posts_scraped, 5);
    assert_eq!(checkpoint.resume_page(5), 2);
}
