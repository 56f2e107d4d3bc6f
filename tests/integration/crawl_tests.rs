//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against an on-disk database.

use scopecrawl::config::{Config, CrawlerConfig, RetryPolicy, UserAgentConfig};
use scopecrawl::crawler::{build_http_client, run_crawl, Coordinator, CrawlProgress, HttpFetcher};
use scopecrawl::events::{EventSink, TracingSink};
use scopecrawl::seed_url;
use scopecrawl::state::UrlStatus;
use scopecrawl::storage::{
    EventLogStore, FrontierStore, LogKind, PageStore, RunStatus, RunStore, SqliteStorage,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves `/a` with two in-scope links and one out-of-scope link
async fn mount_seed_page(server: &MockServer) {
    mount_page(
        server,
        "/a",
        html_page(
            "Page A",
            r#"<h1>Hi</h1>
            <p><b>bold</b> and <em>emphasis</em></p>
            <a href="/b">B</a>
            <a href="/c">C</a>
            <a href="https://elsewhere.invalid/x">X</a>"#,
        ),
    )
    .await;
}

fn open_seeded(db_path: &Path, url: &str, scope: &str) -> Arc<Mutex<SqliteStorage>> {
    let mut storage = SqliteStorage::new(db_path).unwrap();
    seed_url(&mut storage, url, scope).unwrap();
    Arc::new(Mutex::new(storage))
}

fn test_coordinator(
    storage: &Arc<Mutex<SqliteStorage>>,
) -> Coordinator<SqliteStorage, HttpFetcher> {
    let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(5)).unwrap();
    let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
    Coordinator::new(
        storage.clone(),
        HttpFetcher::new(client),
        sink,
        RetryPolicy::default(),
    )
}

#[tokio::test]
async fn test_single_page_discovers_scoped_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_seed_page(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let seed = format!("{}/a", base);
    let storage = open_seeded(&temp_dir.path().join("crawl.db"), &seed, &base);
    let coordinator = test_coordinator(&storage);

    let item = storage
        .lock()
        .unwrap()
        .claim_next_pending()
        .unwrap()
        .unwrap();
    let mut progress = CrawlProgress::new(5);
    coordinator.process_item(&item, &mut progress, None).await;

    assert_eq!(progress.processed, 3);

    let storage = storage.lock().unwrap();
    let page = storage.get_page(&seed).unwrap().unwrap();
    assert_eq!(page.titles, vec!["Page A", "Hi"]);
    assert_eq!(page.bold_texts, vec!["bold"]);
    assert_eq!(page.em_texts, vec!["emphasis"]);

    assert_eq!(
        storage.get_item(&seed).unwrap().unwrap().status,
        UrlStatus::Completed
    );
    assert_eq!(storage.count_by_status(UrlStatus::Pending).unwrap(), 2);
    for child in ["b", "c"] {
        let item = storage
            .get_item(&format!("{}/{}", base, child))
            .unwrap()
            .unwrap();
        assert_eq!(item.status, UrlStatus::Pending);
        assert_eq!(item.scope, base);
    }
    assert!(storage
        .get_item("https://elsewhere.invalid/x")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_empty_body_abandons_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let seed = format!("{}/empty", server.uri());
    let storage = open_seeded(&temp_dir.path().join("crawl.db"), &seed, &server.uri());
    let coordinator = test_coordinator(&storage);

    let item = storage
        .lock()
        .unwrap()
        .claim_next_pending()
        .unwrap()
        .unwrap();
    let mut progress = CrawlProgress::new(5);
    coordinator.process_item(&item, &mut progress, None).await;

    assert_eq!(progress.processed, 0);
    let storage = storage.lock().unwrap();
    assert_eq!(
        storage.get_item(&seed).unwrap().unwrap().status,
        UrlStatus::Completed
    );
    assert!(storage.get_page(&seed).unwrap().is_none());
    assert_eq!(storage.count_by_status(UrlStatus::Pending).unwrap(), 0);
}

#[tokio::test]
async fn test_full_crawl_spends_budget() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_seed_page(&server).await;
    mount_page(&server, "/b", html_page("Page B", "<h2>Leaf B</h2>")).await;
    mount_page(&server, "/c", html_page("Page C", "<strong>Leaf C</strong>")).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        seed_url(&mut storage, &format!("{}/a", base), &base).unwrap();
    }

    let seen = Mutex::new(Vec::new());
    let observer = |progress: &CrawlProgress| seen.lock().unwrap().push(progress.processed);
    let progress = run_crawl(
        &Config::default(),
        "test-hash",
        &db_path,
        5,
        false,
        Some(&observer),
    )
    .await
    .unwrap();

    assert_eq!(progress.processed, 5);
    assert_eq!(*seen.lock().unwrap(), vec![3, 4, 5]);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 3);
    assert_eq!(storage.count_by_status(UrlStatus::Completed).unwrap(), 3);
    assert_eq!(storage.count_by_status(UrlStatus::Pending).unwrap(), 0);

    let leaf = storage.get_page(&format!("{}/c", base)).unwrap().unwrap();
    assert_eq!(leaf.titles, vec!["Page C"]);
    assert_eq!(leaf.strong_texts, vec!["Leaf C"]);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.processed, 5);
    assert_eq!(run.config_hash, "test-hash");

    assert!(storage.count_logs(LogKind::Event).unwrap() > 0);
    assert_eq!(storage.count_logs(LogKind::Error).unwrap(), 0);
}

#[tokio::test]
async fn test_recover_requeues_interrupted_item() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html_page("Page A", "<h1>Hi</h1>")).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let seed = format!("{}/a", server.uri());
    {
        // Claim and then drop the store, as a killed process would
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        seed_url(&mut storage, &seed, &server.uri()).unwrap();
        storage.claim_next_pending().unwrap().unwrap();
    }

    // Treat the claim above as abandoned straight away
    let config = Config {
        crawler: CrawlerConfig {
            recover_after_secs: 0,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    };
    let progress = run_crawl(&config, "test-hash", &db_path, 1, true, None)
        .await
        .unwrap();

    assert_eq!(progress.processed, 1);
    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(
        storage.get_item(&seed).unwrap().unwrap().status,
        UrlStatus::Completed
    );
    assert!(storage.get_page(&seed).unwrap().is_some());
}
