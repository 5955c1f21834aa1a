//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full mirror cycle end-to-end.

use flate2::read::GzDecoder;
use site_mirror::config::Config;
use site_mirror::state::{Frontier, ItemKind, ItemStatus};
use site_mirror::storage::{SqliteStorage, Storage};
use site_mirror::url::CanonicalUrl;
use site_mirror::Crawler;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a small, uncompressed, in-memory test configuration
fn create_test_config(root: &str, dir: &TempDir) -> Config {
    let mut config = Config::for_root(root);
    config.output.archive_root = dir.path().join("result");
    config.output.gzip = false;
    config.workers.set_fetch_workers(4);
    config.workers.save_workers = 2;
    config.http.user_agent = "MirrorTest/1.0".to_string();
    config.http.request_timeout_secs = 30;
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Lists every file under `dir`, relative to it
fn collect_files(dir: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                files.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }

    let mut files = Vec::new();
    if dir.exists() {
        walk(dir, dir, &mut files);
    }
    files.sort();
    files
}

/// Host directory the mock server's files are written under
fn host_dir(server: &MockServer) -> String {
    url::Url::parse(&server.uri())
        .unwrap()
        .host_str()
        .unwrap()
        .to_string()
}

/// Storage key of the mock server: host and port
fn site_key(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

async fn mount_small_site(server: &MockServer) {
    mount(
        server,
        "/",
        html(r#"<link rel="stylesheet" href="/style.css"><a href="/a">A</a>"#),
        1,
    )
    .await;
    mount(server, "/a", html(r#"<a href="/">Home</a>"#), 1).await;
    mount(
        server,
        "/style.css",
        ResponseTemplate::new(200).set_body_string("body { margin: 0 }"),
        1,
    )
    .await;
}

#[tokio::test]
async fn test_full_mirror_of_small_site() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = TempDir::new().unwrap();
    let root = format!("{}/", server.uri());
    let crawler = Crawler::new(create_test_config(&root, &dir)).unwrap();
    let frontier = crawler.frontier();

    let summary = crawler.run().await;

    assert!(!summary.cancelled);
    assert!(summary.is_complete());
    assert_eq!(summary.saved, 3);
    assert_eq!(summary.ignored, 0);
    assert_eq!(frontier.outstanding(), 0);

    let host = host_dir(&server);
    let files = collect_files(&dir.path().join("result"));
    assert_eq!(
        files,
        vec![
            PathBuf::from(format!("{}/a/index.html", host)),
            PathBuf::from(format!("{}/index.html", host)),
            PathBuf::from(format!("{}/style.css", host)),
        ]
    );

    let css = std::fs::read_to_string(dir.path().join(format!("result/{}/style.css", host)))
        .unwrap();
    assert_eq!(css, "body { margin: 0 }");
    assert_eq!(
        frontier.status_of(&CanonicalUrl::from(format!("{}/style.css", server.uri()))),
        Some(ItemStatus::Saved)
    );
}

#[tokio::test]
async fn test_gzip_archive() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&format!("{}/", server.uri()), &dir);
    config.output.gzip = true;

    let summary = Crawler::new(config).unwrap().run().await;
    assert_eq!(summary.saved, 3);

    let host = host_dir(&server);
    let index = dir.path().join(format!("result/{}/index.html.gz", host));
    let mut decoded = String::new();
    GzDecoder::new(std::fs::File::open(index).unwrap())
        .read_to_string(&mut decoded)
        .unwrap();
    assert!(decoded.contains(r#"href="/a""#));

    let files = collect_files(&dir.path().join("result"));
    assert!(files
        .iter()
        .all(|f| f.extension().map_or(false, |ext| ext == "gz")));
}

#[tokio::test]
async fn test_failed_fetch_is_ignored() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<a href="/missing">Gone</a><script src="/broken.js"></script>"#),
        1,
    )
    .await;
    mount(&server, "/missing", ResponseTemplate::new(404), 1).await;
    mount(&server, "/broken.js", ResponseTemplate::new(500), 1).await;

    let dir = TempDir::new().unwrap();
    let crawler = Crawler::new(create_test_config(&format!("{}/", server.uri()), &dir)).unwrap();
    let frontier = crawler.frontier();

    let summary = crawler.run().await;

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.ignored, 2);
    assert_eq!(
        frontier.status_of(&CanonicalUrl::from(format!("{}/missing", server.uri()))),
        Some(ItemStatus::Ignored)
    );
    assert!(!frontier.is_saved(&CanonicalUrl::from(format!("{}/broken.js", server.uri()))));

    let files = collect_files(&dir.path().join("result"));
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_out_of_scope_links_are_not_followed() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(
            r##"<a href="https://evil.test/a">Elsewhere</a>
                <a href="mailto:someone@x.test">Mail</a>
                <a href="#top">Top</a>
                <a href="javascript:void(0)">Nothing</a>
                <a href="/docs?page=2">Docs</a>
                <a href="/docs?page=3">Docs again</a>"##,
        ),
        1,
    )
    .await;
    mount(&server, "/docs", html("docs"), 1).await;

    let dir = TempDir::new().unwrap();
    let crawler = Crawler::new(create_test_config(&format!("{}/", server.uri()), &dir)).unwrap();
    let frontier = crawler.frontier();

    let summary = crawler.run().await;

    // Only the root and /docs (queries stripped, fetched once)
    assert_eq!(summary.saved, 2);
    assert_eq!(frontier.len(), 2);
    assert!(frontier.status_of(&CanonicalUrl::from("https://evil.test/a")).is_none());
}

#[tokio::test]
async fn test_resume_fetches_only_in_flight_items() {
    let server = MockServer::start().await;
    mount(&server, "/", html("root"), 0).await;
    mount(
        &server,
        "/a",
        html(r#"<a href="/">Home</a><link rel="stylesheet" href="/a.css">"#),
        1,
    )
    .await;
    mount(
        &server,
        "/a.css",
        ResponseTemplate::new(200).set_body_string("a {}"),
        1,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("mirror.db");
    let site = site_key(&server);
    let root = CanonicalUrl::from(format!("{}/", server.uri()));
    let page_a = CanonicalUrl::from(format!("{}/a", server.uri()));

    {
        let storage = SqliteStorage::new(&db, &site).unwrap();
        for status in [ItemStatus::InFlight, ItemStatus::Saved] {
            storage
                .record_transition(&root, ItemKind::Page, status)
                .unwrap();
        }
        storage
            .record_transition(&page_a, ItemKind::Page, ItemStatus::InFlight)
            .unwrap();
    }

    let mut config = create_test_config(root.as_str(), &dir);
    config.crawl.resume = true;
    config.storage.database_path = Some(db.clone());

    let summary = Crawler::new(config).unwrap().run().await;

    assert_eq!(summary.rearmed, 1);
    assert_eq!(summary.saved, 3);
    assert!(summary.is_complete());

    let host = host_dir(&server);
    let files = collect_files(&dir.path().join("result"));
    assert_eq!(
        files,
        vec![
            PathBuf::from(format!("{}/a/index.html", host)),
            PathBuf::from(format!("{}/a.css", host)),
        ]
    );

    // Progress is on disk for the next run
    let storage = SqliteStorage::new(&db, &site).unwrap();
    let records = storage.load().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == ItemStatus::Saved));
}

#[tokio::test]
async fn test_fresh_run_ignores_previous_progress() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("mirror.db");
    let site = site_key(&server);

    {
        let storage = SqliteStorage::new(&db, &site).unwrap();
        storage
            .record_transition(
                &CanonicalUrl::from(format!("{}/", server.uri())),
                ItemKind::Page,
                ItemStatus::Saved,
            )
            .unwrap();
    }

    let mut config = create_test_config(&format!("{}/", server.uri()), &dir);
    config.storage.database_path = Some(db);

    let summary = Crawler::new(config).unwrap().run().await;
    assert_eq!(summary.saved, 3);
    assert_eq!(summary.rearmed, 0);
}

#[tokio::test]
async fn test_resume_with_injected_frontier() {
    let server = MockServer::start().await;
    mount(&server, "/done", html("done"), 0).await;
    mount(&server, "/todo", html("todo"), 1).await;

    let done = CanonicalUrl::from(format!("{}/done", server.uri()));
    let todo = CanonicalUrl::from(format!("{}/todo", server.uri()));

    let storage = Arc::new(SqliteStorage::new_in_memory(&site_key(&server)).unwrap());
    storage
        .record_transition(&done, ItemKind::Page, ItemStatus::Saved)
        .unwrap();
    storage
        .record_transition(&todo, ItemKind::Page, ItemStatus::InFlight)
        .unwrap();

    let frontier = Arc::new(Frontier::load(storage.clone()).unwrap());
    assert_eq!(frontier.outstanding(), 1);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&format!("{}/", server.uri()), &dir);
    let summary = Crawler::with_frontier(config, Arc::clone(&frontier))
        .unwrap()
        .run()
        .await;

    assert_eq!(summary.rearmed, 1);
    assert!(frontier.is_saved(&todo));
    assert_eq!(storage.status_counts().unwrap().saved, 2);
}

#[tokio::test]
async fn test_cancellation_leaves_work_in_flight() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html("slow").set_delay(Duration::from_secs(10)),
        1,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("mirror.db");
    let mut config = create_test_config(&format!("{}/", server.uri()), &dir);
    config.storage.database_path = Some(db.clone());

    let crawler = Crawler::new(config).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        crawler.run_with_cancellation(cancel),
    )
    .await
    .expect("cancelled crawl did not stop");

    assert!(summary.cancelled);
    assert!(!summary.is_complete());
    assert_eq!(summary.in_flight, 1);
    assert_eq!(summary.saved, 0);

    let storage = SqliteStorage::new(&db, &site_key(&server)).unwrap();
    let records = storage.load().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ItemStatus::InFlight);
}

#[tokio::test]
async fn test_small_pools_and_queue_do_not_stall() {
    let server = MockServer::start().await;

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">P{}</a>"#, i, i))
        .collect();
    mount(&server, "/", html(&links), 1).await;
    for i in 0..20 {
        mount(
            &server,
            &format!("/p{}", i),
            html(r#"<a href="/">Home</a><a href="/p0">First</a>"#),
            1,
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&format!("{}/", server.uri()), &dir);
    config.workers.set_fetch_workers(1);
    config.workers.save_workers = 1;
    config.workers.save_queue_capacity = 1;

    let summary = tokio::time::timeout(Duration::from_secs(30), Crawler::new(config).unwrap().run())
        .await
        .expect("crawl stalled");

    assert_eq!(summary.saved, 21);
    assert_eq!(collect_files(&dir.path().join("result")).len(), 21);
}
