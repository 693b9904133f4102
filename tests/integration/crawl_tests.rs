//! Integration tests for the collector
//!
//! These tests use wiremock to serve a small mock archive and run full
//! collections against it, end-to-end through configuration, fetching,
//! extraction, enrichment and SQLite storage.

use news_harvest::adapter::html::{first_attr, first_text, joined_text, resolve_link};
use news_harvest::adapter::{Pagination, PartialRecord};
use news_harvest::config::Config;
use news_harvest::jobs::{JobManager, JobStatus};
use news_harvest::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use news_harvest::storage::{SqliteStorage, Storage};
use news_harvest::{ArchiveId, HarvestError, Orchestrator, Registry};
use scraper::ElementRef;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const LISTING: &str = "/archive/2020-01-01/";

struct MockRules {
    base: String,
}

impl SiteRules for MockRules {
    fn needs_detail_page(&self) -> bool {
        true
    }

    fn permalink(&self, section: ElementRef<'_>) -> Option<String> {
        resolve_link(&first_attr(section, "a", "href")?, &self.base)
    }

    fn record(
        &self,
        _section: ElementRef<'_>,
        detail: Option<ElementRef<'_>>,
        _permalink: &str,
    ) -> PartialRecord {
        let Some(page) = detail else {
            return PartialRecord::default();
        };
        PartialRecord {
            title: first_text(page, "h1"),
            content: joined_text(page, "div.body p", "\n"),
            tag: first_text(page, ".tag"),
            image_url: first_attr(page, "img", "src").and_then(|src| resolve_link(&src, &self.base)),
        }
    }
}

/// A registry holding only `mockpress`, served from `base`
fn mock_registry(base: &str) -> Registry {
    let base = base.to_string();
    let mut registry = Registry::new();
    registry.register("mockpress", move || {
        let profile = SiteProfile::new(
            "mockpress",
            format!("{}/archive/{{date}}/{{page}}", base),
            DateFormat::Pattern("%Y-%m-%d"),
            ymd(2000, 1, 1),
            "ul.river > li",
        )
        .with_pagination(Pagination::new("nav.pages a", "{}/"));
        ArchiveSite::boxed(profile, MockRules { base: base.clone() })
    });
    registry
}

fn create_test_config(dir: &Path, begin: (i32, u32, u32), end: (i32, u32, u32)) -> Config {
    let mut config = Config::default();
    config.crawl.archives = vec!["mockpress".to_string()];
    config.crawl.begin_date = Some(ymd(begin.0, begin.1, begin.2));
    config.crawl.end_date = Some(ymd(end.0, end.1, end.2));
    config.crawl.timeout = 5.0;
    config.storage.database_path = dir.join("harvest.db").display().to_string();
    config.storage.image_root = dir.join("images").display().to_string();
    config
}

fn listing(slugs: &[String], pages: u32) -> String {
    let entries: String = slugs
        .iter()
        .map(|slug| format!(r#"<li><a href="/article/{slug}">{slug}</a></li>"#))
        .collect();
    let widget: String = (1..=pages).map(|n| format!("<a>{}</a>", n)).collect();
    format!(
        r#"<html><body><ul class="river">{}</ul><nav class="pages">{}</nav></body></html>"#,
        entries, widget
    )
}

fn detail(slug: &str) -> String {
    format!(
        r#"<html><body><h1>Article {slug}</h1><div class="body"><p>Body {slug}</p></div><span class="tag">Monde</span></body></html>"#
    )
}

fn slugs(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

async fn mount_page(server: &MockServer, at: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_details(server: &MockServer, slugs: &[String], times: u64) {
    for slug in slugs {
        mount_page(server, &format!("/article/{}", slug), detail(slug), times).await;
    }
}

fn open_storage(dir: &Path) -> SqliteStorage {
    SqliteStorage::open(&dir.join("harvest.db"), 1).unwrap()
}

fn article(server: &MockServer, slug: &str) -> String {
    format!("{}/article/{}", server.uri(), slug)
}

/// Answers every text with `[n, 1.0]`, `n` read from its "Article sN" title
struct TitleEmbedder;

impl Respond for TitleEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let embeddings: Vec<Vec<f32>> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|text| {
                let title = text.as_str().unwrap().lines().next().unwrap_or_default();
                let n: f32 = title.trim_start_matches("Article s").parse().unwrap_or(-1.0);
                vec![n, 1.0]
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": embeddings }))
    }
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let articles = slugs("a", 3);

    mount_page(&server, LISTING, listing(&articles, 1), 2).await;
    // Known articles must not be fetched again on the second run
    mount_details(&server, &articles, 1).await;

    let registry = mock_registry(&server.uri());
    let config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 1));

    let first = Orchestrator::from_config(&config, &registry)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.total_added(), 3);

    let second = Orchestrator::from_config(&config, &registry)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.total_added(), 0);
    assert_eq!(second.counters.sections_skipped, 3);

    let storage = open_storage(dir.path());
    assert_eq!(storage.count_archive(&ArchiveId::new("mockpress")).unwrap(), 3);
    let record = storage.get_record(&article(&server, "a1")).unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Article a1"));
    assert_eq!(record.content.as_deref(), Some("Body a1"));
    assert_eq!(record.tag.as_deref(), Some("Monde"));
}

#[tokio::test]
async fn test_pagination_keeps_pages_before_a_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let first_page = slugs("p", 2);
    let second_page = slugs("q", 2);

    mount_page(&server, LISTING, listing(&first_page, 5), 1).await;
    mount_page(&server, "/archive/2020-01-01/2/", listing(&second_page, 5), 1).await;
    Mock::given(method("GET"))
        .and(path("/archive/2020-01-01/3/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/archive/2020-01-01/[45]/$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_details(&server, &first_page, 1).await;
    mount_details(&server, &second_page, 1).await;

    let registry = mock_registry(&server.uri());
    let config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 1));
    let report = Orchestrator::from_config(&config, &registry)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.total_added(), 4);
    assert_eq!(report.counters.items_parsed, 1);
    let storage = open_storage(dir.path());
    assert!(storage.get_record(&article(&server, "q1")).unwrap().is_some());
}

#[tokio::test]
async fn test_failing_detail_page_in_a_full_batch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let articles = slugs("s", 32);

    mount_page(&server, LISTING, listing(&articles, 1), 1).await;
    for (index, slug) in articles.iter().enumerate() {
        if index == 9 {
            Mock::given(method("GET"))
                .and(path(format!("/article/{}", slug)))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;
        } else {
            mount_page(&server, &format!("/article/{}", slug), detail(slug), 1).await;
        }
    }

    let registry = mock_registry(&server.uri());
    let config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 1));
    let report = Orchestrator::from_config(&config, &registry)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.total_added(), 31);
    assert_eq!(report.counters.sections_failed, 1);
    let storage = open_storage(dir.path());
    assert!(storage.get_record(&article(&server, "s9")).unwrap().is_none());
    assert!(storage.get_record(&article(&server, "s10")).unwrap().is_some());
}

#[tokio::test]
async fn test_embeddings_follow_their_records() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let articles = slugs("s", 40);

    mount_page(&server, LISTING, listing(&articles, 1), 1).await;
    mount_details(&server, &articles, 1).await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(TitleEmbedder)
        .expect(2)
        .mount(&server)
        .await;

    let registry = mock_registry(&server.uri());
    let mut config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 1));
    config.embedding.url = Some(format!("{}/embed", server.uri()));

    let report = Orchestrator::from_config(&config, &registry)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.total_added(), 40);

    let storage = open_storage(dir.path());
    for n in [0usize, 9, 31, 32, 39] {
        let record = storage
            .get_record(&article(&server, &format!("s{}", n)))
            .unwrap()
            .unwrap();
        assert_eq!(record.embedding, Some(vec![n as f32, 1.0]));
    }
}

#[tokio::test]
async fn test_enrichment_failure_drops_the_batch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let articles = slugs("e", 5);

    mount_page(&server, LISTING, listing(&articles, 1), 1).await;
    mount_details(&server, &articles, 1).await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let registry = mock_registry(&server.uri());
    let mut config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 1));
    config.embedding.url = Some(format!("{}/embed", server.uri()));

    let report = Orchestrator::from_config(&config, &registry)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.total_added(), 0);
    assert_eq!(report.counters.sections_failed, 5);
    let storage = open_storage(dir.path());
    assert_eq!(storage.count_archive(&ArchiveId::new("mockpress")).unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_archive_fails_before_any_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 1));
    let manager = JobManager::with_registry(config, mock_registry(&server.uri()));

    let err = manager
        .start(
            &["mockpress".to_string(), "ghostpress".to_string()],
            ymd(2020, 1, 1),
            ymd(2020, 1, 1),
            Duration::from_secs(5),
        )
        .unwrap_err();

    assert!(matches!(err, HarvestError::UnknownArchive { ref name, .. } if name == "ghostpress"));
    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_job_runs_to_success() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let articles = slugs("j", 2);

    mount_page(&server, LISTING, listing(&articles, 1), 1).await;
    mount_details(&server, &articles, 1).await;

    let config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 1));
    let manager = JobManager::with_registry(config, mock_registry(&server.uri()));
    let handle = manager
        .start(
            &["mockpress".to_string()],
            ymd(2020, 1, 1),
            ymd(2020, 1, 1),
            Duration::from_secs(5),
        )
        .unwrap();

    assert_eq!(manager.wait(handle).await.unwrap(), JobStatus::Succeeded);
    let report = manager.report(handle).unwrap().unwrap();
    assert_eq!(report.total_added(), 2);
}

#[tokio::test]
async fn test_stop_cancels_a_running_job() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path_regex(r"^/archive/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(&[], 1))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(dir.path(), (2020, 1, 1), (2020, 1, 30));
    config.crawl.workers = Some(1);
    let manager = JobManager::with_registry(config, mock_registry(&server.uri()));
    let handle = manager
        .start(
            &["mockpress".to_string()],
            ymd(2020, 1, 1),
            ymd(2020, 1, 30),
            Duration::from_secs(5),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(manager.status(handle).unwrap(), JobStatus::Running);
    manager.stop(handle).unwrap();

    assert_eq!(manager.wait(handle).await.unwrap(), JobStatus::Cancelled);
    let listings = server.received_requests().await.unwrap_or_default().len();
    assert!(listings < 30, "{} listing pages fetched after stop", listings);

    let report = manager.report(handle).unwrap().unwrap();
    assert!(report.cancelled);
    assert_eq!(report.frontier_size, 30);
}
