//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full wave cycle end-to-end.

use news_wave::article::Article;
use news_wave::config::{
    parse_config, DedupKeyKind, ExtractorConfig, QueryFailurePolicy, RemoteStorageConfig,
    UserAgentConfig,
};
use news_wave::crawler::{
    build_http_client, ArticleExtractor, Coordinator, DedupGate, SchedulerLimits, WaveScheduler,
};
use news_wave::media::{ImageBackend, LocalBackend, MediaOffloader, OffloadError, RemoteBackend};
use news_wave::storage::{ArticleStore, SqliteStorage};
use news_wave::url::LinkFilter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
    }
}

fn limits(max_depth: u32, max_concurrent_tasks: usize) -> SchedulerLimits {
    SchedulerLimits {
        max_depth,
        max_concurrent_tasks,
        wave_deadline: Duration::from_secs(10),
    }
}

/// Builds a scheduler over an in-memory store and a local image root
fn create_scheduler(
    store: Arc<SqliteStorage>,
    image_root: &Path,
    limits: SchedulerLimits,
    dedup_key: DedupKeyKind,
) -> WaveScheduler {
    let client = build_http_client(&user_agent()).expect("Failed to build client");
    let offloader = MediaOffloader::new(client.clone(), Arc::new(LocalBackend::new(image_root)));
    let gate = DedupGate::new(store, dedup_key, QueryFailurePolicy::Abort);
    let extractor =
        ArticleExtractor::new(&ExtractorConfig::default()).expect("Failed to compile selectors");

    WaveScheduler::new(
        client,
        extractor,
        offloader,
        gate,
        LinkFilter::default(),
        "test-source",
        limits,
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn index_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body><nav>{}</nav></body></html>", anchors)
}

fn article_page(title: &str, links: &[&str], body_extra: &str) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">related</a>"#, href))
        .collect();
    format!(
        r#"<html><body>
        <h1 data-test-locator="headline">{title}</h1>
        <time>2024-03-01 16:00</time>
        <div class="caas-body"><p>Story of {title}.</p>{body_extra}</div>
        <aside>{anchors}</aside>
        </body></html>"#,
        title = title,
        body_extra = body_extra,
        anchors = anchors
    )
}

async fn mount_article(server: &MockServer, route: &str, title: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(article_page(title, &[], "")))
        .expect(expected)
        .mount(server)
        .await;
}

fn sorted_links(articles: &[Article]) -> Vec<String> {
    let mut links: Vec<String> = articles.iter().map(|a| a.link.clone()).collect();
    links.sort();
    links
}

#[tokio::test]
async fn test_seed_with_news_and_other_links() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&[
            "/news/first.html",
            "/news/second.html",
            &format!("{}/news/third.html", server.uri()),
            "/markets/quote",
            "/about",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    mount_article(&server, "/news/first.html", "First", 1).await;
    mount_article(&server, "/news/second.html", "Second", 1).await;
    mount_article(&server, "/news/third.html", "Third", 1).await;

    Mock::given(method("GET"))
        .and(path("/markets/quote"))
        .respond_with(html(index_page(&[])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(index_page(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(1, 4), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.stats.tasks_scheduled, 4);
    assert_eq!(outcome.stats.tasks_attempted, 4);
    assert_eq!(outcome.stats.links_dropped, 2);
    assert_eq!(outcome.articles.len(), 3);

    let base = server.uri();
    assert_eq!(
        sorted_links(&outcome.articles),
        vec![
            format!("{}/news/first.html", base),
            format!("{}/news/second.html", base),
            format!("{}/news/third.html", base),
        ]
    );
    assert!(outcome.articles.iter().all(|a| a.source == "test-source"));
}

#[tokio::test]
async fn test_image_without_source_is_skipped() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    let body = r#"
        <figure><img src="/img/photo-1"><figcaption>Trading floor</figcaption></figure>
        <figure><img alt="lazy placeholder"><figcaption>Orphan caption</figcaption></figure>
        <p>Closing remarks.</p>"#;

    Mock::given(method("GET"))
        .and(path("/news/photo.html"))
        .respond_with(html(article_page("Photo story", &[], body)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/photo-1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(0, 2), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/news/photo.html", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.articles.len(), 1);
    let article = &outcome.articles[0];
    assert_eq!(article.title, "Photo story");
    assert_eq!(article.published_at, "2024-03-01 16:00");
    assert_eq!(article.images.len(), 1);
    assert_eq!(article.images[0].description, "Trading floor");
    assert!(article.body.contains("{{img0}}"));
    assert!(!article.body.contains("{{img1}}"));
    assert!(!article.body.contains("Trading floor"));

    let stored = Path::new(&article.images[0].public_url);
    assert!(stored.is_absolute());
    assert!(stored.ends_with("photo-1.jpg"));
    assert_eq!(std::fs::read(stored).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);
    assert_eq!(outcome.stats.images_stored, 1);
}

#[tokio::test]
async fn test_failed_image_offload_keeps_article() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    let body = r#"<img src="/img/missing"><img data-src="/img/page.html">"#;
    Mock::given(method("GET"))
        .and(path("/news/broken-images.html"))
        .respond_with(html(article_page("Broken images", &[], body)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/page.html"))
        .respond_with(html("<html></html>".to_string()))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(0, 2), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/news/broken-images.html", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.articles.len(), 1);
    assert!(outcome.articles[0].images.is_empty());
    // Placeholders of dropped images stay in the body
    assert!(outcome.articles[0].body.contains("{{img0}}"));
    assert!(outcome.articles[0].body.contains("{{img1}}"));
    assert_eq!(outcome.stats.offload_failures, 2);
    assert_eq!(std::fs::read_dir(images.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn test_depth_boundary_schedules_no_children() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&["/news/a.html"])))
        .mount(&server)
        .await;

    // Depth 1 = max depth: extracted, but its links are not followed
    Mock::given(method("GET"))
        .and(path("/news/a.html"))
        .respond_with(html(article_page("A", &["/news/b.html", "/news/c.html"], "")))
        .expect(1)
        .mount(&server)
        .await;

    mount_article(&server, "/news/b.html", "B", 0).await;
    mount_article(&server, "/news/c.html", "C", 0).await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(1, 2), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.stats.tasks_scheduled, 2);
    assert_eq!(outcome.articles.len(), 1);
    assert_eq!(outcome.articles[0].title, "A");
}

#[tokio::test]
async fn test_recursion_to_depth_two() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&["/news/a.html"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/a.html"))
        .respond_with(html(article_page("A", &["/news/b.html", "/news/a.html", "/"], "")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/b.html"))
        .respond_with(html(article_page("B", &["/news/c.html"], "")))
        .expect(1)
        .mount(&server)
        .await;
    mount_article(&server, "/news/c.html", "C", 0).await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(2, 3), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.articles.len(), 2);
    assert_eq!(outcome.stats.tasks_scheduled, 3);
}

#[tokio::test]
async fn test_fetch_failure_does_not_stop_siblings() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&[
            "/news/ok-1.html",
            "/news/broken.html",
            "/news/ok-2.html",
            "/news/not-html.html",
        ])))
        .mount(&server)
        .await;

    mount_article(&server, "/news/ok-1.html", "OK 1", 1).await;
    mount_article(&server, "/news/ok-2.html", "OK 2", 1).await;
    Mock::given(method("GET"))
        .and(path("/news/broken.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/not-html.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"a":1}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(1, 2), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.stats.tasks_attempted, 5);
    assert_eq!(outcome.stats.fetch_failures, 2);
    assert_eq!(outcome.articles.len(), 2);
    assert!(outcome.articles.iter().all(|a| a.title.starts_with("OK")));
}

#[tokio::test]
async fn test_concurrency_never_exceeds_slots() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    let links: Vec<String> = (0..8).map(|i| format!("/news/slow-{}.html", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&link_refs)))
        .mount(&server)
        .await;

    for (i, link) in links.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(link.as_str()))
            .respond_with(
                html(article_page(&format!("Slow {}", i), &[], ""))
                    .set_delay(Duration::from_millis(150)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(1, 3), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.articles.len(), 8);
    assert!(outcome.stats.peak_running >= 1);
    assert!(outcome.stats.peak_running <= 3);
}

#[tokio::test]
async fn test_single_slot_runs_tasks_one_at_a_time() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&["/news/x.html", "/news/y.html"])))
        .mount(&server)
        .await;
    for (route, title) in [("/news/x.html", "X"), ("/news/y.html", "Y")] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(article_page(title, &[], "")).set_delay(Duration::from_millis(50)))
            .mount(&server)
            .await;
    }

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(1, 1), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.stats.peak_running, 1);
    assert_eq!(outcome.articles.len(), 2);
}

#[tokio::test]
async fn test_deadline_abandons_pending_tasks() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    let links: Vec<String> = (0..6).map(|i| format!("/news/late-{}.html", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&link_refs)))
        .mount(&server)
        .await;
    for link in &links {
        Mock::given(method("GET"))
            .and(path(link.as_str()))
            .respond_with(html(article_page("Late", &[], "")).set_delay(Duration::from_millis(400)))
            .mount(&server)
            .await;
    }

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let limits = SchedulerLimits {
        max_depth: 1,
        max_concurrent_tasks: 1,
        wave_deadline: Duration::from_millis(600),
    };
    let scheduler = create_scheduler(store, images.path(), limits, DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;
    let stats = outcome.stats;

    assert!(stats.tasks_abandoned >= 1);
    assert_eq!(stats.tasks_attempted + stats.tasks_abandoned, stats.tasks_scheduled);
    // Admitted tasks run to completion
    assert_eq!(outcome.articles.len(), stats.tasks_attempted - 1);
    assert!(outcome.articles.len() < 6);
}

#[tokio::test]
async fn test_existing_links_are_not_fetched() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&["/news/old.html", "/news/new.html"])))
        .mount(&server)
        .await;
    mount_article(&server, "/news/old.html", "Old", 0).await;
    mount_article(&server, "/news/new.html", "New", 1).await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    store
        .insert_many(&[Article {
            title: "Old".to_string(),
            published_at: "2024-03-01 16:00".to_string(),
            body: "Story of Old.".to_string(),
            images: vec![],
            source: "test-source".to_string(),
            link: format!("{}/news/old.html", base),
        }])
        .unwrap();

    let scheduler = create_scheduler(store, images.path(), limits(1, 2), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", base)).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.stats.skipped_existing, 1);
    assert_eq!(outcome.articles.len(), 1);
    assert_eq!(outcome.articles[0].title, "New");
}

#[tokio::test]
async fn test_title_time_dedup_skips_before_offload() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&["/news/repost.html"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/repost.html"))
        .respond_with(html(article_page("Same story", &[], r#"<img src="/img/never">"#)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/never"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8], "image/png"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    store
        .insert_many(&[Article {
            title: "Same story".to_string(),
            published_at: "2024-03-01 16:00".to_string(),
            body: String::new(),
            images: vec![],
            source: "other".to_string(),
            link: "https://elsewhere.example.com/news/original.html".to_string(),
        }])
        .unwrap();

    let scheduler = create_scheduler(store, images.path(), limits(1, 2), DedupKeyKind::TitleTime);
    let seed = url::Url::parse(&format!("{}/", base)).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert!(outcome.articles.is_empty());
    assert_eq!(outcome.stats.skipped_existing, 1);
}

#[tokio::test]
async fn test_headline_less_articles_are_not_merged() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&["/news/new-story.html"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/new-story.html"))
        .respond_with(html(
            r#"<html><body><div class="caas-body"><p>Untitled brief.</p></div></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    store
        .insert_many(&[Article {
            title: String::new(),
            published_at: String::new(),
            body: "Another brief.".to_string(),
            images: vec![],
            source: "other".to_string(),
            link: "https://elsewhere.example.com/news/old.html".to_string(),
        }])
        .unwrap();

    let scheduler = create_scheduler(store, images.path(), limits(1, 2), DedupKeyKind::TitleTime);
    let seed = url::Url::parse(&format!("{}/", base)).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.stats.skipped_existing, 0);
    assert_eq!(
        sorted_links(&outcome.articles),
        vec![format!("{}/news/new-story.html", base)]
    );
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let server = MockServer::start().await;
    let images = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&[
            "/news/dup.html",
            "/news/dup.html#comments",
            "/news/dup.html?utm_source=home",
            "#top",
            "",
        ])))
        .mount(&server)
        .await;
    mount_article(&server, "/news/dup.html", "Dup", 1).await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let scheduler = create_scheduler(store, images.path(), limits(1, 4), DedupKeyKind::Link);
    let seed = url::Url::parse(&format!("{}/", server.uri())).unwrap();

    let outcome = scheduler.run(&seed).await;

    assert_eq!(outcome.articles.len(), 1);
    assert_eq!(outcome.stats.tasks_scheduled, 2);
}

#[tokio::test]
async fn test_coordinator_full_wave() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("news.db");
    let report_path = dir.path().join("report.md");
    let image_root = dir.path().join("files").join("download");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(index_page(&["/news/one.html", "/news/two.html"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/one.html"))
        .respond_with(html(article_page("One", &[], r#"<img src="/img/one-photo">"#)))
        .mount(&server)
        .await;
    mount_article(&server, "/news/two.html", "Two", 1).await;
    Mock::given(method("GET"))
        .and(path("/img/one-photo"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 16], "image/png"))
        .mount(&server)
        .await;

    let toml = format!(
        r#"
[crawler]
seed-url = "{seed}/"
source = "yahoo-stock"
max-depth = 1
max-concurrent-tasks = 4
wave-deadline-secs = 10

[user-agent]
crawler-name = "news-wave"
crawler-version = "0.1"
contact-url = "https://example.com/bot"

[storage]
mode = "local"
root = "{root}"

[output]
database-path = "{db}"
summary-path = "{report}"
"#,
        seed = server.uri(),
        root = image_root.display(),
        db = db_path.display(),
        report = report_path.display()
    );
    let config = parse_config(&toml, |_| None).expect("Failed to parse config");
    let coordinator = Coordinator::new(config, "test-hash").expect("Failed to create coordinator");

    let first = coordinator.run_wave().await.expect("Wave failed");
    assert_eq!(first.status, "completed");
    assert_eq!(first.articles_extracted, 2);
    assert_eq!(first.articles_inserted, 2);
    assert_eq!(first.images_stored, 1);
    assert!(first.articles_inserted <= first.articles_extracted);

    let storage = coordinator.storage();
    assert_eq!(storage.count_articles().unwrap(), 2);
    assert_eq!(storage.count_images().unwrap(), 1);
    assert_eq!(storage.count_wave_articles(first.wave_id).unwrap(), 2);

    let one = storage
        .find_article(&format!("{}/news/one.html", server.uri()))
        .unwrap()
        .expect("article one stored");
    assert_eq!(one.source, "yahoo-stock");
    assert_eq!(one.images.len(), 1);
    assert!(one.images[0].public_url.ends_with("one-photo.png"));
    assert!(image_root.join("one-photo.png").exists());

    let report = std::fs::read_to_string(&report_path).unwrap();
    assert!(report.contains("- **Inserted**: 2"));

    // Second wave: everything is already ingested
    let second = coordinator.run_wave().await.expect("Wave failed");
    assert_eq!(second.articles_inserted, 0);
    assert_eq!(second.skipped_existing, 2);
    assert_eq!(storage.count_articles().unwrap(), 2);
    assert_eq!(storage.count_wave_articles(second.wave_id).unwrap(), 0);
    assert_eq!(storage.count_waves().unwrap(), 2);
}

#[tokio::test]
async fn test_offloader_rejects_non_image_responses() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/img/error-page"))
        .respond_with(html("<html>oops</html>".to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/animated"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x47, 0x49, 0x46], "image/gif"))
        .mount(&server)
        .await;

    let client = build_http_client(&user_agent()).unwrap();
    let offloader = MediaOffloader::new(client, Arc::new(LocalBackend::new(dir.path())));

    let result = offloader.offload(&format!("{}/img/error-page", server.uri())).await;
    assert!(matches!(result, Err(OffloadError::UnsupportedContentType { .. })));

    let result = offloader.offload(&format!("{}/img/gone", server.uri())).await;
    assert!(matches!(result, Err(OffloadError::DownloadFailed { .. })));

    let result = offloader.offload(&format!("{}/img/", server.uri())).await;
    assert!(matches!(result, Err(OffloadError::InvalidSource(_))));

    let first = offloader
        .offload(&format!("{}/img/animated", server.uri()))
        .await
        .unwrap();
    let second = offloader
        .offload(&format!("{}/img/animated", server.uri()))
        .await
        .unwrap();
    assert_eq!(first.filename, "animated.gif");
    assert_eq!(first.location, second.location);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_remote_backend_signed_put() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/news-images/images/photo.jpg"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let config = RemoteStorageConfig {
        bucket: "news-images".to_string(),
        region: "us-east-1".to_string(),
        key_prefix: "images/".to_string(),
        endpoint: Some(server.uri()),
        public_base_url: Some("https://cdn.example.com".to_string()),
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_access_key: Some("secret".to_string()),
    };
    let backend = RemoteBackend::new(&config).unwrap();

    let first = backend
        .store("photo.jpg", vec![1, 2, 3], Some("image/jpeg"))
        .await
        .unwrap();
    let second = backend
        .store("photo.jpg", vec![4, 5, 6], Some("image/jpeg"))
        .await
        .unwrap();

    assert_eq!(first, "https://cdn.example.com/images/photo.jpg");
    assert_eq!(first, second);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_remote_backend_rejected_upload() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = RemoteStorageConfig {
        bucket: "news-images".to_string(),
        region: "us-east-1".to_string(),
        key_prefix: "images/".to_string(),
        endpoint: Some(server.uri()),
        public_base_url: None,
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_access_key: Some("wrong".to_string()),
    };
    let backend = RemoteBackend::new(&config).unwrap();

    let result = backend.store("photo.jpg", vec![1], None).await;
    assert!(matches!(result, Err(OffloadError::StorageWriteFailed { .. })));
}
