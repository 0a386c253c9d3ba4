//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, reading back the written artifacts.

use serde::de::DeserializeOwned;
use site_atlas::config::Config;
use site_atlas::crawler::run_crawl;
use site_atlas::output::{rebuild_from_pages, PathFilter};
use site_atlas::{EdgeRecord, ErrorRecord, PageRecord};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing every artifact under `dir`
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::with_base_url(format!("{}/", base_url));
    config.crawler.delay_secs = 0.0;
    config.crawler.timeout_secs = 5.0;
    config.output.pages_path = dir.join("pages.jsonl").display().to_string();
    config.output.edges_path = dir.join("edges.jsonl").display().to_string();
    config.output.errors_path = dir.join("errors.jsonl").display().to_string();
    config.output.hierarchy_path = dir.join("hierarchy.json").display().to_string();
    config
}

fn read_jsonl<T: DeserializeOwned>(path: &str) -> Vec<T> {
    std::fs::read_to_string(path)
        .expect("Failed to read stream")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Malformed JSON line"))
        .collect()
}

struct Artifacts {
    pages: Vec<PageRecord>,
    edges: Vec<EdgeRecord>,
    errors: Vec<ErrorRecord>,
    hierarchy: serde_json::Value,
}

fn read_artifacts(config: &Config) -> Artifacts {
    let hierarchy = std::fs::read_to_string(&config.output.hierarchy_path)
        .expect("Failed to read hierarchy");
    Artifacts {
        pages: read_jsonl(&config.output.pages_path),
        edges: read_jsonl(&config.output.edges_path),
        errors: read_jsonl(&config.output.errors_path),
        hierarchy: serde_json::from_str(&hierarchy).expect("Malformed hierarchy"),
    }
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>Test</title></head><body>{}</body></html>",
            body
        ),
        "text/html",
    )
}

async fn mount_html(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cross_origin_links_are_not_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(
        &mock_server,
        "/",
        r#"<a href="/about">About</a>
           <a href="https://external.invalid/page">External</a>
           <a href="mailto:info@example.com">Mail</a>"#,
    )
    .await;
    mount_html(&mock_server, "/about", r#"<a href="https://external.invalid/other">x</a>"#).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());
    let stats = run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    let urls: Vec<&str> = artifacts.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/", base_url), format!("{}/about", base_url)]);
    assert_eq!(
        artifacts.edges,
        vec![EdgeRecord {
            source: format!("{}/", base_url),
            target: format!("{}/about", base_url),
        }]
    );
    assert!(artifacts.errors.is_empty());
    assert_eq!(stats.pages_recorded, 2);

    let about = &artifacts.pages[1];
    assert_eq!(about.status_code, Some(200));
    assert_eq!(about.title.as_deref(), Some("Test"));
    assert_eq!(about.parent_url.as_deref(), Some(format!("{}/", base_url).as_str()));
    assert_eq!(about.depth, 1);
}

#[tokio::test]
async fn test_max_depth_zero_fetches_only_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(&mock_server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page(""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.max_depth = 0;
    run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    assert_eq!(artifacts.pages.len(), 1);
    assert_eq!(artifacts.pages[0].depth, 0);
    assert_eq!(artifacts.pages[0].parent_url, None);
    assert!(artifacts.errors.is_empty());
}

#[tokio::test]
async fn test_robots_disallowed_urls_are_not_fetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 200, "User-agent: *\nDisallow: /private/\n").await;

    mount_html(&mock_server, "/", r#"<a href="/private/x">P</a><a href="/public">Q</a>"#).await;
    mount_html(&mock_server, "/public", "").await;
    Mock::given(method("GET"))
        .and(path("/private/x"))
        .respond_with(html_page("secret"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());
    let stats = run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    let blocked = format!("{}/private/x", base_url);
    assert!(artifacts.pages.iter().all(|p| p.url != blocked));
    assert_eq!(artifacts.pages.len(), 2);
    assert_eq!(artifacts.errors.len(), 1);
    assert_eq!(artifacts.errors[0].url, blocked);
    assert!(artifacts.errors[0].error.starts_with("robots:"));
    assert_eq!(stats.urls_blocked, 1);
}

#[tokio::test]
async fn test_record_blocked_urls_writes_null_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 200, "User-agent: *\nDisallow: /private/\n").await;
    mount_html(&mock_server, "/", r#"<a href="/private/x">P</a>"#).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.record_blocked_urls = true;
    run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    assert_eq!(artifacts.pages.len(), 2);
    let blocked = &artifacts.pages[1];
    assert_eq!(blocked.url, format!("{}/private/x", base_url));
    assert_eq!(blocked.status_code, None);
    assert_eq!(blocked.title, None);
    assert_eq!(blocked.meta_description, None);
    assert_eq!(blocked.depth, 1);
    assert!(artifacts.errors.is_empty());

    // Blocked pages are not part of the site hierarchy
    assert!(artifacts.hierarchy.get("children").is_none());
}

#[tokio::test]
async fn test_timeout_yields_one_error_and_crawl_continues() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(&mock_server, "/", r#"<a href="/slow">S</a><a href="/zfast">F</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html_page("").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/zfast", "").await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.timeout_secs = 0.5;
    let stats = run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    assert_eq!(artifacts.errors.len(), 1);
    assert_eq!(artifacts.errors[0].url, format!("{}/slow", base_url));
    assert!(
        artifacts.errors[0].error.starts_with("timeout:"),
        "unexpected error: {}",
        artifacts.errors[0].error
    );
    assert_eq!(artifacts.errors[0].depth, 1);

    let urls: Vec<&str> = artifacts.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/", base_url), format!("{}/zfast", base_url)]);
    assert_eq!(stats.errors, 1);
}

#[tokio::test]
async fn test_each_url_recorded_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(&mock_server, "/", r#"<a href="/a">A</a><a href="/b">B</a><a href="/#top">Top</a>"#).await;
    mount_html(&mock_server, "/a", r#"<a href="/">Home</a><a href="/b#s">B</a><a href="/a">Self</a>"#).await;
    mount_html(&mock_server, "/b", r#"<a href="/a">A</a><a href="/c">C</a>"#).await;
    mount_html(&mock_server, "/c", r#"<a href="/">Home</a>"#).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());
    run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    let unique: HashSet<&str> = artifacts.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(unique.len(), artifacts.pages.len());
    assert_eq!(unique.len(), 4);

    // Breadth-first: depths never decrease along the stream
    let depths: Vec<u32> = artifacts.pages.iter().map(|p| p.depth).collect();
    assert_eq!(depths, vec![0, 1, 1, 2]);

    // Every non-seed page is one hop below its parent
    for page in artifacts.pages.iter().skip(1) {
        let parent = page.parent_url.as_deref().unwrap();
        let parent_depth = artifacts
            .pages
            .iter()
            .find(|p| p.url == parent)
            .map(|p| p.depth)
            .unwrap();
        assert_eq!(page.depth, parent_depth + 1);
    }
}

#[tokio::test]
async fn test_max_pages_limits_admitted_urls() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(&mock_server, "/", r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#).await;
    mount_html(&mock_server, "/a", "").await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.max_pages = Some(2);
    let stats = run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    let urls: Vec<&str> = artifacts.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/", base_url), format!("{}/a", base_url)]);
    assert!(stats.page_limit_reached);
    assert_eq!(stats.urls_seen, 2);
}

#[tokio::test]
async fn test_sitemap_seeds_orphan_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(&mock_server, "/", "no links here").await;
    mount_html(&mock_server, "/orphan", "").await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{0}/orphan</loc></url><url><loc>{0}/</loc></url>\
             <url><loc>https://external.invalid/x</loc></url></urlset>",
            base_url
        )))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.sitemap.enabled = true;
    let stats = run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    assert_eq!(artifacts.pages.len(), 2);
    let orphan = &artifacts.pages[1];
    assert_eq!(orphan.url, format!("{}/orphan", base_url));
    assert_eq!(orphan.depth, 1);
    assert_eq!(orphan.parent_url.as_deref(), Some(format!("{}/", base_url).as_str()));
    assert_eq!(stats.sitemap_urls, 1);
}

#[tokio::test]
async fn test_redirect_records_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(&mock_server, "/", r#"<a href="/old">Old</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/new", r#"<a href="sibling">S</a>"#).await;
    mount_html(&mock_server, "/sibling", "").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());
    run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    let old = artifacts
        .pages
        .iter()
        .find(|p| p.url == format!("{}/old", base_url))
        .expect("No record for redirected URL");
    assert_eq!(old.status_code, Some(200));
    assert_eq!(old.final_url, Some(format!("{}/new", base_url)));

    // Links on the landing page resolve against the landing URL
    assert!(artifacts.edges.contains(&EdgeRecord {
        source: format!("{}/old", base_url),
        target: format!("{}/sibling", base_url),
    }));
    assert!(artifacts.pages[0].final_url.is_none());
}

#[tokio::test]
async fn test_redirect_into_disallowed_path_is_not_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 200, "User-agent: *\nDisallow: /private/\n").await;

    mount_html(&mock_server, "/", r#"<a href="/old">Old</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/private/x"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/x"))
        .respond_with(html_page("secret"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());
    let stats = run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    let old = &artifacts.pages[1];
    assert_eq!(old.url, format!("{}/old", base_url));
    assert_eq!(old.status_code, Some(301));
    assert_eq!(old.final_url, Some(format!("{}/private/x", base_url)));
    assert_eq!(old.title, None);
    assert_eq!(artifacts.pages.len(), 2);
    assert_eq!(stats.redirects_refused, 1);
}

#[tokio::test]
async fn test_redirect_off_origin_is_not_followed() {
    let mock_server = MockServer::start().await;
    let foreign_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    // localhost is a different host from 127.0.0.1, so a different origin
    let foreign_port = url::Url::parse(&foreign_server.uri()).unwrap().port().unwrap();
    let foreign = format!("http://localhost:{}/elsewhere", foreign_port);

    mount_html(&mock_server, "/", r#"<a href="/out">Out</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/out"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", foreign.as_str()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html_page("<title>Elsewhere</title>"))
        .expect(0)
        .mount(&foreign_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());
    run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    let out = &artifacts.pages[1];
    assert_eq!(out.url, format!("{}/out", base_url));
    assert_eq!(out.status_code, Some(302));
    assert_eq!(out.final_url.as_deref(), Some(foreign.as_str()));
    assert_eq!(out.title, None);
    assert!(artifacts.edges.iter().all(|e| !e.target.contains("localhost")));
}

#[tokio::test]
async fn test_rebuilt_hierarchy_matches_live_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 200, "User-agent: *\nDisallow: /private/\n").await;
    mount_html(&mock_server, "/", r#"<a href="/private/x">P</a><a href="/docs/a">A</a>"#).await;
    mount_html(&mock_server, "/docs/a", "").await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.record_blocked_urls = true;
    run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);
    assert_eq!(artifacts.pages.len(), 3);

    let root_name = artifacts.hierarchy["name"].as_str().unwrap().to_string();
    let (root, stats) =
        rebuild_from_pages(&config.output.pages_path, &root_name, &PathFilter::default())
            .expect("Rebuild failed");

    assert_eq!(stats.unfetched, 1);
    assert_eq!(serde_json::to_value(root.to_d3()).unwrap(), artifacts.hierarchy);
}

#[tokio::test]
async fn test_hierarchy_written_with_exclusions() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_robots(&mock_server, 404, "").await;

    mount_html(
        &mock_server,
        "/",
        r#"<a href="/personas/cuentas">C</a><a href="/personas/tarjetas">T</a><a href="/wps/portal">W</a>"#,
    )
    .await;
    mount_html(&mock_server, "/personas/cuentas", "").await;
    mount_html(&mock_server, "/personas/tarjetas", "").await;
    mount_html(&mock_server, "/wps/portal", "").await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.hierarchy.exclude_prefixes = vec!["/wps".to_string()];
    run_crawl(config.clone()).await.expect("Crawl failed");
    let artifacts = read_artifacts(&config);

    // Excluded pages are still crawled and recorded
    assert_eq!(artifacts.pages.len(), 4);

    let host = url::Url::parse(&base_url).unwrap();
    let expected_root = format!("{}:{}", host.host_str().unwrap(), host.port().unwrap());
    assert_eq!(
        artifacts.hierarchy,
        serde_json::json!({
            "name": expected_root,
            "children": [
                {
                    "name": "personas",
                    "children": [
                        { "name": "cuentas", "value": 1 },
                        { "name": "tarjetas", "value": 1 }
                    ]
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_invalid_config_fails_before_crawling() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config("http://127.0.0.1:1", dir.path());
    config.crawler.max_pages = Some(0);

    assert!(run_crawl(config.clone()).await.is_err());
    assert!(!Path::new(&config.output.pages_path).exists());
}
