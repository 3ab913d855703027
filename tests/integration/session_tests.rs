//! Integration tests for scraping sessions
//!
//! These tests drive whole sessions through the public API: a wiremock
//! server stands in for real sites over HTTP, and an in-memory fetch
//! strategy covers multi-site scheduling (mock servers only listen on
//! 127.0.0.1, so they cannot play several hosts).

use async_trait::async_trait;
use serde_json::json;
use sift_scrape::config::{parse_config, BatchConfig, SessionConfig};
use sift_scrape::pipeline::{BatchUrl, Coordinator, FetchOutcome, FetchStrategy};
use sift_scrape::schema::{load_schema, parse_schema};
use sift_scrape::{run_session, SessionState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves fixed page bodies keyed by full URL and records each batch
struct PageMap {
    pages: HashMap<String, String>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait]
impl FetchStrategy for PageMap {
    async fn fetch_batch(&mut self, batch: &[BatchUrl]) -> sift_scrape::Result<Vec<FetchOutcome>> {
        self.batches
            .lock()
            .unwrap()
            .push(batch.iter().map(|u| u.as_str().to_string()).collect());

        Ok(batch
            .iter()
            .map(|target| match self.pages.get(target.as_str()) {
                Some(body) => FetchOutcome::Body(body.clone()),
                None => FetchOutcome::Status(404),
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> sift_scrape::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "page-map"
    }
}

/// Writes a schema file and loads it back the way the binary does
fn create_schema_file(dir: &TempDir, content: &str) -> sift_scrape::SchemaStore {
    let path = dir.path().join("schema.json");
    std::fs::write(&path, content).unwrap();
    load_schema(&path).unwrap()
}

fn create_test_config() -> SessionConfig {
    parse_config(
        r#"
        [session]
        batch-size = 2
        batch-delay-secs = 0
        extraction-workers = 2

        [http]
        timeout-secs = 5
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_two_sites_interleaved_and_appended() {
    let dir = TempDir::new().unwrap();
    let heading = r#"{ "type": "html", "data": { "heading": { "item-data": [ { "tag": "h1", "attr": ".text" } ] } } }"#;
    let schemas = create_schema_file(&dir, &format!(r#"{{ "a": {heading}, "b": {heading} }}"#));

    let pages: HashMap<String, String> = [
        ("https://a.com/1", "<h1>A one</h1>"),
        ("https://a.com/2", "<h1>A two</h1>"),
        ("https://b.com/1", "<h1>B one</h1>"),
        ("https://b.com/2", "<h1>B two</h1>"),
    ]
    .into_iter()
    .map(|(url, body)| (url.to_string(), body.to_string()))
    .collect();
    let batches = Arc::new(Mutex::new(Vec::new()));

    let mut urls: Vec<String> = pages.keys().cloned().collect();
    urls.sort();

    let config = BatchConfig {
        batch_size: 2,
        batch_delay_secs: 0,
        ..BatchConfig::default()
    };
    let coordinator = Coordinator::with_fetcher(
        &urls,
        Arc::new(schemas),
        &config,
        Box::new(PageMap {
            pages,
            batches: Arc::clone(&batches),
        }),
    )
    .unwrap();

    let report = coordinator.run().await;
    assert_eq!(report.final_state, SessionState::Done);

    // Each batch carries one URL per site
    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 2);
    for batch in batches.iter() {
        assert_eq!(batch.len(), 2);
        assert!(batch[0].starts_with("https://a.com/"));
        assert!(batch[1].starts_with("https://b.com/"));
    }

    // Both sites keep entries from every batch
    assert_eq!(
        serde_json::to_value(&report.results).unwrap(),
        json!({
            "a": [ { "heading": "A one" }, { "heading": "A two" } ],
            "b": [ { "heading": "B one" }, { "heading": "B two" } ]
        })
    );
}

#[tokio::test]
async fn test_http_session_against_mock_server() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <h1> Catalogue </h1>
                <ul>
                    <li class="item"><a href="/p/1">Lamp</a><span class="price">$10</span></li>
                    <li class="item"><a href="/p/2">Desk</a><span class="price">$80</span></li>
                    <li class="item"><a href="/p/3">Chair</a></li>
                </ul>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    // The mock server's host is an IP literal, which is its own site name
    let schemas = parse_schema(
        r#"{ "127.0.0.1": { "type": "html", "data": {
            "title": { "item-data": [ { "tag": "h1", "attr": ".text" } ] },
            "multiple products": {
                "item-data": [ { "tag": "li", "class": "item", "max": 2 } ],
                "name": { "item-data": [ { "tag": "a", "attr": ".text" } ] },
                "link": { "item-data": [ { "tag": "a", "attr": "href" } ] },
                "price": { "item-data": [ { "tag": "span", "class": "price", "attr": ".text" } ] }
            }
        } } }"#,
    )
    .unwrap();

    let urls = vec![
        format!("{}/listing", base_url),
        format!("{}/gone", base_url),
        format!("{}/private", base_url),
    ];

    let results = run_session(&urls, schemas, &create_test_config()).await.unwrap();

    assert_eq!(
        serde_json::to_value(&results).unwrap(),
        json!({
            "127.0.0.1": [
                {
                    "title": "Catalogue",
                    "products": [
                        { "name": "Lamp", "link": "/p/1", "price": "$10" },
                        { "name": "Desk", "link": "/p/2", "price": "$80" }
                    ]
                },
                410,
                403
            ]
        })
    );
}

#[tokio::test]
async fn test_unreachable_host_is_skipped() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Up</h1>"))
        .mount(&mock_server)
        .await;

    let schemas = parse_schema(
        r#"{ "127.0.0.1": { "type": "html", "data": {
            "title": { "item-data": [ { "tag": "h1", "attr": ".text" } ] }
        } } }"#,
    )
    .unwrap();

    // Nothing listens on port 9 of the loopback interface
    let urls = vec![
        "http://127.0.0.1:9/down".to_string(),
        format!("{}/ok", mock_server.uri()),
    ];

    let results = run_session(&urls, schemas, &create_test_config()).await.unwrap();
    assert_eq!(
        serde_json::to_value(&results).unwrap(),
        json!({ "127.0.0.1": [ { "title": "Up" } ] })
    );
}

#[tokio::test]
async fn test_setup_errors_are_returned() {
    let schemas = parse_schema(r#"{}"#).unwrap();

    let err = run_session(&["ftp://example.com/file".to_string()], schemas.clone(), &create_test_config())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ftp"));

    let mut config = create_test_config();
    config.session.batch_size = 0;
    assert!(run_session(&["https://a.com/".to_string()], schemas, &config)
        .await
        .is_err());
}
