//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! orchestrator end-to-end: seeding, rate limiting, retry, dedup and
//! checkpoint/resume.

use std::path::Path;
use trawline::config::{
    Config, EngineConfig, ExtractConfig, OutputConfig, PolitenessConfig, RetryConfig, ScopeConfig,
    UserAgentConfig,
};
use trawline::frontier::PendingTask;
use trawline::store::{SqliteStore, Store};
use trawline::Orchestrator;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with the given seeds and database path
fn create_test_config(seeds: Vec<String>, db_path: &str) -> Config {
    Config {
        seeds,
        engine: EngineConfig {
            max_concurrency: 3,
            max_attempts: 3,
            fetch_timeout_ms: 2000,
            checkpoint_interval_secs: 60,
            max_depth: 3,
        },
        politeness: PolitenessConfig {
            per_host_rate: 200.0,
            per_host_burst: 200.0,
        },
        retry: RetryConfig {
            backoff_base_ms: 10,
            backoff_cap_ms: 100,
        },
        output: OutputConfig {
            storage_path: db_path.to_string(),
        },
        scope: ScopeConfig::default(),
        user_agent: UserAgentConfig {
            name: "TestBot".to_string(),
            version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        extract: ExtractConfig::default(),
    }
}

fn page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">link</a>", href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    )
}

#[tokio::test]
async fn full_crawl_discovers_and_records_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Home", &["/page1"])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Page One", &[])))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(vec![format!("{}/", base_url)], db_path.to_str().unwrap());

    let orchestrator = Orchestrator::new(config, "test-hash", false).unwrap();
    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.records_appended, 2);
    assert_eq!(stats.records_deduped, 0);

    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(store.count_records().unwrap(), 2);

    // The crawl drained completely, so the final checkpoint is empty.
    let (_, pending) = store.load_latest_checkpoint().unwrap().unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn throttled_host_succeeds_within_retry_budget() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Two 429s, then a success. The earlier mount takes priority until its
    // response budget is spent.
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Finally", &[])))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(vec![format!("{}/slow", base_url)], db_path.to_str().unwrap());

    let orchestrator = Orchestrator::new(config, "test-hash", false).unwrap();
    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.retried, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.records_appended, 1);
}

#[tokio::test]
async fn persistently_failing_host_is_recorded_as_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(vec![format!("{}/down", base_url)], db_path.to_str().unwrap());

    let orchestrator = Orchestrator::new(config, "test-hash", false).unwrap();
    let stats = orchestrator.run().await.unwrap();

    // max_attempts is 3: two retries, then terminal failure.
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.records_appended, 0);

    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(store.count_failures().unwrap(), 1);
}

#[tokio::test]
async fn seeds_normalizing_to_same_target_produce_one_task() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Once", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    // Same page spelled three ways: trailing slash, fragment, tracking param.
    let config = create_test_config(
        vec![
            format!("{}/page", base_url),
            format!("{}/page/", base_url),
            format!("{}/page?utm_source=mail#top", base_url),
        ],
        db_path.to_str().unwrap(),
    );

    let orchestrator = Orchestrator::new(config, "test-hash", false).unwrap();
    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.completed, 1);
    assert_eq!(stats.records_appended, 1);
}

#[tokio::test]
async fn resume_continues_from_checkpoint_without_duplicates() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/done"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Already Done", &[])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pending"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Still Pending", &[])))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");

    // Simulate an interrupted run: /done was fetched and appended, /pending
    // was still in the frontier when the process died.
    {
        let config =
            create_test_config(vec![format!("{}/done", base_url)], db_path.to_str().unwrap());
        let orchestrator = Orchestrator::new(config, "test-hash", false).unwrap();
        let stats = orchestrator.run().await.unwrap();
        assert_eq!(stats.records_appended, 1);

        let mut store = SqliteStore::new(&db_path).unwrap();
        store
            .checkpoint(&[
                PendingTask {
                    url: format!("{}/done", base_url),
                    depth: 0,
                    priority: 0,
                    attempts: 0,
                    parent: None,
                    delay_ms: 0,
                },
                PendingTask {
                    url: format!("{}/pending", base_url),
                    depth: 0,
                    priority: 0,
                    attempts: 0,
                    parent: None,
                    delay_ms: 500,
                },
            ])
            .unwrap();
    }

    let config = create_test_config(vec![format!("{}/done", base_url)], db_path.to_str().unwrap());
    let orchestrator = Orchestrator::new(config, "test-hash", false).unwrap();
    let stats = orchestrator.run().await.unwrap();

    // Both checkpointed tasks were re-fetched, but the /done record was
    // deduplicated; only /pending added output.
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.records_appended, 1);
    assert_eq!(stats.records_deduped, 1);

    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(store.count_records().unwrap(), 2);
}

#[tokio::test]
async fn rerunning_a_completed_crawl_adds_nothing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Stable", &[])))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seeds = vec![format!("{}/page", base_url)];

    let orchestrator = Orchestrator::new(
        create_test_config(seeds.clone(), db_path.to_str().unwrap()),
        "test-hash",
        false,
    )
    .unwrap();
    let first = orchestrator.run().await.unwrap();
    assert_eq!(first.records_appended, 1);

    // Second run reseeds (the completed checkpoint is empty) but every
    // record fingerprint is already known.
    let orchestrator = Orchestrator::new(
        create_test_config(seeds, db_path.to_str().unwrap()),
        "test-hash",
        false,
    )
    .unwrap();
    let second = orchestrator.run().await.unwrap();
    assert_eq!(second.records_appended, 0);
    assert_eq!(second.records_deduped, 1);

    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(store.count_records().unwrap(), 1);
}

#[tokio::test]
async fn offsite_links_stay_out_of_scope() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(
            "Gateway",
            &["https://offsite.example.com/elsewhere", "/local"],
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/local"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Local", &[])))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(vec![format!("{}/", base_url)], db_path.to_str().unwrap());

    let orchestrator = Orchestrator::new(config, "test-hash", false).unwrap();
    let stats = orchestrator.run().await.unwrap();

    // Only the seed and the on-host link were fetched.
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 0);
}

#[test]
fn export_lists_records_in_append_order() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let mut store = SqliteStore::new(Path::new(&db_path)).unwrap();

    for (i, title) in ["First", "Second"].iter().enumerate() {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("title".to_string(), title.to_string());
        store
            .append(&trawline::store::ExtractedRecord {
                task_id: i as u64,
                source_url: format!("https://a.test/{}", i),
                fields,
                fingerprint: format!("fp-{}", i),
                extracted_at: chrono::Utc::now(),
            })
            .unwrap();
    }

    let exported = store.export_records().unwrap();
    assert_eq!(exported.len(), 2);
    assert!(exported[0].contains("First"));
    assert!(exported[1].contains("Second"));
}
