//! Host-level tests: config persistence, catalog search and NDJSON output.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Write;
use std::process::Command;
use std::sync::{Arc, Mutex};

use multisearch::{HostConfig, ListenerMode, SearchRequest, SourceConfig, run_search};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Writer whose bytes stay readable after the listener is gone.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn lines(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

fn source(id: &str, entries: &[&str], limit: usize, sort_weight: i32) -> SourceConfig {
    SourceConfig {
        id: id.into(),
        entries: entries.iter().map(|e| (*e).to_string()).collect(),
        limit,
        sort_weight,
        ..SourceConfig::default()
    }
}

fn events_named<'a>(lines: &'a [Value], name: &str) -> Vec<&'a Value> {
    lines.iter().filter(|line| line["event"] == name).collect()
}

fn test_config(listener: ListenerMode) -> HostConfig {
    let mut config = HostConfig {
        listener,
        sources: vec![
            source("files", &["search.rs", "README.md", "searcher.rs"], 5, 10),
            source("recent", &["readme.md", "notes.txt"], 5, 1),
        ],
        ..HostConfig::default()
    };
    config.search.throttle_delay_ms = 20;
    config
}

// ---------------------------------------------------------------------------
// Config persistence
// ---------------------------------------------------------------------------

#[test]
fn config_round_trips_through_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = test_config(ListenerMode::WaitForSources);
    config.sources[1].slow = true;
    config.sources[1].control_prefix = Some("#".into());
    config.save_to_file(&path).unwrap();

    let loaded = HostConfig::load(Some(&path)).unwrap();
    assert_eq!(loaded.listener, ListenerMode::WaitForSources);
    assert_eq!(loaded.sources, config.sources);
    assert_eq!(loaded.search.throttle_delay_ms, 20);
}

#[test]
fn invalid_file_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "sources = []\n").unwrap();
    assert!(HostConfig::load(Some(&path)).is_err());

    std::fs::write(&path, "this is not valid toml {{{").unwrap();
    assert!(HostConfig::load(Some(&path)).is_err());
}

// ---------------------------------------------------------------------------
// Searches
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn direct_search_streams_events_and_dedups_across_sources() {
    let out = SharedBuffer::default();
    let config = test_config(ListenerMode::Direct);
    let request = SearchRequest {
        pattern: "readme".into(),
        more: None,
    };

    let summary = run_search(&config, &request, out.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.results, vec!["README.md".to_string()]);
    assert!(!summary.cancelled);

    let lines = out.lines();
    assert_eq!(lines.first().unwrap()["event"], "search_started");
    assert_eq!(lines.last().unwrap()["event"], "search_finished");
    assert_eq!(events_named(&lines, "search_started").len(), 1);
    assert_eq!(events_named(&lines, "contributor_finished").len(), 2);
    assert!(!lines.iter().any(|line| line.to_string().contains("\"readme\"")));
}

#[tokio::test(flavor = "multi_thread")]
async fn throttled_search_reports_truncation() {
    let out = SharedBuffer::default();
    let mut config = test_config(ListenerMode::Throttled);
    config.sources[0].limit = 1;
    config.dedup = false;
    let request = SearchRequest {
        pattern: "search".into(),
        more: None,
    };

    let summary = run_search(&config, &request, out.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.results, vec!["search.rs".to_string()]);
    assert_eq!(
        summary.has_more.get(&multisearch_core::ContributorId::new("files")),
        Some(&true)
    );
    let lines = out.lines();
    let finished = events_named(&lines, "search_finished");
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0]["has_more"]["files"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn more_expands_one_source() {
    let out = SharedBuffer::default();
    let mut config = test_config(ListenerMode::Direct);
    config.sources[0].limit = 1;
    let request = SearchRequest {
        pattern: "search".into(),
        more: Some("files".into()),
    };

    let summary = run_search(&config, &request, out.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        summary.results,
        vec!["search.rs".to_string(), "searcher.rs".to_string()]
    );
    assert_eq!(events_named(&out.lines(), "search_started").len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_is_reported() {
    let out = SharedBuffer::default();
    let mut config = test_config(ListenerMode::Direct);
    config.sources[0].item_delay_ms = 5_000;
    let request = SearchRequest {
        pattern: "s".into(),
        more: None,
    };
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    let summary = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        run_search(&config, &request, out.clone(), cancel),
    )
    .await
    .expect("cancelled in time")
    .unwrap();

    assert!(summary.cancelled);
    let lines = out.lines();
    assert!(events_named(&lines, "search_finished").is_empty());
    assert_eq!(events_named(&lines, "search_cancelled").len(), 1);
    assert_eq!(lines.last().unwrap()["event"], "search_cancelled");
}

#[tokio::test(flavor = "multi_thread")]
async fn throttled_cancellation_writes_no_items() {
    let out = SharedBuffer::default();
    let mut config = test_config(ListenerMode::Throttled);
    config.search.throttle_delay_ms = 2_000;
    config.sources[1].item_delay_ms = 5_000;
    let request = SearchRequest {
        pattern: "search".into(),
        more: None,
    };
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            cancel.cancel();
        });
    }

    let summary = run_search(&config, &request, out.clone(), cancel)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    assert!(summary.cancelled);
    let lines = out.lines();
    assert!(events_named(&lines, "elements_added").is_empty());
    assert_eq!(events_named(&lines, "search_cancelled").len(), 1);
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

#[test]
fn binary_writes_ndjson_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    test_config(ListenerMode::WaitForSources)
        .save_to_file(&path)
        .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_multisearch-host"))
        .arg("--config")
        .arg(&path)
        .arg("search")
        .env("RUST_LOG", "off")
        .output()
        .expect("run multisearch-host");
    assert!(
        output.status.success(),
        "multisearch-host failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.first().unwrap()["event"], "search_started");
    assert_eq!(events_named(&lines, "first_results_ready").len(), 1);
    assert_eq!(lines.last().unwrap()["event"], "search_finished");
}

#[test]
fn binary_rejects_unknown_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_multisearch-host"))
        .arg("--bogus")
        .env("RUST_LOG", "off")
        .output()
        .expect("run multisearch-host");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage"));
}
