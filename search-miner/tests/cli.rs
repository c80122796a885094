use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

/// Command pointed at a closed port so nothing reaches a real cluster.
fn base_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("search-miner").unwrap();
    cmd.current_dir(dir.path())
        .env("ES_HOST", "127.0.0.1")
        .env("ES_PORT", "1")
        .env("ES_SCHEME", "http")
        .env_remove("RUST_LOG")
        .arg("--log-file")
        .arg(dir.path().join("test.log"));
    cmd
}

#[test]
fn help_lists_operations() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--operation"))
        .stdout(contains("--fields"));
}

#[test]
fn operation_is_required() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .assert()
        .failure()
        .stderr(contains("--operation"));
}

#[test]
fn unknown_operation_is_rejected() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .args(["--operation", "reindex"])
        .assert()
        .failure()
        .stderr(contains("invalid value").and(contains("export_csv")));
}

#[test]
fn malformed_query_fails_before_connecting() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .args(["--operation", "query", "--query", "{not json"])
        .assert()
        .code(1)
        .stderr(contains("Invalid JSON in --query"))
        .stderr(contains("Failed to connect").not());
}

#[test]
fn load_without_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .args(["--operation", "load_csv"])
        .assert()
        .code(1)
        .stderr(contains("--input is required"));
}

#[test]
fn aggregate_without_query_is_rejected() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .args(["--operation", "aggregate"])
        .assert()
        .code(1)
        .stderr(contains("--query is required"));
}

#[test]
fn aggregate_with_query_beside_aggs_is_rejected() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .args([
            "--operation",
            "aggregate",
            "--query",
            r#"{"query": {"match_all": {}}, "aggs": {"n": {"value_count": {"field": "_id"}}}}"#,
        ])
        .assert()
        .code(1)
        .stderr(contains("Invalid aggregation body in --query"))
        .stderr(contains("Unsupported key 'query'"))
        .stderr(contains("Failed to connect").not());
}

#[test]
fn unreachable_engine_exits_with_error() {
    let dir = TempDir::new().unwrap();
    base_cmd(&dir)
        .args(["--operation", "count"])
        .assert()
        .code(1)
        .stderr(contains("Failed to connect to search engine"));
}
