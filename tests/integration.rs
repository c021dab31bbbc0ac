use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn orbit_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_orbit"))
}

/// Config with every source pointed at a closed local port, so nothing
/// leaves the machine.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/orbit.sqlite"

[sources]
timeout_ms = 3000

[sources.openalex]
base_url = "http://127.0.0.1:9"
per_request_timeout_secs = 2

[sources.arxiv]
base_url = "http://127.0.0.1:9/api/query"
per_request_timeout_secs = 2

[sources.crossref]
base_url = "http://127.0.0.1:9"
per_request_timeout_secs = 2

[retrieval]
default_limit = 10
"#,
        root.display(),
    );

    let config_path = config_dir.join("orbit.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_orbit(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = orbit_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run orbit binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_orbit(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/orbit.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_orbit(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_orbit(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_empty_library_listings() {
    let (_tmp, config_path) = setup_test_env();
    run_orbit(&config_path, &["init"]);

    let (stdout, stderr, success) = run_orbit(&config_path, &["papers", "list"]);
    assert!(success, "papers list failed: {}", stderr);
    assert!(stdout.contains("No papers."));

    let (stdout, stderr, success) = run_orbit(&config_path, &["snapshots", "list"]);
    assert!(success, "snapshots list failed: {}", stderr);
    assert!(stdout.contains("No snapshots."));
}

#[test]
fn test_get_missing_paper_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_orbit(&config_path, &["init"]);

    let (_, stderr, success) = run_orbit(&config_path, &["papers", "get", "nope"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_search_survives_unreachable_sources() {
    let (_tmp, config_path) = setup_test_env();
    run_orbit(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_orbit(&config_path, &["search", "graph neural networks", "--json"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);

    let bundle: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(bundle["openalex"]["status"], "failed");
    assert_eq!(bundle["arxiv"]["status"], "failed");

    let (stdout, _, success) = run_orbit(&config_path, &["snapshots", "list"]);
    assert!(success);
    assert!(stdout.contains("graph neural networks"));
}

#[test]
fn test_search_rejects_inverted_year_range() {
    let (_tmp, config_path) = setup_test_env();
    run_orbit(&config_path, &["init"]);

    let (_, _, success) = run_orbit(
        &config_path,
        &["search", "q", "--year-min", "2024", "--year-max", "2000"],
    );
    assert!(!success);
}

#[test]
fn test_local_search_requires_embeddings() {
    let (_tmp, config_path) = setup_test_env();
    run_orbit(&config_path, &["init"]);

    let (_, stderr, success) = run_orbit(&config_path, &["local-search", "anything"]);
    assert!(!success);
    assert!(stderr.contains("embeddings"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_orbit(&tmp.path().join("absent.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("config"), "stderr: {}", stderr);
}
