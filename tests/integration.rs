use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cidx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cidx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let content = root.join("site").join("content");
    fs::create_dir_all(content.join("2021")).unwrap();
    fs::write(
        content.join("2021").join("Rust-Ownership.md"),
        "title=Rust Ownership\ndate=2021-04-01\nstatus=published\n~~~~~~\nBorrowing and moves in Rust programs.\n",
    )
    .unwrap();
    fs::write(
        content.join("async-rust.html"),
        "title=Async Rust!\ndate=2022-09-10\n~~~~~~\n<p>Futures and executors in <b>Rust</b>.</p>\n",
    )
    .unwrap();
    fs::write(
        content.join("secret.md"),
        "title=Secret Rust Plans\ndate=2023-01-01\nlisted=false\n~~~~~~\nUnlisted rust roadmap.\n",
    )
    .unwrap();
    fs::write(content.join("logo.png"), "not content").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/index.sqlite"

[content]
root = "{root}/site"
subdirectory = "content"
extensions = ["md", "html"]

[index]
key_date_format = "%Y-%m-%d"

[search]
default_page_size = 10
"#,
        root = root.display()
    );

    let config_path = config_dir.join("cidx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cidx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cidx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cidx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cidx(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("index.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_cidx(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_cidx(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_rebuild_counts_eligible_files() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cidx(&config_path, &["rebuild"]);
    assert!(success, "rebuild failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rebuilt 3 items"), "got: {}", stdout);
}

#[test]
fn test_rebuild_twice_no_duplicates() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout1, _, _) = run_cidx(&config_path, &["rebuild"]);
    assert!(stdout1.contains("rebuilt 3 items"));

    let (stdout2, _, _) = run_cidx(&config_path, &["rebuild"]);
    assert!(stdout2.contains("rebuilt 3 items"));

    let (stdout, _, success) = run_cidx(&config_path, &["search", "rust", "--all", "--json"]);
    assert!(success);
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["total"], 3);
}

#[test]
fn test_search_hides_unlisted_by_default() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cidx(&config_path, &["search", "rust"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("2 results"), "got: {}", stdout);
    assert!(stdout.contains("/async-rust.html"));
    assert!(stdout.contains("/2021/rust-ownership.html"));
    assert!(!stdout.contains("/secret.html"));

    let (stdout, _, _) = run_cidx(&config_path, &["search", "rust", "--all"]);
    assert!(stdout.contains("3 results"), "got: {}", stdout);
    assert!(stdout.contains("/secret.html"));
}

#[test]
fn test_search_orders_newest_first() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cidx(&config_path, &["search", "rust", "--all", "--json"]);
    assert!(success);
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let paths: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["path"].as_str().unwrap())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/secret.html",
            "/async-rust.html",
            "/2021/rust-ownership.html"
        ]
    );
}

#[test]
fn test_search_pagination_past_end() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cidx(
        &config_path,
        &["search", "rust", "--offset", "5", "--page-size", "2", "--json"],
    );
    assert!(success);
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(page["offset"], 5);
    assert!(page["items"].as_array().unwrap().is_empty());
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cidx(&config_path, &["search", "xyznonexistent"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_broken_content_fails_rebuild() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("site").join("content").join("broken.md"),
        "title=Broken\n~~~~~~\nmissing its date",
    )
    .unwrap();

    let (_, stderr, success) = run_cidx(&config_path, &["rebuild"]);
    assert!(!success, "rebuild should fail on malformed content");
    assert!(stderr.contains("/broken.html"), "got: {}", stderr);
}

#[test]
fn test_missing_content_fails_rebuild() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_dir_all(tmp.path().join("site")).unwrap();

    let (_, stderr, success) = run_cidx(&config_path, &["rebuild"]);
    assert!(!success);
    assert!(stderr.contains("no content"), "got: {}", stderr);
}

#[test]
fn test_json_events_on_stderr() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cidx(&config_path, &["--json-events", "rebuild"]);
    assert!(success);
    assert!(stderr.contains("\"event\":\"rebuild_started\""));
    assert!(stderr.contains("\"event\":\"rebuild_finished\""));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config").join("bad.toml");
    fs::write(
        &bad,
        format!(
            "[db]\npath = \"{}/data/x.sqlite\"\n\n[content]\nextensions = []\nroot = \"/tmp\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_cidx(&bad, &["rebuild"]);
    assert!(!success);
    assert!(stderr.contains("extensions"), "got: {}", stderr);
}
