//! End-to-end tests for the `grabber` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn grabber() -> Command {
    let mut cmd = Command::cargo_bin("grabber").unwrap();
    // Keep the user's config file and RUST_LOG out of the tests.
    cmd.env("XDG_CONFIG_HOME", "/nonexistent-grabber-config")
        .env("HOME", "/nonexistent-grabber-home")
        .env_remove("RUST_LOG");
    cmd
}

fn write_results(dir: &Path, name: &str, json: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_help_lists_core_flags() {
    grabber()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--label"))
        .stdout(predicate::str::contains("--concurrency"));
}

#[test]
fn test_missing_results_argument_is_usage_error() {
    grabber().assert().failure().code(2);
}

#[test]
fn test_unreadable_results_file_fails() {
    let dir = TempDir::new().unwrap();
    grabber()
        .arg(dir.path().join("missing.json"))
        .arg("-o")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read results file"));
}

#[test]
fn test_items_without_identifiers_are_logged_and_exit_zero() {
    let dir = TempDir::new().unwrap();
    let results = write_results(
        dir.path(),
        "results.json",
        r#"{
            "metadata": {"source": "scholar", "label": "vet_amr"},
            "results": [
                {"title": "No links", "url": "http://none"},
                {"title": "Also nothing", "doi": "None", "savedPdfName": "None"}
            ]
        }"#,
    );
    let out = dir.path().join("out");

    grabber()
        .arg(&results)
        .arg("-o")
        .arg(&out)
        .arg("--no-progress")
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 0 of 2 PDFs (2 DOI failures, 0 PDF failures)"));

    let log = out.join("logs").join("failed_to_resolve_doi_vet_amr.txt");
    let text = std::fs::read_to_string(log).unwrap();
    assert_eq!(text.matches(&"=".repeat(70)).count(), 2);
    assert!(text.contains("No DOI or URL was available for this item"));
    assert!(out.join("logs").join("summary_vet_amr.json").exists());
}

#[test]
fn test_label_flag_overrides_envelope_and_file_stem() {
    let dir = TempDir::new().unwrap();
    let results = write_results(dir.path(), "batch7.json", r#"[{"title": "x"}]"#);
    let out = dir.path().join("out");

    grabber()
        .arg(&results)
        .arg("-o")
        .arg(&out)
        .arg("-q")
        .assert()
        .success();
    assert!(out.join("logs").join("failed_to_resolve_doi_batch7.txt").exists());

    grabber()
        .arg(&results)
        .arg("-o")
        .arg(&out)
        .args(["-q", "--label", "custom"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(out.join("logs").join("failed_to_resolve_doi_custom.txt").exists());
}

#[test]
fn test_free_text_envelope_label_still_yields_a_log_entry() {
    let dir = TempDir::new().unwrap();
    let results = write_results(
        dir.path(),
        "results.json",
        r#"{"metadata": {"label": "sheep/goats"}, "results": [{"title": null}]}"#,
    );
    let out = dir.path().join("out");

    grabber()
        .arg(&results)
        .arg("-o")
        .arg(&out)
        .arg("-q")
        .assert()
        .success();
    let log = out.join("logs").join("failed_to_resolve_doi_sheep_goats.txt");
    assert!(std::fs::read_to_string(log).unwrap().contains("No DOI or URL"));
}

#[test]
fn test_label_flag_with_path_separator_is_rejected() {
    let dir = TempDir::new().unwrap();
    let results = write_results(dir.path(), "r.json", "[]");

    grabber()
        .arg(&results)
        .arg("-o")
        .arg(dir.path())
        .args(["--label", "sheep/goats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_invalid_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let results = write_results(dir.path(), "r.json", "[]");
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "concurrency = 99\n").unwrap();

    grabber()
        .arg(&results)
        .arg("--config")
        .arg(&config)
        .arg("-o")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_downloads_pdf_pair_through_mock_doi_proxy() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let landing = format!("{}/journals.sagepub.com/doi/10.1177/abc", mock_server.uri());
    Mock::given(method("GET"))
        .and(path("/10.1177/abc"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", landing.as_str()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/journals.sagepub.com/doi/10.1177/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html>abstract</html>", "text/html"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/journals.sagepub.com/doi/pdf/10.1177/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let results = write_results(
        dir.path(),
        "sage.json",
        r#"[{"title": "Sage paper", "doi": "10.1177/abc", "year": 2019, "authors": "A. Author"}]"#,
    );
    let out = dir.path().join("out");
    let base = mock_server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        grabber()
            .arg(&results)
            .arg("-o")
            .arg(&out)
            .args(["--doi-base-url", &base, "--no-progress"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved 1 of 1 PDFs"));
        out
    })
    .await
    .unwrap();

    let pdf = assert.join("10.1177_abc.pdf");
    assert_eq!(std::fs::read(&pdf).unwrap(), b"%PDF-1.7");
    let sidecar: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(assert.join("10.1177_abc.json")).unwrap())
            .unwrap();
    assert_eq!(sidecar["title"], "Sage paper");
    assert_eq!(sidecar["year"], "2019");
    assert!(!assert.join("logs").exists());
}
