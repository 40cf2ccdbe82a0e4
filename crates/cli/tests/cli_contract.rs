use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn marginalia() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("marginalia-cli");
    cmd.arg("--config")
        .arg(fixture("config.json"))
        .env_remove("RUST_LOG")
        .env_remove("MARGINALIA_LOG")
        .env_remove("MARGINALIA_API_URL")
        .env_remove("MARGINALIA_MOTION_DEBOUNCE_MS")
        .env_remove("MARGINALIA_EXIT_GRACE_MS")
        .env_remove("MARGINALIA_MAX_THREAD_DEPTH");
    cmd
}

fn stdout_json(cmd: &mut assert_cmd::Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

#[test]
fn layout_emits_rects_per_annotation() {
    let value = stdout_json(marginalia().arg("layout").arg("--input").arg(fixture("paragraph.json")));

    assert_eq!(value["a1"][0]["left"], 80.0);
    assert_eq!(value["a1"][0]["width"], 80.0);
    assert_eq!(value["a2"][0]["left"], 120.0);
    assert_eq!(value["a2"][0]["height"], 20.0);
    assert!(value.get("a3").is_none(), "out-of-range comment must be skipped");
    assert!(value.get("r1").is_none(), "replies have no geometry");
}

#[test]
fn layout_logs_skipped_ranges() {
    marginalia()
        .arg("layout")
        .arg("--input")
        .arg(fixture("paragraph.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("skipping highlight range"));
}

#[test]
fn layout_wraps_at_narrow_width() {
    let value = stdout_json(
        marginalia()
            .arg("layout")
            .arg("--input")
            .arg(fixture("paragraph.json"))
            .arg("--width")
            .arg("80"),
    );

    let a2 = value["a2"].as_array().expect("a2 should have rects");
    assert_eq!(a2.len(), 2);
    assert_eq!(a2[1]["top"], 20.0);
}

#[test]
fn hover_reports_every_overlapping_annotation() {
    let value = stdout_json(
        marginalia()
            .arg("hover")
            .arg("--input")
            .arg(fixture("paragraph.json"))
            .args(["--x", "140", "--y", "10"]),
    );

    assert_eq!(value, serde_json::json!(["a1", "a2"]));
}

#[test]
fn hover_outside_container_is_empty() {
    marginalia()
        .arg("hover")
        .arg("--input")
        .arg(fixture("paragraph.json"))
        .args(["--x", "700", "--y", "10"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn layout_fails_for_missing_file() {
    marginalia()
        .arg("layout")
        .arg("--input")
        .arg(fixture("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn fetch_reports_unreachable_api() {
    marginalia()
        .args(["fetch", "--element", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "failed to fetch commenting annotations for DocumentElements/5",
        ));
}

#[test]
fn fetch_rejects_unknown_motivation() {
    marginalia()
        .args(["fetch", "--element", "5", "--motivation", "commentary"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown motivation"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("marginalia-cli")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn layout_fails_for_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.json");
    std::fs::write(&input, "{ \"element_id\": \"5\" ").unwrap();

    marginalia()
        .arg("layout")
        .arg("--input")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid paragraph input"));
}

#[test]
fn config_file_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, "{ \"motion_debounce_ms\": \"soon\" }").unwrap();

    cargo_bin_cmd!("marginalia-cli")
        .arg("--config")
        .arg(&config)
        .arg("layout")
        .arg("--input")
        .arg(fixture("paragraph.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn thread_stops_at_reply_cycle() {
    let value = stdout_json(
        marginalia()
            .arg("thread")
            .arg("--input")
            .arg(fixture("thread.json"))
            .args(["--root", "a1"]),
    );

    assert_eq!(value["annotation"]["id"], "a1");
    let r1 = &value["replies"][0];
    assert_eq!(r1["annotation"]["id"], "r1");
    let r2 = &r1["replies"][0];
    assert_eq!(r2["annotation"]["id"], "r2");
    assert_eq!(r2["replies"], serde_json::json!([]));
}

#[test]
fn thread_honours_configured_depth() {
    let value = stdout_json(
        marginalia()
            .env("MARGINALIA_MAX_THREAD_DEPTH", "1")
            .arg("thread")
            .arg("--input")
            .arg(fixture("thread.json"))
            .args(["--root", "a1"]),
    );

    assert_eq!(value["replies"][0]["annotation"]["id"], "r1");
    assert_eq!(value["replies"][0]["replies"], serde_json::json!([]));
}

#[test]
fn thread_fails_for_unknown_root() {
    marginalia()
        .arg("thread")
        .arg("--input")
        .arg(fixture("thread.json"))
        .args(["--root", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("annotation not found: ghost"));
}
