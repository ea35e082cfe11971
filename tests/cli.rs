use assert_cmd::Command;
use predicates::prelude::*;

fn apod_tui() -> Command {
    let mut cmd = Command::cargo_bin("apod-tui").expect("binary built");
    // Keep runs away from the user's config and logs.
    let home = std::env::temp_dir().join("apod-tui-cli-tests");
    cmd.env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_CACHE_HOME", home.join("cache"))
        .env_remove("APOD_TUI_LOG");
    cmd
}

#[test]
fn prints_version() {
    apod_tui()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    apod_tui()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("APOD-TUI"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--dump"));
}

#[test]
fn offline_dump_prints_sample_gallery() {
    apod_tui()
        .args(["--offline", "--dump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Oct 01, 2025"))
        .stdout(predicate::str::contains("Sample: A Solar Eclipse Timelapse [Video]"))
        .stdout(predicate::str::contains(
            "https://img.youtube.com/vi/abc123/hqdefault.jpg",
        ));
}

#[test]
fn unreachable_feed_fails_dump() {
    apod_tui()
        .args(["--dump", "--feed-url", "http://127.0.0.1:9/data.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not load NASA images."));
}

#[test]
fn unknown_flag_is_rejected() {
    apod_tui()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown argument"));
}
