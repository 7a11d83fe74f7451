//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run over a generated log fixture.

use std::process::Command;

fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-p", "studyhall-cli", "--quiet", "--"])
        .args(args)
        .output()
        .expect("failed to execute CLI command");

    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// A small log stamped at "now" so the replay window always contains it.
fn fixture() -> (tempfile::TempDir, String) {
    let now = chrono::Utc::now().with_timezone(&chrono::FixedOffset::east_opt(9 * 3600).unwrap());
    let ts = now.to_rfc3339();
    let lines = [
        format!("[STUDYLOG] action=checkin; uid=1; name=mira; ts={ts}"),
        "just some chatter in the channel".to_string(),
        format!(
            "[STUDYLOG] action=checkout; uid=1; name=mira; ts={ts}; studied_sec=3000; \
             weekly_total_sec=3000; streak=1; tier=🥉 Bronze"
        ),
    ];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.log");
    std::fs::write(&path, lines.join("\n")).unwrap();
    let path = path.to_string_lossy().to_string();
    (dir, path)
}

#[test]
fn log_check_counts_events() {
    let (_dir, path) = fixture();
    let (code, stdout, stderr) = run_cli(&["log", "check", &path]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("2 event(s), 1 ignored line(s)"), "{stdout}");
}

#[test]
fn replay_credits_the_logged_total() {
    let (_dir, path) = fixture();
    let (code, stdout, stderr) = run_cli(&["replay", &path]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("mira"), "{stdout}");
    assert!(stdout.contains("0h 50m"), "{stdout}");
}

#[test]
fn ranking_lists_the_member() {
    let (_dir, path) = fixture();
    let (code, stdout, stderr) = run_cli(&["ranking", &path]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("1. mira"), "{stdout}");
}

#[test]
fn panel_shows_the_empty_room() {
    let (_dir, path) = fixture();
    let (code, stdout, stderr) = run_cli(&["panel", &path]);
    assert_eq!(code, 0, "stderr: {stderr}");
    // The only member checked out, so the room is empty.
    assert!(stdout.contains("Nobody is studying right now."), "{stdout}");
    assert!(stdout.contains("fingerprint: "), "{stdout}");
}
