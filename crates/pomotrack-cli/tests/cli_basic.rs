//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

struct Cli {
    home: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            home: TempDir::new().expect("temp dir"),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pomotrack"));
        cmd.args(args)
            .env("POMOTRACK_HOME", self.home.path())
            .env_remove("POMOTRACK_LOG");
        cmd
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self.command(args).output().expect("Failed to execute CLI command");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn json(&self, args: &[&str]) -> Value {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        serde_json::from_str(&stdout).expect("Failed to parse JSON output")
    }
}

#[test]
fn test_settings_defaults_and_update() {
    let cli = Cli::new();
    let shown = cli.json(&["settings", "show"]);
    assert_eq!(shown["work_duration"], 25);
    assert_eq!(shown["cycles_until_long_break"], 4);

    let updated = cli.json(&["settings", "set", "--work", "50", "--sound", "false"]);
    assert_eq!(updated["work_duration"], 50);
    assert_eq!(updated["sound"], false);
    assert_eq!(updated["break_duration"], 5);

    let other = cli.json(&["--user", "bob", "settings", "show"]);
    assert_eq!(other["work_duration"], 25);
}

#[test]
fn test_settings_out_of_range_lists_fields() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["settings", "set", "--work", "0", "--cycles", "11"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("work_duration"), "{stderr}");
    assert!(stderr.contains("cycles_until_long_break"), "{stderr}");

    let shown = cli.json(&["settings", "show"]);
    assert_eq!(shown["work_duration"], 25);
}

#[test]
fn test_session_lifecycle() {
    let cli = Cli::new();
    let created = cli.json(&["session", "create", "--type", "work", "--duration", "25"]);
    let id = created["id"].as_i64().unwrap();
    assert!(created["status"].is_null());

    let ended = cli.json(&["session", "end", &id.to_string(), "--status", "interrupted", "--reason", "call"]);
    assert_eq!(ended["status"], "interrupted");
    assert_eq!(ended["interruption_reason"], "call");

    let (_, stderr, code) = cli.run(&["session", "end", &id.to_string()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already finalized"), "{stderr}");

    let (_, _, code) = cli.run(&["--user", "bob", "session", "end", &id.to_string()]);
    assert_eq!(code, 1);

    let listed = cli.json(&["session", "list"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn test_create_rejects_bad_duration() {
    let cli = Cli::new();
    let (_, _, code) = cli.run(&["session", "create", "--duration", "0"]);
    assert_eq!(code, 1);
    let (_, _, code) = cli.run(&["session", "create", "--duration", "-3"]);
    assert_eq!(code, 1);
}

#[test]
fn test_stats_summary() {
    let cli = Cli::new();
    for (kind, minutes) in [("work", "25"), ("work", "25"), ("break", "5")] {
        let rec = cli.json(&["session", "create", "--type", kind, "--duration", minutes]);
        let id = rec["id"].as_i64().unwrap().to_string();
        cli.json(&["session", "end", &id]);
    }

    let all = cli.json(&["stats", "summary"]);
    assert_eq!(all["total_sessions"], 3);
    assert_eq!(all["completed_sessions"], 3);
    assert_eq!(all["total_focus_time"], 55);
    assert_eq!(all["longest_streak"], 3);

    let work = cli.json(&["stats", "summary", "--focus-time", "work-only"]);
    assert_eq!(work["total_focus_time"], 50);

    let (_, stderr, code) = cli.run(&["stats", "summary", "--start", "2024-05-02", "--end", "2024-05-01"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "{stderr}");

    let week = cli.json(&["stats", "week"]);
    let days = week.as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[6]["minutes"], 55);
}

#[test]
fn test_config_get_set() {
    let cli = Cli::new();
    let (stdout, _, code) = cli.run(&["config", "get", "default_user"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "local");

    let (_, _, code) = cli.run(&["config", "set", "timer.tick_ms", "250"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = cli.run(&["config", "get", "timer.tick_ms"]);
    assert_eq!(stdout.trim(), "250");

    let (_, _, code) = cli.run(&["config", "set", "timer.tick_ms", "0"]);
    assert_eq!(code, 1);
    let (_, _, code) = cli.run(&["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_invalid_config_is_fatal() {
    let cli = Cli::new();
    std::fs::write(
        cli.home.path().join("config.toml"),
        "default_user = \"ada\"\n\n[timer]\ntick_ms = 0\n",
    )
    .unwrap();

    let (stdout, stderr, code) = cli.run(&["session", "create", "--duration", "25"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty(), "{stdout}");
    assert!(stderr.contains("timer.tick_ms"), "{stderr}");

    // The config commands still work, so the file can be repaired.
    let (_, _, code) = cli.run(&["config", "reset"]);
    assert_eq!(code, 0);
    let created = cli.json(&["session", "create", "--duration", "25"]);
    assert_eq!(created["user"], "local");
    assert!(cli.json(&["--user", "ada", "session", "list"]).as_array().unwrap().is_empty());
}

#[test]
fn test_timer_run_records_completed_work() {
    let cli = Cli::new();
    cli.json(&["settings", "set", "--work", "1"]);

    let mut child = cli
        .command(&["timer", "run", "--tick-ms", "1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn timer");
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "start").unwrap();
    thread::sleep(Duration::from_secs(2));
    writeln!(stdin, "quit").unwrap();
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<Value> = stdout
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect();
    assert!(events.iter().any(|e| e["type"] == "phase_completed"));
    assert!(events.iter().any(|e| e["type"] == "session_recorded"));

    let listed = cli.json(&["session", "list"]);
    let records = listed.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "completed");
    assert_eq!(records[0]["duration_min"], 1);
}

#[test]
fn test_timer_reload_picks_up_new_settings() {
    let cli = Cli::new();
    let mut child = cli
        .command(&["timer", "run"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn timer");
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    // Wait until the timer has loaded its settings.
    let mut first = String::new();
    stdout.read_line(&mut first).unwrap();
    let initial: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(initial["total_secs"], 25 * 60);

    cli.json(&["settings", "set", "--work", "2"]);
    writeln!(stdin, "reload").unwrap();
    writeln!(stdin, "status").unwrap();
    writeln!(stdin, "quit").unwrap();
    drop(stdin);

    let snapshots: Vec<Value> = stdout
        .lines()
        .map_while(Result::ok)
        .filter_map(|l| serde_json::from_str::<Value>(&l).ok())
        .filter(|v| v.get("total_secs").is_some())
        .collect();
    assert!(child.wait().unwrap().success());
    let last = snapshots.last().expect("status output");
    assert_eq!(last["total_secs"], 120);
    assert_eq!(last["remaining_secs"], 120);
}

#[test]
fn test_timer_abort_before_start_is_reported() {
    let cli = Cli::new();
    let mut child = cli
        .command(&["timer", "run"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn timer");
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "abort").unwrap();
    writeln!(stdin, "quit").unwrap();
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "{stderr}");
}
