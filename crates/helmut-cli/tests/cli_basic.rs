//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with `HELMUT_DATA_DIR` pointed at a fresh
//! temporary directory and verify outputs.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

struct Cli {
    dir: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_helmut"));
        cmd.env("HELMUT_DATA_DIR", self.dir.path())
            .env_remove("HELMUT_LOG")
            .env_remove("HELMUT_ENV");
        cmd
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("Failed to execute CLI command");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        serde_json::from_str(&self.run_ok(args)).expect("Failed to parse JSON output")
    }

    fn run_with_stdin(&self, args: &[&str], input: &str) -> (String, i32) {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn CLI");
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }
}

#[test]
fn test_task_add_and_list() {
    let cli = Cli::new();
    let first = cli.json(&["task", "add", "Write report", "--minutes", "25"]);
    assert_eq!(first["title"], "Write report");
    assert_eq!(first["estimated_minutes"], 25);
    assert_eq!(first["order"], 0);

    let second = cli.json(&["task", "add", "Inbox"]);
    assert_eq!(second["estimated_minutes"], 15);
    assert_eq!(second["order"], 1);

    let list = cli.json(&["task", "list"]);
    let titles: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Write report", "Inbox"]);
}

#[test]
fn test_task_add_rejects_zero_minutes() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["task", "add", "Nothing", "--minutes", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_task_complete_moves_to_history() {
    let cli = Cli::new();
    let task = cli.json(&["task", "add", "Run", "--minutes", "30"]);
    let id = task["id"].to_string();

    let done = cli.json(&["task", "complete", &id]);
    assert_eq!(done["is_completed"], true);
    assert!(done["completed_at"].is_string());

    assert!(cli.json(&["task", "list"]).as_array().unwrap().is_empty());
    assert_eq!(
        cli.json(&["task", "list", "--completed"]).as_array().unwrap().len(),
        1
    );

    let history = cli.json(&["history"]);
    assert_eq!(history["total_count"], 1);
    assert_eq!(history["total_minutes"], 30);
    assert_eq!(history["streak"], 1);
    assert_eq!(history["days"][0]["label"], "Today");

    let out = cli.run_ok(&["task", "clear-completed"]);
    assert!(out.contains("Removed 1"));
}

#[test]
fn test_task_get_and_delete_missing() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["task", "get", "42"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("not found"));

    let task = cli.json(&["task", "add", "Temp", "--minutes", "5"]);
    let id = task["id"].to_string();
    assert!(cli.run_ok(&["task", "delete", &id]).contains("Task deleted"));
    assert_ne!(cli.run(&["task", "delete", &id]).2, 0);
}

#[test]
fn test_default_templates_and_apply() {
    let cli = Cli::new();
    let templates = cli.json(&["template", "list"]);
    assert_eq!(templates.as_array().unwrap().len(), 3);

    cli.json(&["task", "add", "Existing", "--minutes", "10"]);
    let morning = templates
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["template"]["name"] == "Morning Routine")
        .unwrap();
    let id = morning["template"]["id"].to_string();

    let added = cli.json(&["template", "apply", &id]);
    let orders: Vec<_> = added
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["order"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(added[0]["title"], "Meditation");

    assert!(cli.run_ok(&["template", "seed"]).contains("Seeded 0"));
}

#[test]
fn test_template_create_update_delete() {
    let cli = Cli::new();
    let created = cli.json(&[
        "template", "create", "--name", "Gym", "--icon", "💪", "--task", "Warm up:10", "--task",
        "Lift:40",
    ]);
    assert_eq!(created["template"]["name"], "Gym");
    assert_eq!(created["tasks"].as_array().unwrap().len(), 2);
    let id = created["template"]["id"].to_string();

    let updated = cli.json(&["template", "update", &id, "--name", "Gym Day"]);
    assert_eq!(updated["template"]["name"], "Gym Day");
    assert_eq!(updated["template"]["icon"], "💪");
    assert_eq!(updated["tasks"][1]["title"], "Lift");

    let replaced = cli.json(&["template", "update", &id, "--task", "Run:20"]);
    assert_eq!(replaced["tasks"].as_array().unwrap().len(), 1);

    assert!(cli.run_ok(&["template", "delete", &id]).contains("Template deleted"));
    assert_ne!(cli.run(&["template", "apply", &id]).2, 0);
}

#[test]
fn test_config_get_set_reset() {
    let cli = Cli::new();
    assert_eq!(cli.run_ok(&["config", "get", "notifications.sound"]).trim(), "default");

    cli.run_ok(&["config", "set", "notifications.vibration", "false"]);
    assert_eq!(
        cli.run_ok(&["config", "get", "notifications.vibration"]).trim(),
        "false"
    );
    assert!(cli.run_ok(&["config", "list"]).contains("notifications.vibration = false"));

    assert_ne!(cli.run(&["config", "set", "notifications.vibration", "maybe"]).2, 0);
    assert_ne!(cli.run(&["config", "get", "no.such.key"]).2, 0);
    assert_ne!(
        cli.run(&["config", "set", "tasks.default_estimate_minutes", "0"]).2,
        0
    );
    assert_eq!(cli.json(&["task", "add", "Default"])["estimated_minutes"], 15);

    cli.run_ok(&["config", "reset"]);
    assert_eq!(
        cli.run_ok(&["config", "get", "notifications.vibration"]).trim(),
        "true"
    );
}

#[test]
fn test_session_without_tasks() {
    let cli = Cli::new();
    let (stdout, code) = cli.run_with_stdin(&["session"], "q\n");
    assert_eq!(code, 0);
    assert!(stdout.contains("no active tasks"));
}

#[test]
fn test_session_commands() {
    let cli = Cli::new();
    cli.json(&["task", "add", "Focus", "--minutes", "25"]);
    cli.json(&["task", "add", "Break", "--minutes", "5"]);

    let (stdout, code) = cli.run_with_stdin(&["session"], "p\nr\ns\nc\nq\n");
    assert_eq!(code, 0);
    assert!(stdout.contains("started: Focus (25:00)"));
    assert!(stdout.contains("current: Break"));
    assert!(stdout.contains("completed: Break"));

    let active = cli.json(&["task", "list"]);
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["title"], "Focus");
}

#[test]
fn test_completions() {
    let cli = Cli::new();
    let script = cli.run_ok(&["completions", "bash"]);
    assert!(script.contains("helmut"));
}
