//! CLI integration tests for Compass
//!
//! These tests drive the binary end to end: project setup, task writes
//! through the dependency checks, and the ready/graph queries.

use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the compass binary, run inside `dir`
///
/// The global config is pointed into the temp dir so a user's own
/// `default_format` cannot leak into assertions.
fn compass_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("compass"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env("COMPASS_USER", "tester");
    cmd
}

/// Create a temporary directory and initialize a compass project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    compass_cmd(dir.path())
        .args(["init", "Test Project"])
        .assert()
        .success();
    dir
}

/// Create a task and return its ID
fn create_task(dir: &TempDir, title: &str, depends_on: &[&str]) -> String {
    let mut cmd = compass_cmd(dir.path());
    cmd.args(["task", "create", title, "--format", "json"]);
    if !depends_on.is_empty() {
        cmd.args(["--depends-on", &depends_on.join(",")]);
    }

    let out = cmd.output().unwrap();
    assert!(
        out.status.success(),
        "create failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    json["id"].as_str().unwrap().to_string()
}

/// Run a command with `--format json` and parse its stdout
fn json_output(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let out = compass_cmd(dir.path())
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

fn ids(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other["id"].as_str().unwrap().to_string(),
        })
        .collect()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    compass_cmd(dir.path())
        .args(["init", "Test Project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized compass project"))
        .stdout(predicate::str::contains("(TEST)"));

    assert!(dir.path().join(".compass").is_dir());
    assert!(dir.path().join(".compass/config.toml").is_file());
    assert!(dir.path().join(".compass/.gitignore").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = setup_project();

    compass_cmd(dir.path())
        .args(["init", "Test Project"])
        .assert()
        .success();
}

#[test]
fn test_init_with_key() {
    let dir = TempDir::new().unwrap();

    compass_cmd(dir.path())
        .args(["init", "x", "--key", "WEB"])
        .assert()
        .success();

    let id = create_task(&dir, "Homepage", &[]);
    assert!(id.starts_with("WEB-T"));
}

#[test]
fn test_command_outside_project_fails() {
    let dir = TempDir::new().unwrap();

    compass_cmd(dir.path())
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a compass project"));
}

// =============================================================================
// Task Tests
// =============================================================================

#[test]
fn test_task_create_and_list() {
    let dir = setup_project();
    let id = create_task(&dir, "Write docs", &[]);
    assert!(id.starts_with("TEST-T"));

    compass_cmd(dir.path())
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("Write docs"));
}

#[test]
fn test_task_show_lists_dependents() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    let b = create_task(&dir, "B", &[&a]);

    let shown = json_output(&dir, &["task", "show", &a]);
    assert_eq!(ids(&shown["dependents"]), vec![b.clone()]);
    assert_eq!(shown["is_blocked"], false);

    let shown = json_output(&dir, &["task", "show", &b]);
    assert_eq!(shown["is_blocked"], true);
    assert_eq!(shown["created_by"], "tester");
}

#[test]
fn test_task_status_transitions() {
    let dir = setup_project();
    let id = create_task(&dir, "Status task", &[]);

    compass_cmd(dir.path())
        .args(["task", "start", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started task"));

    let shown = json_output(&dir, &["task", "show", &id]);
    assert_eq!(shown["status"], "in_progress");

    compass_cmd(dir.path())
        .args(["task", "close", &id])
        .assert()
        .success();

    let closed = json_output(&dir, &["task", "list", "--status", "closed"]);
    assert_eq!(ids(&closed), vec![id.clone()]);

    compass_cmd(dir.path())
        .args(["task", "reopen", &id])
        .assert()
        .success();

    let open = json_output(&dir, &["task", "list", "--status", "open"]);
    assert_eq!(ids(&open), vec![id]);
}

#[test]
fn test_task_delete() {
    let dir = setup_project();
    let id = create_task(&dir, "Doomed", &[]);

    compass_cmd(dir.path())
        .args(["task", "delete", &id])
        .assert()
        .success();

    compass_cmd(dir.path())
        .args(["task", "show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found"));
}

// =============================================================================
// Dependency Check Tests
// =============================================================================

#[test]
fn test_missing_dependency_rejected() {
    let dir = setup_project();

    compass_cmd(dir.path())
        .args(["task", "create", "Orphan", "--depends-on", "TEST-T22222"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency not found"));

    let listed = json_output(&dir, &["task", "list"]);
    assert!(ids(&listed).is_empty());
}

#[test]
fn test_update_creating_cycle_rejected() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    let b = create_task(&dir, "B", &[&a]);

    compass_cmd(dir.path())
        .args(["task", "update", &a, "--depends-on", &b])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle detected"));

    // The rejected write left A untouched
    let shown = json_output(&dir, &["task", "show", &a]);
    assert_eq!(shown["depends_on"], serde_json::json!([]));
}

#[test]
fn test_dep_creating_cycle_rejected() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    let b = create_task(&dir, "B", &[&a]);
    let c = create_task(&dir, "C", &[&b]);

    compass_cmd(dir.path())
        .args(["task", "dep", &a, &c])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle detected"));

    compass_cmd(dir.path())
        .args(["graph", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cycles"));
}

#[test]
fn test_dep_and_undep() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    let b = create_task(&dir, "B", &[]);

    compass_cmd(dir.path())
        .args(["task", "dep", &b, &a])
        .assert()
        .success()
        .stdout(predicate::str::contains("now depends on"));

    let blocked = json_output(&dir, &["blocked"]);
    assert_eq!(ids(&blocked), vec![b.clone()]);

    compass_cmd(dir.path())
        .args(["task", "undep", &b, &a])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed dependency"));

    let blocked = json_output(&dir, &["blocked"]);
    assert!(ids(&blocked).is_empty());
}

#[test]
fn test_epic_cannot_be_dependency() {
    let dir = setup_project();

    let out = compass_cmd(dir.path())
        .args(["task", "create", "Epic", "--type", "epic", "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let epic: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let epic_id = epic["id"].as_str().unwrap();

    compass_cmd(dir.path())
        .args(["task", "create", "Child", "--depends-on", epic_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("epic"));

    compass_cmd(dir.path())
        .args(["task", "create", "Member", "--epic", epic_id])
        .assert()
        .success();
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_ready_follows_dependencies() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    let b = create_task(&dir, "B", &[&a]);
    let c = create_task(&dir, "C", &[&a]);

    let ready = json_output(&dir, &["ready", "--all"]);
    assert_eq!(ids(&ready), vec![a.clone()]);

    compass_cmd(dir.path())
        .args(["task", "close", &a])
        .assert()
        .success();

    let mut expected = vec![b, c];
    expected.sort();
    let ready = json_output(&dir, &["ready", "--all"]);
    assert_eq!(ids(&ready), expected);

    // Without --all only the first is shown
    let next = json_output(&dir, &["ready"]);
    assert_eq!(ids(&next), vec![expected[0].clone()]);
}

#[test]
fn test_ready_text_output() {
    let dir = setup_project();
    create_task(&dir, "Only task", &[]);

    compass_cmd(dir.path())
        .args(["ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next:"))
        .stdout(predicate::str::contains("Only task"));
}

#[test]
fn test_epics_never_ready() {
    let dir = setup_project();

    compass_cmd(dir.path())
        .args(["task", "create", "Big epic", "--type", "epic"])
        .assert()
        .success();

    compass_cmd(dir.path())
        .args(["ready", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks ready"));
}

#[test]
fn test_blocked_text_output() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    create_task(&dir, "Waiting", &[&a]);

    compass_cmd(dir.path())
        .args(["blocked"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocked tasks (1)"))
        .stdout(predicate::str::contains(a.as_str()));
}

// =============================================================================
// Graph Tests
// =============================================================================

#[test]
fn test_graph_queries_on_chain() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    let b = create_task(&dir, "B", &[&a]);
    let c = create_task(&dir, "C", &[&b]);

    let order = json_output(&dir, &["graph", "order"]);
    assert_eq!(ids(&order), vec![a.clone(), b.clone(), c.clone()]);

    let roots = json_output(&dir, &["graph", "roots"]);
    assert_eq!(ids(&roots), vec![a.clone()]);

    let leaves = json_output(&dir, &["graph", "leaves"]);
    assert_eq!(ids(&leaves), vec![c.clone()]);

    let mut expected = vec![a.clone(), b.clone()];
    expected.sort();
    let deps = json_output(&dir, &["graph", "deps", &c]);
    assert_eq!(ids(&deps), expected);

    let dependents = json_output(&dir, &["graph", "dependents", &a]);
    assert_eq!(ids(&dependents), vec![b]);
}

#[test]
fn test_graph_deps_unknown_task() {
    let dir = setup_project();

    compass_cmd(dir.path())
        .args(["graph", "deps", "TEST-T22222"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found"));
}

#[test]
fn test_verbose_goes_to_stderr() {
    let dir = setup_project();

    compass_cmd(dir.path())
        .args(["--verbose", "graph", "validate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("[verbose:graph]"));
}

#[test]
fn test_graph_tree() {
    let dir = setup_project();
    let a = create_task(&dir, "A", &[]);
    let b = create_task(&dir, "B", &[&a]);

    let expected = format!("{} A [open]\n└── {} B [open (blocked)]\n", a, b);

    compass_cmd(dir.path())
        .args(["graph", "tree"])
        .assert()
        .success()
        .stdout(expected.clone());

    let tree = json_output(&dir, &["graph", "tree"]);
    assert_eq!(tree["tree"], expected);
}

#[test]
fn test_graph_tree_empty() {
    let dir = setup_project();

    compass_cmd(dir.path())
        .args(["graph", "tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."));
}

// =============================================================================
// Priority Tests
// =============================================================================

#[test]
fn test_update_clears_priority() {
    let dir = setup_project();
    let id = create_task(&dir, "Prioritised", &[]);

    compass_cmd(dir.path())
        .args(["task", "update", &id, "--priority", "1"])
        .assert()
        .success();
    assert_eq!(json_output(&dir, &["task", "show", &id])["priority"], 1);

    compass_cmd(dir.path())
        .args(["task", "update", &id, "--clear-priority"])
        .assert()
        .success();
    assert!(json_output(&dir, &["task", "show", &id])["priority"].is_null());

    compass_cmd(dir.path())
        .args(["task", "update", &id, "--priority", "2", "--clear-priority"])
        .assert()
        .failure();
}

// =============================================================================
// Document and Search Tests
// =============================================================================

#[test]
fn test_doc_create_list_show() {
    let dir = setup_project();

    let created = json_output(
        &dir,
        &["doc", "create", "Auth design", "--body", "Sessions live in Redis."],
    );
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("TEST-D"));
    assert_eq!(created["created_by"], "tester");
    assert!(dir
        .path()
        .join(".compass/documents")
        .join(format!("{}.md", id))
        .is_file());

    let listed = json_output(&dir, &["doc", "list"]);
    assert_eq!(ids(&listed), vec![id.clone()]);

    let shown = json_output(&dir, &["doc", "show", &id]);
    assert_eq!(shown["title"], "Auth design");
    assert_eq!(shown["body"], "Sessions live in Redis.");

    compass_cmd(dir.path())
        .args(["doc", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Title: Auth design"))
        .stdout(predicate::str::contains("Sessions live in Redis."));
}

#[test]
fn test_doc_errors() {
    let dir = setup_project();

    compass_cmd(dir.path())
        .args(["doc", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No documents"));

    compass_cmd(dir.path())
        .args(["doc", "show", "TEST-D22222"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Document not found"));

    compass_cmd(dir.path())
        .args(["doc", "show", "not-an-id"])
        .assert()
        .failure();
}

#[test]
fn test_search_tasks_and_documents() {
    let dir = setup_project();
    let task = create_task(&dir, "Build LOGIN page", &[]);
    create_task(&dir, "Unrelated", &[]);
    let doc = json_output(
        &dir,
        &["doc", "create", "Auth notes", "--body", "The login form posts to /session."],
    );
    let doc_id = doc["id"].as_str().unwrap().to_string();

    let hits = json_output(&dir, &["search", "Login"]);
    assert_eq!(ids(&hits), vec![doc_id, task]);
    assert_eq!(hits[0]["type"], "document");
    assert_eq!(hits[0]["snippet"], "The login form posts to /session.");
    assert_eq!(hits[1]["type"], "task");
    assert!(hits[1].get("snippet").is_none());

    compass_cmd(dir.path())
        .args(["search", "nothing-matches"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results"));
}
