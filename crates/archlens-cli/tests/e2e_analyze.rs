//! E2E tests for `archlens analyze|cycles|layers` against exports on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn archlens_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("archlens"));
    cmd.current_dir(dir);
    cmd.env("ARCHLENS_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn archlens_human_cmd(dir: &Path) -> Command {
    let mut cmd = archlens_cmd(dir);
    cmd.env("FORMAT", "pretty");
    cmd
}

fn node(id: &str, label: &str) -> Value {
    json!({ "elementId": id, "labels": [label], "properties": {} })
}

fn contains(parent: (&str, &str), child: (&str, &str)) -> Value {
    json!({
        "source": node(parent.0, parent.1),
        "relationships": [{
            "elementId": format!("c:{}:{}", parent.0, child.0),
            "type": "CONTAINS",
            "startNodeElementId": parent.0,
            "endNodeElementId": child.0,
        }],
        "target": node(child.0, child.1),
    })
}

fn depends(id: &str, from: &str, to: &str) -> Value {
    json!({
        "source": node(from, "Module"),
        "relationships": [{
            "elementId": id,
            "type": "DEPENDS_ON",
            "startNodeElementId": from,
            "endNodeElementId": to,
            "properties": { "category": "strong" },
        }],
        "target": node(to, "Module"),
    })
}

/// Two layers whose modules depend on each other in both directions.
fn write_export(dir: &Path) -> PathBuf {
    let export = json!({
        "selected": "app",
        "dependency_paths": [
            depends("r1", "checkout", "billing"),
            depends("r2", "billing", "checkout"),
        ],
        "parent_chain": [
            contains(("shop", "Domain"), ("app", "Application")),
            contains(("app", "Application"), ("ui", "Layer")),
            contains(("app", "Application"), ("core", "Layer")),
            contains(("ui", "Layer"), ("checkout", "Module")),
            contains(("core", "Layer"), ("billing", "Module")),
        ],
    });
    let path = dir.join("export.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&export).unwrap()).unwrap();
    path
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = archlens_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("archlens should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

#[test]
fn analyze_json_collapses_modules_onto_layers() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let json = run_json(
        dir.path(),
        &["analyze", "-i", export.to_str().unwrap(), "--max-depth", "2"],
    );

    let nodes: Vec<&str> = json["graph"]["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert!(nodes.contains(&"ui"));
    assert!(nodes.contains(&"core"));
    assert!(!nodes.contains(&"checkout"));
    assert_eq!(json["replacement"]["checkout"], "ui");
    assert!(json["content_hash"].as_str().unwrap().starts_with("blake3:"));
    assert_eq!(json["report"]["cycles"].as_array().unwrap().len(), 1);
    assert!(json.get("timings").is_none());
}

#[test]
fn analyze_text_lists_nodes_and_edges() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    archlens_cmd(dir.path())
        .args(["--format", "text", "analyze", "-i", export.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("edge r1 checkout -> billing DEPENDS_ON [cycle]"))
        .stdout(predicate::str::contains("node billing Module depth=3 parent=core"));
}

#[test]
fn analyze_pretty_summary() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    archlens_human_cmd(dir.path())
        .args(["analyze", "-i", export.to_str().unwrap(), "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Analysis"))
        .stdout(predicate::str::contains("Cycles:"));
}

#[test]
fn cycles_json_reports_walk() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let json = run_json(
        dir.path(),
        &["cycles", "-i", export.to_str().unwrap(), "--max-depth", "2"],
    );

    let cycles = json["cycles"].as_array().unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0]["edge_ids"], json!(["r1", "r2"]));
    assert_eq!(cycles[0]["path"], json!(["ui", "core", "ui"]));
    assert_eq!(json["truncated"], false);
}

#[test]
fn cycles_search_bound_is_reported() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let json = run_json(
        dir.path(),
        &["cycles", "-i", export.to_str().unwrap(), "--max-length", "1"],
    );

    assert_eq!(json["truncated"], true);
    assert_eq!(json["diagnostics"][0]["code"], "E3001");
}

#[test]
fn layers_json_flags_upward_dependency() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let json = run_json(
        dir.path(),
        &[
            "layers",
            "-i",
            export.to_str().unwrap(),
            "--max-depth",
            "2",
            "--order",
            "ui,core",
        ],
    );

    let violations = json["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0]["edge_id"], "r2");
    assert_eq!(violations[0]["source"], "core");
    assert_eq!(violations[0]["target"], "ui");
}

#[test]
fn layers_order_from_project_config() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    std::fs::create_dir_all(dir.path().join(".archlens")).unwrap();
    std::fs::write(
        dir.path().join(".archlens/config.toml"),
        "[layers]\norder = [\"ui\", \"core\"]\n",
    )
    .unwrap();

    archlens_cmd(dir.path())
        .args(["--format", "text", "layers", "-i", export.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("violation r2 billing (core) -> checkout (ui)"));
}

#[test]
fn missing_input_fails_with_code() {
    let dir = TempDir::new().unwrap();
    archlens_cmd(dir.path())
        .args(["--format", "text", "analyze", "-i", "absent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1002]"));
}

#[test]
fn unknown_selection_fails_with_code() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let output = archlens_cmd(dir.path())
        .args(["analyze", "-i", export.to_str().unwrap(), "--select", "ghost", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('{').unwrap();
    let end = stderr.rfind('}').unwrap();
    let json: Value = serde_json::from_str(&stderr[start..=end]).unwrap();
    assert_eq!(json["error"]["error_code"], "E2002");
}

#[test]
fn timing_report_goes_to_stderr() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    archlens_cmd(dir.path())
        .args(["--timing", "--format", "text", "analyze", "-i", export.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("timing report:"))
        .stderr(predicate::str::contains("normalize"))
        .stdout(predicate::str::contains("timing").not());
}
