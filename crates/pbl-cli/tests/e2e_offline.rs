//! E2E CLI tests for the commands that can run against a snapshot file:
//! - `pblgen plan` in JSON and text output
//! - refusal when a semester has no kelompok kecil
//! - `pblgen status` and `pblgen groups` with `--snapshot`
//!
//! Each test runs `pblgen` as a subprocess in an isolated temp directory with
//! an empty config file, so no user config or backend is involved.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn pblgen(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pblgen"));
    cmd.current_dir(dir);
    cmd.env("PBLGEN_LOG", "error");
    cmd.env_remove("PBLGEN_API_URL");
    cmd.env_remove("PBLGEN_TOKEN");
    cmd.env_remove("FORMAT");
    cmd.arg("--config").arg(dir.join("config.toml"));
    cmd
}

/// Temp project with an empty config and `roster.json` built from `snapshot`.
fn project(snapshot: &Value) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("config.toml"), "").expect("write config");
    let path = dir.path().join("roster.json");
    std::fs::write(
        &path,
        serde_json::to_vec_pretty(snapshot).expect("serialize fixture"),
    )
    .expect("write snapshot");
    (dir, path)
}

fn role(tipe: &str) -> Value {
    json!({"tipe_peran": tipe, "mata_kuliah_kode": "MK101", "semester": 1})
}

/// Semester 1 course with two modules, one koordinator, three tim blok and
/// five AI lecturers with distinct historical loads.
fn mk101(group_count: u32) -> Value {
    let groups: Vec<Value> = (1..=group_count)
        .map(|n| json!({"semester": 1, "nama_kelompok": n.to_string(), "mahasiswa_ids": [n * 10, n * 10 + 1]}))
        .collect();
    json!({
        "term": {"tahun": "2025/2026", "semesters": [{"jenis": "Ganjil"}]},
        "courses": [{
            "mata_kuliah": {
                "kode": "MK101", "nama": "Blok Dasar", "semester": 1,
                "periode": "Ganjil", "blok": 1, "keahlian_required": ["AI"]
            },
            "pbls": [
                {"id": 101, "mata_kuliah_kode": "MK101", "modul_ke": 1, "nama_modul": "Modul 1"},
                {"id": 102, "mata_kuliah_kode": "MK101", "modul_ke": 2, "nama_modul": "Modul 2"}
            ]
        }],
        "lecturers": [
            {"id": 1, "name": "Koordinator", "keahlian": "Pendidikan", "dosen_peran": [role("koordinator")]},
            {"id": 2, "name": "Tim A", "keahlian": [], "dosen_peran": [role("tim_blok")]},
            {"id": 3, "name": "Tim B", "keahlian": [], "dosen_peran": [role("tim_blok")]},
            {"id": 4, "name": "Tim C", "keahlian": [], "dosen_peran": [role("tim_blok")]},
            {"id": 10, "name": "AI 10", "keahlian": "AI, Robotics"},
            {"id": 11, "name": "AI 11", "keahlian": "[\"AI\"]"},
            {"id": 12, "name": "AI 12", "keahlian": ["ai"]},
            {"id": 13, "name": "AI 13", "keahlian": "Applied AI"},
            {"id": 14, "name": "AI 14", "keahlian": ["AI"]}
        ],
        "small_groups": groups,
        "reporting": [
            {"dosen_id": 10, "total_pbl": 5},
            {"dosen_id": 11, "total_pbl": 0},
            {"dosen_id": 12, "total_pbl": 3},
            {"dosen_id": 13, "total_pbl": 1},
            {"dosen_id": 14, "total_pbl": 4}
        ]
    })
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

#[test]
fn plan_json_reports_quota_and_teaching() {
    let (dir, roster) = project(&mk101(3));
    let output = pblgen(dir.path())
        .args(["plan", "--stable", "--json", "--snapshot"])
        .arg(&roster)
        .output()
        .expect("plan should not crash");
    assert!(
        output.status.success(),
        "plan failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: Value = serde_json::from_slice(&output.stdout).expect("plan --json is JSON");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["written"], 0);

    let course = &report["allocation"]["courses"][0];
    assert_eq!(course["kode"], "MK101");
    assert_eq!(course["quota"]["base"], 1);
    assert_eq!(course["quota"]["team_shortfall"], 1);
    assert_eq!(course["coordinator"], 1);
    assert_eq!(course["team"], json!([2, 3, 4]));
    assert_eq!(course["teaching"], json!([11, 13]));
    assert_eq!(report["allocation"]["warnings"], json!([]));
}

#[test]
fn plan_text_is_tab_separated() {
    let (dir, roster) = project(&mk101(3));
    pblgen(dir.path())
        .args(["plan", "--stable", "--format", "text", "--snapshot"])
        .arg(&roster)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "course\tMK101\tsem=1\tblok=1\tquota=2\tkoordinator=1\ttim=2,3,4\tmengajar=11,13",
        ))
        .stdout(predicate::str::contains("planned\t12"));
}

#[test]
fn plan_never_touches_the_snapshot_file() {
    let (dir, roster) = project(&mk101(3));
    let before = std::fs::read(&roster).expect("read snapshot");
    pblgen(dir.path())
        .args(["plan", "--seed", "7", "--json", "--snapshot"])
        .arg(&roster)
        .assert()
        .success();
    assert_eq!(std::fs::read(&roster).expect("read snapshot"), before);
}

#[test]
fn plan_refuses_semester_without_small_groups() {
    let (dir, roster) = project(&mk101(0));
    let output = pblgen(dir.path())
        .args(["plan", "--stable", "--json", "--snapshot"])
        .arg(&roster)
        .output()
        .expect("plan should not crash");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "no plan printed on refusal");

    let err: Value = serde_json::from_slice(&output.stderr).expect("error is JSON");
    assert_eq!(err["error"]["error_code"], "E2001");
    assert!(
        err["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("semester 1")),
        "message names the semester: {err}"
    );
}

#[test]
fn plan_with_missing_snapshot_fails_cleanly() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("config.toml"), "").expect("write config");
    pblgen(dir.path())
        .args(["plan", "--snapshot", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn broken_config_is_reported() {
    let (dir, roster) = project(&mk101(3));
    std::fs::write(dir.path().join("config.toml"), "[api\n").expect("write config");
    pblgen(dir.path())
        .args(["plan", "--json", "--snapshot"])
        .arg(&roster)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

// ---------------------------------------------------------------------------
// status / groups
// ---------------------------------------------------------------------------

#[test]
fn status_lists_assigned_lecturers_per_module() {
    let mut snapshot = mk101(3);
    snapshot["assigned"] = json!({
        "101": [{"id": 1, "name": "Koordinator", "role": "koordinator"}]
    });
    let (dir, roster) = project(&snapshot);

    let output = pblgen(dir.path())
        .args(["status", "--course", "MK101", "--json", "--snapshot"])
        .arg(&roster)
        .output()
        .expect("status should not crash");
    assert!(output.status.success());

    let status: Value = serde_json::from_slice(&output.stdout).expect("status --json is JSON");
    let modules = status["courses"][0]["modules"]
        .as_array()
        .expect("modules array");
    assert_eq!(modules.len(), 2);
    assert_eq!(modules[0]["pbl_id"], 101);
    assert_eq!(modules[0]["lecturers"][0]["id"], 1);
    assert_eq!(modules[0]["lecturers"][0]["peran"], "koordinator");
    assert_eq!(modules[1]["lecturers"], json!([]));
}

#[test]
fn status_rejects_unknown_course() {
    let (dir, roster) = project(&mk101(3));
    pblgen(dir.path())
        .args(["status", "--course", "MK999", "--snapshot"])
        .arg(&roster)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MK999"));
}

#[test]
fn groups_text_lists_member_counts() {
    let (dir, roster) = project(&mk101(3));
    pblgen(dir.path())
        .args(["groups", "--semester", "1", "--format", "text", "--snapshot"])
        .arg(&roster)
        .assert()
        .success()
        .stdout("1\t1\t2\n1\t2\t2\n1\t3\t2\n");
}

#[test]
fn completions_emit_a_script() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("config.toml"), "").expect("write config");
    pblgen(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pblgen"));
}
