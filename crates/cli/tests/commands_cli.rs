use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn depwarden(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("depwarden"));
    cmd.current_dir(dir.path())
        .env("DEPWARDEN_HOME_DIR", dir.path().join(".home"))
        .env_remove("DEPWARDEN_SUMMARY_OUTPUT_DIR")
        .env_remove("DEPWARDEN_URL")
        .env_remove("DEPWARDEN_ARTIFACTORY_URL")
        .env_remove("DEPWARDEN_XRAY_URL");
    cmd
}

#[test]
fn detect_lists_technologies_per_directory() {
    let tmp = TempDir::new().expect("tempdir");
    fs::write(tmp.path().join("package.json"), "{}").expect("write");
    fs::create_dir(tmp.path().join("svc")).expect("mkdir");
    fs::write(tmp.path().join("svc").join("go.mod"), "module example.com/svc\n").expect("write");

    depwarden(&tmp)
        .args(["detect", "--recursive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| npm "))
        .stdout(predicate::str::contains("| Go "))
        .stdout(predicate::str::contains("| svc "));

    depwarden(&tmp)
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("| npm "))
        .stdout(predicate::str::contains("svc").not());
}

#[test]
fn detect_without_projects_is_a_noop_failure() {
    let tmp = TempDir::new().expect("tempdir");
    depwarden(&tmp).arg("detect").assert().code(2);
}

#[test]
fn curation_audit_requires_a_server_and_repo() {
    let tmp = TempDir::new().expect("tempdir");
    fs::write(tmp.path().join("package.json"), "{}").expect("write");

    depwarden(&tmp)
        .arg("curation-audit")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DEPWARDEN_URL"));

    depwarden(&tmp)
        .args(["curation-audit", "--url", "http://127.0.0.1:9"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--repo"));
}

#[test]
fn curation_audit_rejects_scan_formats() {
    let tmp = TempDir::new().expect("tempdir");
    depwarden(&tmp)
        .args(["curation-audit", "--format", "sarif"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not supported by curation-audit"));
}

#[test]
fn audit_requires_a_scan_service() {
    let tmp = TempDir::new().expect("tempdir");
    depwarden(&tmp)
        .arg("audit")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No scan service configured"));
}

#[test]
fn unknown_format_is_a_usage_error() {
    let tmp = TempDir::new().expect("tempdir");
    depwarden(&tmp)
        .args(["audit", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported format 'xml'"));
}
