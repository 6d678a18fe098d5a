use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn capshare_cmd(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("capshare").expect("binary exists");
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_prints_usage() {
    let home = TempDir::new().unwrap();
    capshare_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Screen capture and multi-destination upload tool",
        ))
        .stdout(predicate::str::contains("--uf"));
}

#[test]
fn list_prints_every_code_table() {
    let home = TempDir::new().unwrap();
    capshare_cmd(&home)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Outputs (-o):"))
        .stdout(predicate::str::contains("2  remote host"))
        .stdout(predicate::str::contains("0  imgur (not configured)"))
        .stdout(predicate::str::contains("0  paste"))
        .stdout(predicate::str::contains("0  is.gd"));
}

#[test]
fn missing_file_exits_with_one() {
    let home = TempDir::new().unwrap();
    capshare_cmd(&home)
        .args(["-o", "1", "-u"])
        .arg(home.path().join("missing.png"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing.png"));
}

#[test]
fn unknown_output_code_is_rejected() {
    let home = TempDir::new().unwrap();
    capshare_cmd(&home)
        .args(["-o", "9", "-u", "whatever.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown output code 9"));
}

#[test]
fn invalid_arguments_exit_with_one() {
    let home = TempDir::new().unwrap();
    capshare_cmd(&home).arg("--no-such-flag").assert().code(1);
}

#[test]
fn nothing_to_do_is_an_error() {
    let home = TempDir::new().unwrap();
    capshare_cmd(&home)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nothing to do"));
}

#[test]
fn capture_requires_wayland() {
    let home = TempDir::new().unwrap();
    capshare_cmd(&home)
        .env_remove("WAYLAND_DISPLAY")
        .arg("--wc")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("WAYLAND_DISPLAY not set"));
}

#[test]
fn local_file_job_prints_its_path() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("notes.txt");
    std::fs::write(&file, "hello").unwrap();

    capshare_cmd(&home)
        .args(["-o", "1", "-u"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.txt"));
}
