//! Integration tests for the VaultSafe CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`. The
//! master password comes from `VAULTSAFE_PASSWORD`, stdin is always empty
//! so nothing ever prompts, and each test gets its own data directory
//! with a low KDF iteration count.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSWORD: &str = "Sys$ecure1";

/// Helper: get a Command pointing at the vaultsafe binary.
fn vaultsafe() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("vaultsafe").expect("binary should exist");
    cmd.env_remove("VAULTSAFE_PASSWORD")
        .env_remove("VAULTSAFE_NEW_PASSWORD")
        .env_remove("VAULTSAFE_HOME")
        .write_stdin("");
    cmd
}

/// Helper: a command bound to `dir` with the master password set.
fn vaultsafe_in(dir: &TempDir) -> Command {
    let mut cmd = vaultsafe();
    cmd.env("VAULTSAFE_HOME", dir.path())
        .env("VAULTSAFE_PASSWORD", PASSWORD);
    cmd
}

/// Helper: a fresh data directory holding an initialized vault.
fn init_vault() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("vaultsafe.toml")
        .write_str("kdf_iterations = 1000\n")
        .unwrap();
    vaultsafe_in(&dir).arg("init").assert().success();
    dir
}

#[test]
fn help_flag_shows_usage() {
    vaultsafe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Local encrypted credential vault"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("copy"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("del"))
        .stdout(predicate::str::contains("change-master-password"))
        .stdout(predicate::str::contains("update-vault"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("logout"));
}

#[test]
fn version_flag_shows_version() {
    vaultsafe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vaultsafe"));
}

#[test]
fn no_args_shows_help() {
    vaultsafe()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn get_on_missing_vault_fails() {
    let tmp = TempDir::new().unwrap();
    vaultsafe_in(&tmp)
        .args(["get", "gh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn generate_prints_password_of_requested_length() {
    let tmp = TempDir::new().unwrap();
    let out = vaultsafe_in(&tmp)
        .args(["generate", "--length", "24"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let password = String::from_utf8(out.stdout).unwrap();
    assert_eq!(password.trim_end().chars().count(), 24);
}

#[test]
fn init_creates_database_and_refuses_twice() {
    let dir = init_vault();
    dir.child("vaultsafe.db").assert(predicate::path::exists());

    vaultsafe_in(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_rejects_short_password() {
    let dir = TempDir::new().unwrap();
    vaultsafe()
        .env("VAULTSAFE_HOME", dir.path())
        .env("VAULTSAFE_PASSWORD", "short")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8"));
}

#[test]
fn add_then_get_field() {
    let dir = init_vault();

    vaultsafe_in(&dir)
        .args([
            "add", "GitHub", "-m", "gh,github", "--username", "alice", "--password", "p@ss",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("GitHub"));

    vaultsafe_in(&dir)
        .args(["get", "gh", "--field", "password"])
        .assert()
        .success()
        .stdout("p@ss\n");

    vaultsafe_in(&dir)
        .args(["get", "github", "--field", "token"])
        .assert()
        .success()
        .stdout("Not Provided\n");
}

#[test]
fn wrong_password_is_rejected() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .arg("logout")
        .assert()
        .success();

    vaultsafe_in(&dir)
        .env("VAULTSAFE_PASSWORD", "not-the-password")
        .args(["get", "gh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Wrong master password"));
}

#[test]
fn duplicate_mnemonic_is_rejected() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh", "--password", "x"])
        .assert()
        .success();

    vaultsafe_in(&dir)
        .args(["add", "GitLab", "-m", "gh", "--password", "y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already in use"));
}

#[test]
fn update_and_delete_credential() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh", "--password", "old", "--token", "t0k"])
        .assert()
        .success();

    vaultsafe_in(&dir)
        .args(["update", "gh", "--password", "new", "--clear", "token", "-m", "hub"])
        .assert()
        .success();

    vaultsafe_in(&dir)
        .args(["get", "hub", "--field", "password"])
        .assert()
        .success()
        .stdout("new\n");
    vaultsafe_in(&dir)
        .args(["get", "gh", "--field", "token"])
        .assert()
        .success()
        .stdout("Not Provided\n");

    vaultsafe_in(&dir)
        .args(["del", "gh", "--force"])
        .assert()
        .success();
    vaultsafe_in(&dir)
        .args(["get", "hub"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn change_master_password_end_to_end() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh", "--username", "alice", "--password", "p@ss"])
        .assert()
        .success();

    vaultsafe_in(&dir)
        .env("VAULTSAFE_NEW_PASSWORD", "N3wPass!")
        .arg("change-master-password")
        .assert()
        .success();

    vaultsafe_in(&dir)
        .args(["get", "gh", "--field", "password"])
        .assert()
        .failure();

    vaultsafe_in(&dir)
        .env("VAULTSAFE_PASSWORD", "N3wPass!")
        .args(["get", "gh", "--field", "password"])
        .assert()
        .success()
        .stdout("p@ss\n");
}

#[test]
fn export_then_import_into_new_vault() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh,github", "--password", "p@ss"])
        .assert()
        .success();

    let export = dir.child("export.json");
    vaultsafe_in(&dir)
        .args(["export", "--output"])
        .arg(export.path())
        .assert()
        .success();
    export.assert(predicate::str::contains("\"password\": \"p@ss\""));

    let other = init_vault();
    vaultsafe_in(&other)
        .arg("import")
        .arg(export.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 credentials"));

    vaultsafe_in(&other)
        .args(["get", "github", "--field", "password"])
        .assert()
        .success()
        .stdout("p@ss\n");
}

#[test]
fn import_csv_skips_taken_mnemonics() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh", "--password", "x"])
        .assert()
        .success();

    let csv = dir.child("creds.csv");
    csv.write_str(
        "name,url,username,password,recovery_key,primary_email,secondary_email,token,notes,mnemonics\n\
         Dup,,,,,,,,,gh\n\
         Bank,,bob,b4nk,,,,,,bank\n",
    )
    .unwrap();

    vaultsafe_in(&dir)
        .arg("import")
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 skipped"));

    vaultsafe_in(&dir)
        .args(["get", "bank", "--field", "username"])
        .assert()
        .success()
        .stdout("bob\n");
}

#[test]
fn info_shows_counts_without_password() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh,github", "--password", "x"])
        .assert()
        .success();

    vaultsafe()
        .env("VAULTSAFE_HOME", dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("GitHub"))
        .stdout(predicate::str::contains("gh, github"));
}

#[test]
fn session_is_reused_until_logout() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh", "--password", "p@ss"])
        .assert()
        .success();
    dir.child(".session").assert(predicate::path::exists());

    // No password in the environment: the session supplies it.
    vaultsafe()
        .env("VAULTSAFE_HOME", dir.path())
        .args(["get", "gh", "--field", "password"])
        .assert()
        .success()
        .stdout("p@ss\n");

    vaultsafe_in(&dir).arg("logout").assert().success();
    dir.child(".session").assert(predicate::path::missing());
}

#[test]
fn update_vault_changes_metadata() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["update-vault", "--name", "work-laptop", "--session-expiration", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work-laptop"))
        .stdout(predicate::str::contains("60s"));
}

#[test]
fn audit_records_operations() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh", "--password", "x"])
        .assert()
        .success();

    vaultsafe_in(&dir)
        .args(["audit", "--last", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn data_dir_flag_overrides_env() {
    let dir = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    elsewhere
        .child("vaultsafe.toml")
        .write_str("kdf_iterations = 1000\n")
        .unwrap();

    vaultsafe_in(&dir)
        .arg("init")
        .arg("--data-dir")
        .arg(elsewhere.path())
        .assert()
        .success();

    elsewhere.child("vaultsafe.db").assert(predicate::path::exists());
    dir.child("vaultsafe.db").assert(predicate::path::missing());
}

#[cfg(unix)]
#[test]
fn export_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["add", "GitHub", "-m", "gh", "--password", "p@ss"])
        .assert()
        .success();

    // A pre-existing, world-readable file is narrowed too.
    let export = dir.child("export.json");
    export.write_str("old").unwrap();
    std::fs::set_permissions(export.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

    vaultsafe_in(&dir)
        .args(["export", "--output"])
        .arg(export.path())
        .assert()
        .success();

    let mode = std::fs::metadata(export.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    export.assert(predicate::str::contains("p@ss"));
}

#[test]
fn export_write_failure_is_reported() {
    let dir = init_vault();
    vaultsafe_in(&dir)
        .args(["export", "--output"])
        .arg(dir.path().join("missing").join("export.json"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("Exported").not())
        .stderr(predicate::str::contains("failed to write export file"));
}
