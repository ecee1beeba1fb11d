use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("pikto")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("profile"))
        .stdout(predicate::str::contains("feed"))
        .stdout(predicate::str::contains("likes"))
        .stdout(predicate::str::contains("like"))
        .stdout(predicate::str::contains("unlike"));
}

#[test]
fn test_login_help_shows_code_flag() {
    cargo_bin_cmd!("pikto")
        .args(["login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--code"));
}

#[test]
fn test_feed_help_shows_pages_flag() {
    cargo_bin_cmd!("pikto")
        .args(["feed", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--pages"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("pikto")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pikto"));
}

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("pikto")
        .env("PIKTO_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("pikto")
        .env("PIKTO_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));

    assert!(config_path.exists());

    let contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("api_base_url"));
    assert!(contents.contains("access_scope"));
}

#[test]
fn test_config_init_keeps_existing_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    std::fs::write(&config_path, "# existing config\n").unwrap();

    cargo_bin_cmd!("pikto")
        .env("PIKTO_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let contents = std::fs::read_to_string(&config_path).unwrap();
    assert_eq!(contents, "# existing config\n");
}
