use assert_cmd::Command;

fn shelf(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.env("SHELF_CONFIG_DIR", config_dir)
        .env("SHELF_ENV", "local")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn config_prints_resolved_settings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("base.toml"), "[server]\nport = 9100\n").unwrap();

    let output = shelf(dir.path())
        .arg("config")
        .env("SHELF__SERVER__HOST", "127.0.0.1")
        .output()
        .unwrap();
    assert!(output.status.success());

    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["server"]["port"], 9100);
    assert_eq!(settings["server"]["host"], "127.0.0.1");
    assert_eq!(settings["environment"], "local");
}

#[test]
fn migrate_reports_applied_count() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("cli.db").display());

    let output = shelf(dir.path())
        .arg("migrate")
        .env("SHELF__DATABASE__URL", &url)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("applied 1 migration(s)"));

    let output = shelf(dir.path())
        .arg("migrate")
        .env("SHELF__DATABASE__URL", &url)
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("applied 0 migration(s)"));
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    shelf(dir.path())
        .arg("config")
        .env("SHELF_ENV", "moon")
        .assert()
        .failure();
}
