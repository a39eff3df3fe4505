use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn luapack() -> Command {
    Command::cargo_bin("luapack").unwrap()
}

#[test]
fn test_init_creates_project_skeleton() {
    let dir = tempfile::tempdir().unwrap();

    luapack()
        .current_dir(dir.path())
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created build.toml"));

    assert!(dir.path().join("build.toml").exists());
    assert!(dir.path().join("src/main.lua").exists());
    assert!(dir.path().join("src/greeting.lua").exists());
}

#[test]
fn test_bundle_from_initialized_project() {
    let dir = tempfile::tempdir().unwrap();

    luapack().current_dir(dir.path()).arg("--init").assert().success();
    luapack().current_dir(dir.path()).assert().success();

    let bundle = fs::read_to_string(dir.path().join("build/bundle.lua")).unwrap();
    assert!(bundle.contains("local __modules = {}"));
    assert!(bundle.contains("__modules[\"src/main\"] = function(require)"));
    assert!(bundle.contains("__modules[\"src/greeting\"] = function(require)"));
    assert!(bundle.ends_with("return __load(\"src/main\", nil)\n"));
}

#[test]
fn test_check_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();

    luapack().current_dir(dir.path()).arg("--init").assert().success();
    luapack()
        .current_dir(dir.path())
        .arg("--check")
        .assert()
        .success();

    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_out_dir_override() {
    let dir = tempfile::tempdir().unwrap();

    luapack().current_dir(dir.path()).arg("--init").assert().success();
    luapack()
        .current_dir(dir.path())
        .args(["--out-dir", "dist"])
        .assert()
        .success();

    assert!(dir.path().join("dist/bundle.lua").exists());
    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_positional_manifest_path() {
    let dir = tempfile::tempdir().unwrap();

    luapack().current_dir(dir.path()).arg("--init").assert().success();
    fs::rename(dir.path().join("build.toml"), dir.path().join("pack.toml")).unwrap();

    luapack()
        .current_dir(dir.path())
        .arg("pack.toml")
        .assert()
        .success();

    assert!(dir.path().join("build/bundle.lua").exists());
}

#[test]
fn test_entry_override() {
    let dir = tempfile::tempdir().unwrap();

    luapack().current_dir(dir.path()).arg("--init").assert().success();
    luapack()
        .current_dir(dir.path())
        .args(["--entry", "src/greeting"])
        .assert()
        .success();

    let bundle = fs::read_to_string(dir.path().join("build/bundle.lua")).unwrap();
    assert!(bundle.ends_with("return __load(\"src/greeting\", nil)\n"));
}

#[test]
fn test_entry_override_unresolvable() {
    let dir = tempfile::tempdir().unwrap();

    luapack().current_dir(dir.path()).arg("--init").assert().success();
    luapack()
        .current_dir(dir.path())
        .args(["--entry", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not resolve"));
}

#[test]
fn test_missing_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();

    luapack()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find"));
}

#[test]
fn test_unknown_project_fails() {
    let dir = tempfile::tempdir().unwrap();

    luapack().current_dir(dir.path()).arg("--init").assert().success();
    luapack()
        .current_dir(dir.path())
        .args(["--project", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no [[project]] entry named"));
}

#[test]
fn test_missing_entry_point_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/util.lua"), "return {}").unwrap();
    fs::write(
        dir.path().join("build.toml"),
        r#"[[project]]
name = "broken"
entry_point = "src/main.lua"
files = ["src"]
"#,
    )
    .unwrap();

    luapack()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry point"));
}
