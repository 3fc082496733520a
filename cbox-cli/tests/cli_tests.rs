use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

/// Refuses connections, so any fetch fails fast
const UNREACHABLE_IMAGE: &str = "http://127.0.0.1:9/ubuntu16fs.tar.gz";

/// Check if running as root
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

fn cbox(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cbox"));
    cmd.env("CBOX_HOME", home)
        .env("CBOX_IMAGE_URL", UNREACHABLE_IMAGE)
        .env_remove("RUST_LOG");
    cmd
}

fn write_registry(home: &Path, entries: &serde_json::Value) {
    fs::write(home.join("tags.json"), entries.to_string()).unwrap();
}

fn read_registry(home: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(home.join("tags.json")).unwrap()).unwrap()
}

#[test]
fn test_help_command() {
    Command::new(env!("CARGO_BIN_EXE_cbox"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("container runtime"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("child").not());
}

#[test]
fn test_version_command() {
    Command::new(env!("CARGO_BIN_EXE_cbox"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cbox"));
}

#[test]
fn test_invalid_command() {
    Command::new(env!("CARGO_BIN_EXE_cbox"))
        .arg("invalid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_run_without_command() {
    let home = tempfile::tempdir().unwrap();

    cbox(home.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_list_empty() {
    let home = tempfile::tempdir().unwrap();

    cbox(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout("Containers in storage:\n--------\n--------\n");

    // Missing registry is created lazily
    assert_eq!(read_registry(home.path()), serde_json::json!({}));
}

#[test]
fn test_list_shows_tags() {
    let home = tempfile::tempdir().unwrap();
    write_registry(
        home.path(),
        &serde_json::json!({ "mybox": "/nonexistent/a", "other": "/nonexistent/b" }),
    );

    cbox(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("mybox\n"))
        .stdout(predicate::str::contains("other\n"));
}

#[test]
fn test_list_malformed_registry() {
    let home = tempfile::tempdir().unwrap();
    fs::write(home.path().join("tags.json"), "not json").unwrap();

    cbox(home.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_delete_partial() {
    let home = tempfile::tempdir().unwrap();
    let a = home.path().join("aaaaaaaa");
    let b = home.path().join("bbbbbbbb");
    fs::create_dir_all(a.join("bin")).unwrap();
    fs::create_dir_all(b.join("bin")).unwrap();
    write_registry(home.path(), &serde_json::json!({ "a": a, "b": b }));

    cbox(home.path())
        .args(["delete", "a", "b", "c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted a"))
        .stdout(predicate::str::contains("Deleted b"))
        .stdout(predicate::str::contains(
            "A container with the name c does not exist",
        ))
        .stdout(predicate::str::contains("Successfully deleted container(s)"));

    assert!(!a.exists());
    assert!(!b.exists());
    assert_eq!(read_registry(home.path()), serde_json::json!({}));
}

#[test]
fn test_delete_reports_progress_before_failure() {
    let home = tempfile::tempdir().unwrap();
    let a = home.path().join("aaaaaaaa");
    let c = home.path().join("cccccccc");
    fs::create_dir_all(a.join("bin")).unwrap();
    fs::create_dir_all(c.join("bin")).unwrap();
    // Not a directory, so removing it fails
    let b = home.path().join("plainfile");
    fs::write(&b, "x").unwrap();
    write_registry(home.path(), &serde_json::json!({ "a": a, "b": b, "c": c }));

    cbox(home.path())
        .args(["delete", "a", "b", "c"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Deleted a"))
        .stdout(predicate::str::contains("Deleted c").not())
        .stdout(predicate::str::contains("Successfully").not())
        .stderr(predicate::str::contains("Failed to delete container"));

    assert!(!a.exists());
    assert!(c.exists());
    assert_eq!(
        read_registry(home.path()),
        serde_json::json!({ "b": b, "c": c })
    );
}

#[test]
fn test_list_and_delete_hand_written_tag() {
    let home = tempfile::tempdir().unwrap();
    write_registry(
        home.path(),
        &serde_json::json!({ "good": "/nonexistent/a", "my box": "/nonexistent/b" }),
    );

    cbox(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("my box\n"));

    cbox(home.path())
        .args(["delete", "my box"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted my box"));

    assert_eq!(
        read_registry(home.path()),
        serde_json::json!({ "good": "/nonexistent/a" })
    );
}

#[test]
fn test_create_duplicate_tag() {
    let home = tempfile::tempdir().unwrap();
    let entries = serde_json::json!({ "mybox": home.path().join("abcd1234") });
    write_registry(home.path(), &entries);

    cbox(home.path())
        .args(["create", "mybox"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tag already exists"));

    assert_eq!(read_registry(home.path()), entries);
    // Rejected before anything was fetched
    assert!(!home.path().join("ubuntu16fs.tar.gz").exists());
}

#[test]
fn test_create_invalid_tag() {
    let home = tempfile::tempdir().unwrap();

    cbox(home.path())
        .args(["create", "../escape"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid tag"));
}

#[test]
fn test_create_fetch_failure() {
    let home = tempfile::tempdir().unwrap();

    cbox(home.path())
        .args(["create", "mybox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to provision container"));

    assert_eq!(read_registry(home.path()), serde_json::json!({}));
    assert!(!home.path().join("ubuntu16fs.tar.gz").exists());
}

#[test]
fn test_start_missing_tag() {
    let home = tempfile::tempdir().unwrap();

    cbox(home.path())
        .args(["start", "ghost", "echo", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "The container with the name ghost does not exist.",
        ));

    assert_eq!(read_registry(home.path()), serde_json::json!({}));
    assert!(!home.path().join("ubuntu16fs.tar.gz").exists());
}

#[test]
#[ignore] // Requires root and network access
fn test_container_lifecycle() {
    if !is_root() {
        eprintln!("Skipping test: requires root");
        return;
    }

    let home = tempfile::tempdir().unwrap();
    let cbox = |args: &[&str]| {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cbox"));
        cmd.env("CBOX_HOME", home.path()).args(args);
        cmd
    };

    cbox(&["create", "mybox"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The new container is"));

    let registry = read_registry(home.path());
    let rootfs = Path::new(registry["mybox"].as_str().unwrap()).to_path_buf();
    assert!(rootfs.join("bin").is_dir());
    assert!(!rootfs.join("dev").exists());

    cbox(&["start", "mybox", "echo", "hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hi"));
    assert!(rootfs.exists());

    cbox(&["start", "mybox", "sh", "-c", "exit 7"])
        .assert()
        .code(7);

    cbox(&["start", "mybox", "hostname"])
        .assert()
        .success()
        .stdout(predicate::str::contains("container"));

    cbox(&["delete", "mybox"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted mybox"));
    assert!(!rootfs.exists());

    cbox(&["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mybox").not());
}

#[test]
#[ignore] // Requires root and network access
fn test_run_is_ephemeral() {
    if !is_root() {
        eprintln!("Skipping test: requires root");
        return;
    }

    let home = tempfile::tempdir().unwrap();

    Command::new(env!("CARGO_BIN_EXE_cbox"))
        .env("CBOX_HOME", home.path())
        .args(["run", "sh", "-c", "exit 3"])
        .assert()
        .code(3);

    let leftovers: Vec<_> = fs::read_dir(home.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name.len() == 8)
        .collect();
    assert!(leftovers.is_empty(), "rootfs left behind: {leftovers:?}");
    // Ephemeral containers are never registered
    assert!(!home.path().join("tags.json").exists());
}
