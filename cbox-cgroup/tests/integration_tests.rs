use std::fs;

use cbox_cgroup::*;

/// Check if running as root
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[test]
fn test_mock_backend_lifecycle() {
    let backend = MockBackend::new();
    let pid = ProcessId::from_raw(12345);

    confine(&backend, pid, PidsLimit::new(20)).unwrap();

    assert!(backend.has_process(pid));
    assert_eq!(backend.pids_limit(), Some(PidsLimit::new(20)));
    assert_eq!(backend.calls().len(), 3);
}

#[test]
fn test_backend_as_trait_object() {
    let backend = MockBackend::new();
    let dynamic: &dyn ConfinementBackend = &backend;

    confine(dynamic, ProcessId::from_raw(1), PidsLimit::new(2)).unwrap();

    assert_eq!(backend.pids_limit(), Some(PidsLimit::new(2)));
}

#[test]
fn test_controller_reopens_existing_group() {
    let root = tempfile::tempdir().unwrap();

    let first = CGroupController::with_root(root.path()).unwrap();
    first.write_pids_max(PidsLimit::new(7)).unwrap();

    let second = CGroupController::with_root(root.path()).unwrap();
    assert_eq!(first.path(), second.path());
    assert_eq!(
        fs::read_to_string(second.path().join("pids.max")).unwrap(),
        "7"
    );
}

#[test]
fn test_new_requires_root() {
    if is_root() {
        return;
    }

    let result = CGroupController::new();
    assert!(matches!(result, Err(cbox_core::Error::PermissionDenied { .. })));
}

#[test]
#[ignore] // Requires root
fn test_real_cgroup_confinement() {
    if !is_root() {
        eprintln!("Skipping test: requires root");
        return;
    }

    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let controller = CGroupController::new().unwrap();
    confine(&controller, ProcessId::current(), PidsLimit::default()).unwrap();

    let procs = fs::read_to_string(controller.path().join("cgroup.procs")).unwrap();
    assert!(procs
        .lines()
        .any(|line| line.trim() == ProcessId::current().as_raw().to_string()));
}
