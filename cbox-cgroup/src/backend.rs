//! Confinement backend trait for pluggable implementations

use std::sync::{Arc, Mutex, PoisonError};

use cbox_core::{PidsLimit, ProcessId, Result};
use tracing::debug;

/// Trait for process-count confinement backends
///
/// This allows for different implementations:
/// - [`CGroupController`](crate::CGroupController) - cgroup filesystem
/// - [`MockBackend`] - Testing without filesystem
pub trait ConfinementBackend {
    /// Set the maximum number of live processes
    ///
    /// # Errors
    /// Returns error if the limit cannot be written
    fn set_pids_limit(&self, limit: PidsLimit) -> Result<()>;

    /// Ask the kernel to drop the group once its last process exits
    ///
    /// # Errors
    /// Returns error if the release flag cannot be written
    fn release_when_empty(&self) -> Result<()>;

    /// Move a process into this group
    ///
    /// # Errors
    /// Returns error if the process cannot be added
    fn add_process(&self, pid: ProcessId) -> Result<()>;
}

/// Apply `limit` and join `pid`, in that order
///
/// The limit is in place before the process joins, so nothing forked
/// afterwards can escape it.
pub fn confine<B: ConfinementBackend + ?Sized>(
    backend: &B,
    pid: ProcessId,
    limit: PidsLimit,
) -> Result<()> {
    debug!(pid = %pid, limit = %limit, "Confining process");
    backend.set_pids_limit(limit)?;
    backend.release_when_empty()?;
    backend.add_process(pid)
}

/// Recorded backend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    /// `set_pids_limit`
    SetPidsLimit(PidsLimit),
    /// `release_when_empty`
    ReleaseWhenEmpty,
    /// `add_process`
    AddProcess(ProcessId),
}

/// Mock backend for testing (doesn't touch filesystem)
///
/// # Example
/// ```
/// use cbox_cgroup::{confine, ConfinementBackend, MockBackend};
/// use cbox_core::{PidsLimit, ProcessId};
///
/// let backend = MockBackend::new();
/// confine(&backend, ProcessId::from_raw(123), PidsLimit::default()).unwrap();
///
/// assert!(backend.has_process(ProcessId::from_raw(123)));
/// assert_eq!(backend.pids_limit(), Some(PidsLimit::new(20)));
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    fail_add: bool,
}

impl MockBackend {
    /// Create a new mock backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock whose `add_process` always fails
    #[must_use]
    pub fn failing_add() -> Self {
        let backend = Self::new();
        backend.lock().fail_add = true;
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Operations in the order they were made
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Check if a process has been added
    #[must_use]
    pub fn has_process(&self, pid: ProcessId) -> bool {
        self.lock().calls.contains(&MockCall::AddProcess(pid))
    }

    /// Last limit set
    #[must_use]
    pub fn pids_limit(&self) -> Option<PidsLimit> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            MockCall::SetPidsLimit(limit) => Some(*limit),
            _ => None,
        })
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

impl ConfinementBackend for MockBackend {
    fn set_pids_limit(&self, limit: PidsLimit) -> Result<()> {
        self.lock().calls.push(MockCall::SetPidsLimit(limit));
        Ok(())
    }

    fn release_when_empty(&self) -> Result<()> {
        self.lock().calls.push(MockCall::ReleaseWhenEmpty);
        Ok(())
    }

    fn add_process(&self, pid: ProcessId) -> Result<()> {
        let mut state = self.lock();
        if state.fail_add {
            return Err(cbox_core::Error::Confinement {
                message: format!("cannot add process {pid}"),
            });
        }
        state.calls.push(MockCall::AddProcess(pid));
        Ok(())
    }
}
