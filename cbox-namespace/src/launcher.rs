//! Launching cbox inside new namespaces
//!
//! Namespace flags only apply to processes created after they are
//! requested, so the launcher clones a child with the flags set and has
//! that child re-execute `/proc/self/exe` with the hidden `child`
//! sub-command. The re-executed program then runs the container session
//! with the namespaces already in place.
//!
//! This module uses `unsafe` for clone() and sigaction(), which are
//! inherently unsafe but required here.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString, OsStr, OsString};
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use cbox_core::constants::{CHILD_SUBCOMMAND, SELF_EXE};
use cbox_core::{Error, ProcessId, Result};
use nix::fcntl::OFlag;
use nix::sched::{CloneCb, clone};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{Gid, Pid, Uid, close, execv, pipe2, setgid, setuid};
use tracing::{debug, error, info, warn};

use crate::config::NamespaceConfig;

/// Stack for the cloned child until it execs
const STACK_SIZE: usize = 1024 * 1024;

/// Command line for the re-executed child
///
/// Rendered as `[--verbose] child [--ephemeral] [--privileged] <rootfs> -- <cmd> [args...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInvocation {
    /// Rootfs to chroot into
    pub rootfs: PathBuf,

    /// Program to run inside the container
    pub command: String,

    /// Arguments for `command`
    pub args: Vec<String>,

    /// Delete the rootfs once the command finishes
    pub ephemeral: bool,

    /// Caller holds host root
    pub privileged: bool,

    /// Forward verbose logging to the child
    pub verbose: bool,
}

impl ChildInvocation {
    /// Run `command` with `args` in `rootfs`
    pub fn new(rootfs: impl Into<PathBuf>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            rootfs: rootfs.into(),
            command: command.into(),
            args,
            ephemeral: false,
            privileged: false,
            verbose: false,
        }
    }

    /// Mark the rootfs for deletion after the command
    #[must_use]
    pub const fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    /// Record whether the caller holds host root
    #[must_use]
    pub const fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Forward `--verbose`
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Namespaces this invocation runs in
    #[must_use]
    pub fn namespace_config(&self) -> NamespaceConfig {
        NamespaceConfig::for_container(self.privileged)
    }

    /// Arguments after `argv[0]`
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.args.len() + 6);

        if self.verbose {
            args.push(OsString::from("--verbose"));
        }
        args.push(OsString::from(CHILD_SUBCOMMAND));
        if self.ephemeral {
            args.push(OsString::from("--ephemeral"));
        }
        if self.privileged {
            args.push(OsString::from("--privileged"));
        }
        args.push(self.rootfs.clone().into_os_string());
        args.push(OsString::from("--"));
        args.push(OsString::from(&self.command));
        args.extend(self.args.iter().map(OsString::from));

        args
    }
}

/// Spawns processes in new namespaces and waits for them
#[derive(Debug, Clone)]
pub struct Launcher {
    config: NamespaceConfig,
    executable: PathBuf,
}

impl Launcher {
    /// Launcher that re-executes the running binary
    #[must_use]
    pub fn new(config: NamespaceConfig) -> Self {
        Self {
            config,
            executable: PathBuf::from(SELF_EXE),
        }
    }

    /// Launcher for an invocation, with the namespace set it needs
    #[must_use]
    pub fn for_invocation(invocation: &ChildInvocation) -> Self {
        Self::new(invocation.namespace_config())
    }

    /// Namespace configuration
    #[must_use]
    pub const fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    /// Run the container session in a new child and wait for it
    ///
    /// Returns the child's exit code, or 128 + signal number if it was
    /// killed. Standard streams are inherited unchanged.
    pub fn launch(&self, invocation: &ChildInvocation) -> Result<i32> {
        info!(
            rootfs = %invocation.rootfs.display(),
            command = %invocation.command,
            ephemeral = invocation.ephemeral,
            "Launching container"
        );

        let mut argv = vec![self.executable.clone().into_os_string()];
        argv.extend(invocation.to_args());

        self.spawn(&self.executable, &argv)
    }

    /// Clone a child in the configured namespaces that execs `argv`
    fn spawn(&self, program: &Path, argv: &[OsString]) -> Result<i32> {
        let program = to_cstring(program.as_os_str())?;
        let argv = argv
            .iter()
            .map(|arg| to_cstring(arg))
            .collect::<Result<Vec<_>>>()?;

        let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).map_err(|e| Error::Launch {
            message: format!("Failed to create sync pipe: {e}"),
        })?;
        let read_end = File::from(read_end);
        let write_end = File::from(write_end);
        let write_raw = write_end.as_raw_fd();
        let assume_root = self.config.user;

        let mut stack = vec![0u8; STACK_SIZE];
        let child_main: CloneCb<'_> = Box::new(|| {
            // The child's copy of the write end
            let _ = close(write_raw);
            child_entry(&read_end, &program, &argv, assume_root)
        });

        debug!(namespaces = ?self.config.enabled_namespaces(), "Cloning child");

        // SAFETY: the child only runs `child_entry`, which execs or returns
        let pid = unsafe {
            clone(
                child_main,
                &mut stack,
                self.config.to_clone_flags(),
                Some(Signal::SIGCHLD as i32),
            )
        }
        .map_err(|e| Error::Launch {
            message: format!("clone failed: {e}"),
        })?;
        drop(read_end);

        info!("Parent process waiting for child (PID {})", pid);

        let _interrupts = InterruptGuard::install();

        if let Err(e) = self.release_child(write_end, pid) {
            error!("Could not start child {}: {}", pid, e);
            let _ = waitpid(pid, None);
            return Err(e);
        }

        wait_for_exit(pid)
    }

    /// Write ID maps, then let the child continue
    ///
    /// Dropping `sync` without writing makes the child exit instead.
    fn release_child(&self, mut sync: File, pid: Pid) -> Result<()> {
        if self.config.user {
            if let Some(mapping) = self.config.id_mapping {
                mapping.write_for(ProcessId::from(pid))?;
            }
        }

        sync.write_all(&[1]).map_err(|e| Error::Launch {
            message: format!("Failed to signal child: {e}"),
        })
    }
}

/// Entry point of the cloned child; never returns on success
fn child_entry(sync: &File, program: &CStr, argv: &[CString], assume_root: bool) -> isize {
    let mut reader = sync;
    let mut byte = [0u8; 1];
    if !matches!(reader.read(&mut byte), Ok(1)) {
        // Parent gave up before releasing us
        return 1;
    }

    if assume_root {
        if let Err(e) = setgid(Gid::from_raw(0)).and_then(|()| setuid(Uid::from_raw(0))) {
            eprintln!("cbox: cannot become root in user namespace: {e}");
            return 1;
        }
    }

    let Err(e) = execv(program, argv);
    eprintln!("cbox: failed to execute {}: {e}", program.to_string_lossy());
    127
}

/// Wait for the child to exit and translate its status
fn wait_for_exit(child_pid: Pid) -> Result<i32> {
    debug!("Parent: Waiting for child to exit...");

    loop {
        match waitpid(child_pid, None) {
            Ok(WaitStatus::Exited(_, exit_code)) => {
                info!("Child exited with code: {}", exit_code);
                return Ok(exit_code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                warn!("Child terminated by signal: {:?}", signal);
                // Exit codes for signals: 128 + signal number
                return Ok(128 + signal as i32);
            }
            Ok(status) => {
                debug!("Child status: {:?}", status);
            }
            Err(nix::errno::Errno::EINTR) => {
                debug!("Wait interrupted by signal, continuing...");
            }
            Err(e) => {
                error!("Wait failed: {}", e);
                return Err(Error::Launch {
                    message: format!("Wait failed: {e}"),
                });
            }
        }
    }
}

/// Ignores SIGINT and SIGQUIT while the child runs
///
/// A terminal interrupt goes to the whole foreground process group; the
/// parent must survive it to report the child's status.
struct InterruptGuard {
    previous: Vec<(Signal, SigAction)>,
}

impl InterruptGuard {
    fn install() -> Self {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        let mut previous = Vec::with_capacity(2);

        for signal in [Signal::SIGINT, Signal::SIGQUIT] {
            // SAFETY: SIG_IGN runs no handler code
            match unsafe { sigaction(signal, &ignore) } {
                Ok(old) => previous.push((signal, old)),
                Err(e) => warn!("Could not ignore {:?}: {}", signal, e),
            }
        }

        Self { previous }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        for (signal, action) in self.previous.drain(..) {
            // SAFETY: reinstates the disposition we replaced
            if let Err(e) = unsafe { sigaction(signal, &action) } {
                warn!("Could not restore {:?}: {}", signal, e);
            }
        }
    }
}

fn to_cstring(arg: &OsStr) -> Result<CString> {
    CString::new(arg.as_bytes()).map_err(|_| Error::Launch {
        message: format!("Argument contains a NUL byte: {}", arg.to_string_lossy()),
    })
}
