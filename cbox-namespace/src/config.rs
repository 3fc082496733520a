//! Namespace configuration

use nix::sched::CloneFlags;

use crate::idmap::IdMapping;

/// Namespace configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Enable PID namespace
    pub pid: bool,

    /// Enable mount namespace
    pub mount: bool,

    /// Enable UTS namespace (hostname)
    pub uts: bool,

    /// Enable user namespace
    pub user: bool,

    /// UID/GID mapping written for the user namespace
    pub id_mapping: Option<IdMapping>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            pid: true,
            mount: true,
            uts: true,
            user: false, // Requires an ID mapping
            id_mapping: None,
        }
    }
}

impl NamespaceConfig {
    /// Create a new namespace configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The namespace set for a container launch
    ///
    /// Unprivileged launches also get a user namespace in which the
    /// invoking user is mapped to root.
    #[must_use]
    pub fn for_container(privileged: bool) -> Self {
        let config = Self::new();

        if privileged {
            config
        } else {
            config.with_id_mapping(IdMapping::current_user())
        }
    }

    /// Enable the user namespace with the given mapping
    #[must_use]
    pub const fn with_id_mapping(mut self, mapping: IdMapping) -> Self {
        self.user = true;
        self.id_mapping = Some(mapping);
        self
    }

    /// Convert to clone flags for clone(2)
    #[must_use]
    pub fn to_clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();

        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.user {
            flags |= CloneFlags::CLONE_NEWUSER;
        }

        flags
    }

    /// Get list of enabled namespace names
    #[must_use]
    pub fn enabled_namespaces(&self) -> Vec<&'static str> {
        let mut namespaces = Vec::new();

        if self.pid {
            namespaces.push("pid");
        }
        if self.mount {
            namespaces.push("mnt");
        }
        if self.uts {
            namespaces.push("uts");
        }
        if self.user {
            namespaces.push("user");
        }

        namespaces
    }
}
