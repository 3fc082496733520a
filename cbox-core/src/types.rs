//! Core type definitions with strong typing and validation

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{INSTANCE_ID_CHARSET, INSTANCE_ID_LEN};
use crate::{Error, Result};

/// User-chosen container name, validated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Maximum length for tags
    pub const MAX_LENGTH: usize = 64;

    /// Create a new `Tag` with validation
    ///
    /// # Errors
    /// Returns error if the tag is empty, too long, or contains invalid characters
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        Self::validate(&tag)?;
        Ok(Self(tag))
    }

    fn validate(tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Tag cannot be empty".to_string(),
            });
        }

        if tag.len() > Self::MAX_LENGTH {
            return Err(Error::InvalidConfig {
                message: format!("Tag too long (max {} chars)", Self::MAX_LENGTH),
            });
        }

        if !tag
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(Error::InvalidConfig {
                message: "Tag can only contain alphanumeric, dot, dash, and underscore"
                    .to_string(),
            });
        }

        if tag == "." || tag == ".." {
            return Err(Error::InvalidConfig {
                message: format!("Tag cannot be {tag:?}"),
            });
        }

        Ok(())
    }

    /// Get the tag as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<InstanceId> for Tag {
    fn from(id: InstanceId) -> Self {
        // Generated identifiers are always valid tags
        Self(id.0)
    }
}

/// Random identifier naming a rootfs directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Generate a fresh identifier of [`INSTANCE_ID_LEN`] characters from `[a-z0-9]`
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..INSTANCE_ID_LEN)
            .map(|_| char::from(INSTANCE_ID_CHARSET[rng.random_range(0..INSTANCE_ID_CHARSET.len())]))
            .collect();
        Self(id)
    }

    /// Get the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An extracted root filesystem on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstance {
    id: InstanceId,
    path: PathBuf,
}

impl ContainerInstance {
    /// Wrap an identifier and the absolute path of its directory
    #[must_use]
    pub const fn new(id: InstanceId, path: PathBuf) -> Self {
        Self { id, path }
    }

    /// Generated identifier
    #[must_use]
    pub const fn id(&self) -> &InstanceId {
        &self.id
    }

    /// Absolute path of the rootfs directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume into the path
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Get the current process ID
    #[must_use]
    pub fn current() -> Self {
        #[allow(clippy::cast_possible_wrap)]
        Self(std::process::id() as i32)
    }

    /// Convert to `nix::unistd::Pid`
    #[must_use]
    pub const fn as_nix_pid(self) -> nix::unistd::Pid {
        nix::unistd::Pid::from_raw(self.0)
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<nix::unistd::Pid> for ProcessId {
    fn from(pid: nix::unistd::Pid) -> Self {
        Self(pid.as_raw())
    }
}

impl From<ProcessId> for nix::unistd::Pid {
    fn from(pid: ProcessId) -> Self {
        Self::from_raw(pid.0)
    }
}
