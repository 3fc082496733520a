//! Container lifecycle events with structured tracing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::{InstanceId, Tag};

/// Events emitted during container lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainerEvent {
    /// Rootfs extracted
    Provisioned {
        /// Instance identifier
        id: InstanceId,
        /// Rootfs directory
        path: PathBuf,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Instance registered under a tag
    Registered {
        /// Tag
        tag: Tag,
        /// Rootfs directory
        path: PathBuf,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Command launched inside a rootfs
    Started {
        /// Rootfs directory
        path: PathBuf,
        /// Command and arguments
        command: Vec<String>,
        /// Whether the rootfs is deleted afterwards
        ephemeral: bool,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Contained command finished
    Exited {
        /// Rootfs directory
        path: PathBuf,
        /// Exit code
        exit_code: i32,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Rootfs deleted
    Removed {
        /// Rootfs directory
        path: PathBuf,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },
}

impl ContainerEvent {
    /// Build a `Provisioned` event stamped now
    #[must_use]
    pub fn provisioned(id: InstanceId, path: PathBuf) -> Self {
        Self::Provisioned {
            id,
            path,
            timestamp: SystemTime::now(),
        }
    }

    /// Build a `Registered` event stamped now
    #[must_use]
    pub fn registered(tag: Tag, path: PathBuf) -> Self {
        Self::Registered {
            tag,
            path,
            timestamp: SystemTime::now(),
        }
    }

    /// Build a `Started` event stamped now
    #[must_use]
    pub fn started(path: PathBuf, command: Vec<String>, ephemeral: bool) -> Self {
        Self::Started {
            path,
            command,
            ephemeral,
            timestamp: SystemTime::now(),
        }
    }

    /// Build an `Exited` event stamped now
    #[must_use]
    pub fn exited(path: PathBuf, exit_code: i32) -> Self {
        Self::Exited {
            path,
            exit_code,
            timestamp: SystemTime::now(),
        }
    }

    /// Build a `Removed` event stamped now
    #[must_use]
    pub fn removed(path: PathBuf) -> Self {
        Self::Removed {
            path,
            timestamp: SystemTime::now(),
        }
    }

    /// Get the timestamp from any event
    #[must_use]
    pub const fn timestamp(&self) -> SystemTime {
        match self {
            Self::Provisioned { timestamp, .. }
            | Self::Registered { timestamp, .. }
            | Self::Started { timestamp, .. }
            | Self::Exited { timestamp, .. }
            | Self::Removed { timestamp, .. } => *timestamp,
        }
    }

    /// Emit structured tracing event
    pub fn emit_trace(&self) {
        match self {
            Self::Provisioned { id, path, .. } => {
                tracing::info!(
                    container_id = %id,
                    path = %path.display(),
                    event = "provisioned",
                    "Rootfs provisioned"
                );
            }
            Self::Registered { tag, path, .. } => {
                tracing::info!(
                    tag = %tag,
                    path = %path.display(),
                    event = "registered",
                    "Container registered"
                );
            }
            Self::Started {
                path,
                command,
                ephemeral,
                ..
            } => {
                tracing::info!(
                    path = %path.display(),
                    command = ?command,
                    ephemeral,
                    event = "started",
                    "Container started"
                );
            }
            Self::Exited {
                path, exit_code, ..
            } => {
                if *exit_code == 0 {
                    tracing::info!(
                        path = %path.display(),
                        exit_code,
                        event = "exited",
                        "Container exited"
                    );
                } else {
                    tracing::warn!(
                        path = %path.display(),
                        exit_code,
                        event = "exited",
                        "Container exited with failure"
                    );
                }
            }
            Self::Removed { path, .. } => {
                tracing::info!(
                    path = %path.display(),
                    event = "removed",
                    "Rootfs removed"
                );
            }
        }
    }
}

impl fmt::Display for ContainerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisioned { id, .. } => write!(f, "Container {id} provisioned"),
            Self::Registered { tag, .. } => write!(f, "Container registered as {tag}"),
            Self::Started { path, .. } => write!(f, "Container {} started", path.display()),
            Self::Exited {
                path, exit_code, ..
            } => {
                write!(f, "Container {} exited with code {exit_code}", path.display())
            }
            Self::Removed { path, .. } => write!(f, "Container {} removed", path.display()),
        }
    }
}

// Custom SystemTime serialization
mod systemtime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(since_epoch.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}
