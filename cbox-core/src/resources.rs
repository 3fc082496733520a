//! Resource value objects

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::DEFAULT_MAX_PIDS;

/// Ceiling on concurrently live processes in a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct PidsLimit(u32);

impl PidsLimit {
    /// Create a limit of `max` processes
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self(max)
    }

    /// Get the raw ceiling
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for PidsLimit {
    fn default() -> Self {
        Self(DEFAULT_MAX_PIDS)
    }
}

/// Renders the value written to `pids.max`
impl fmt::Display for PidsLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
