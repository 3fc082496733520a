//! Error types for cbox

use std::path::PathBuf;

use thiserror::Error;

/// cbox error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Base image download failed
    #[error("Failed to fetch {url}: {message}")]
    Fetch {
        /// Source URL
        url: String,
        /// Error message
        message: String,
    },

    /// Rootfs directory creation or extraction failed
    #[error("Provisioning error: {message}")]
    Provision {
        /// Error message
        message: String,
    },

    /// Tag is already registered
    #[error("Tag already exists: {tag}")]
    TagExists {
        /// Offending tag
        tag: String,
    },

    /// No container registered under the tag
    #[error("The container with the name {tag} does not exist.")]
    ContainerNotFound {
        /// Requested tag
        tag: String,
    },

    /// Registry file is malformed or unreadable
    #[error("Registry error at {}: {message}", path.display())]
    Registry {
        /// Registry file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Entering or leaving a chroot failed
    #[error("Chroot error: {message}")]
    Chroot {
        /// Error message
        message: String,
    },

    /// Mounting or unmounting failed
    #[error("Mount error: {message}")]
    Mount {
        /// Error message
        message: String,
    },

    /// Cloning the namespaced child failed
    #[error("Launch error: {message}")]
    Launch {
        /// Error message
        message: String,
    },

    /// `CGroup` filesystem write failed
    #[error("Confinement error: {message}")]
    Confinement {
        /// Error message
        message: String,
    },

    /// Namespace operation failed
    #[error("Namespace error: {message}")]
    Namespace {
        /// Error message
        message: String,
    },

    /// Permission denied
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// System error from nix
    #[error("System error: {0}")]
    System(#[from] nix::Error),
}

/// Result type alias for cbox operations
pub type Result<T> = std::result::Result<T, Error>;
