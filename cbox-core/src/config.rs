//! Runtime configuration
//!
//! The work directory holds the cached base image, the registry, and one
//! directory per container instance.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::constants::{
    BASE_IMAGE_URL, ENV_HOME, ENV_IMAGE_URL, IMAGE_FILE_NAME, REGISTRY_FILE_NAME, WORKDIR_NAME,
};
use crate::{Error, InstanceId, PidsLimit, Result};

/// Paths and defaults shared by every command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Work directory, `~/.cbox` by default
    pub workdir: PathBuf,

    /// Where the base image is fetched from
    pub image_url: String,

    /// Process ceiling applied by the cgroup confiner
    pub max_pids: PidsLimit,
}

impl RuntimeConfig {
    /// Configuration rooted at `workdir` with default image and limits
    #[must_use]
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            image_url: BASE_IMAGE_URL.to_string(),
            max_pids: PidsLimit::default(),
        }
    }

    /// Resolve from the environment
    ///
    /// `CBOX_HOME` wins over `$HOME/.cbox`; `CBOX_IMAGE_URL` overrides the
    /// base image source.
    ///
    /// # Errors
    /// Returns error if neither `CBOX_HOME` nor `HOME` is set
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var_os(ENV_HOME),
            std::env::var_os("HOME"),
            std::env::var(ENV_IMAGE_URL).ok(),
        )
    }

    fn from_vars(
        cbox_home: Option<OsString>,
        home: Option<OsString>,
        image_url: Option<String>,
    ) -> Result<Self> {
        let workdir = match (cbox_home, home) {
            (Some(dir), _) if !dir.is_empty() => PathBuf::from(dir),
            (_, Some(home)) if !home.is_empty() => PathBuf::from(home).join(WORKDIR_NAME),
            _ => {
                return Err(Error::InvalidConfig {
                    message: format!("cannot locate work directory: set {ENV_HOME} or HOME"),
                });
            }
        };

        let workdir = std::path::absolute(&workdir)?;

        let mut config = Self::with_workdir(workdir);
        if let Some(url) = image_url.filter(|url| !url.is_empty()) {
            config.image_url = url;
        }

        tracing::debug!(workdir = %config.workdir.display(), image_url = %config.image_url, "Resolved configuration");
        Ok(config)
    }

    /// Cached base image tarball
    #[must_use]
    pub fn image_path(&self) -> PathBuf {
        self.workdir.join(IMAGE_FILE_NAME)
    }

    /// Registry file
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.workdir.join(REGISTRY_FILE_NAME)
    }

    /// Lock file guarding the registry
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.workdir.join(format!("{REGISTRY_FILE_NAME}.lock"))
    }

    /// Directory for an instance
    #[must_use]
    pub fn instance_path(&self, id: &InstanceId) -> PathBuf {
        self.workdir.join(id.as_str())
    }

    /// Work directory
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cbox_home_wins() {
        let config =
            RuntimeConfig::from_vars(Some("/srv/cbox".into()), Some("/home/op".into()), None)
                .unwrap();
        assert_eq!(config.workdir, PathBuf::from("/srv/cbox"));
        assert_eq!(config.image_url, BASE_IMAGE_URL);
    }

    #[test]
    fn test_home_fallback() {
        let config = RuntimeConfig::from_vars(None, Some("/home/op".into()), None).unwrap();
        assert_eq!(config.workdir, PathBuf::from("/home/op/.cbox"));
        assert_eq!(config.registry_path(), PathBuf::from("/home/op/.cbox/tags.json"));
        assert_eq!(
            config.image_path(),
            PathBuf::from("/home/op/.cbox/ubuntu16fs.tar.gz")
        );
    }

    #[test]
    fn test_missing_home() {
        assert!(RuntimeConfig::from_vars(None, None, None).is_err());
        assert!(RuntimeConfig::from_vars(Some("".into()), Some("".into()), None).is_err());
    }

    #[test]
    fn test_image_url_override() {
        let config = RuntimeConfig::from_vars(
            Some("/tmp/x".into()),
            None,
            Some("http://mirror.local/base.tar.gz".to_string()),
        )
        .unwrap();
        assert_eq!(config.image_url, "http://mirror.local/base.tar.gz");
    }

    #[test]
    fn test_instance_path() {
        let config = RuntimeConfig::with_workdir("/w");
        let id = InstanceId::generate();
        assert_eq!(config.instance_path(&id), PathBuf::from("/w").join(id.as_str()));
        assert_eq!(config.lock_path(), PathBuf::from("/w/tags.json.lock"));
    }
}
