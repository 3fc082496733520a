//! Rootfs provisioning

use std::fs;
use std::io::ErrorKind;

use cbox_core::{ContainerEvent, ContainerInstance, Error, InstanceId, Result};
use tracing::{debug, warn};

use crate::cache::BaseImageCache;
use crate::extract::{Extractor, TarExtractor};
use crate::fetch::{Fetcher, HttpFetcher};

/// Attempts at finding an unused identifier before giving up
const MAX_ID_ATTEMPTS: usize = 16;

/// Creates fresh root filesystems from the cached base image
#[derive(Debug, Clone)]
pub struct Provisioner<F = HttpFetcher, E = TarExtractor> {
    cache: BaseImageCache<F>,
    extractor: E,
}

impl<F: Fetcher> Provisioner<F, TarExtractor> {
    /// Provisioner extracting with tar
    #[must_use]
    pub const fn new(cache: BaseImageCache<F>) -> Self {
        Self::with_extractor(cache, TarExtractor::new())
    }
}

impl<F: Fetcher, E: Extractor> Provisioner<F, E> {
    /// Provisioner with a custom extractor
    #[must_use]
    pub const fn with_extractor(cache: BaseImageCache<F>, extractor: E) -> Self {
        Self { cache, extractor }
    }

    /// Base image cache used by this provisioner
    #[must_use]
    pub const fn cache(&self) -> &BaseImageCache<F> {
        &self.cache
    }

    /// Materialize a new container instance
    ///
    /// This will:
    /// 1. Ensure the base image is cached
    /// 2. Claim a directory named by a fresh random identifier
    /// 3. Extract the base image into it, without `dev`
    ///
    /// A directory whose extraction failed is removed again.
    pub fn materialize(&self) -> Result<ContainerInstance> {
        let image = self.cache.ensure_cached()?;
        let instance = self.claim_directory()?;

        if let Err(e) = self.extractor.extract(&image, instance.path()) {
            if let Err(cleanup) = fs::remove_dir_all(instance.path()) {
                warn!(
                    path = %instance.path().display(),
                    error = %cleanup,
                    "Failed to remove partially extracted rootfs"
                );
            }
            return Err(e);
        }

        ContainerEvent::provisioned(instance.id().clone(), instance.path().to_path_buf())
            .emit_trace();
        Ok(instance)
    }

    /// Create an empty instance directory under a not yet used identifier
    fn claim_directory(&self) -> Result<ContainerInstance> {
        let config = self.cache.config();

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = InstanceId::generate();
            let path = config.instance_path(&id);

            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!(container_id = %id, path = %path.display(), "Created rootfs directory");
                    return Ok(ContainerInstance::new(id, path));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(container_id = %id, "Identifier already in use, retrying");
                }
                Err(e) => {
                    return Err(Error::Provision {
                        message: format!("create {}: {e}", path.display()),
                    });
                }
            }
        }

        Err(Error::Provision {
            message: format!("no free identifier after {MAX_ID_ATTEMPTS} attempts"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbox_core::RuntimeConfig;
    use std::path::Path;

    struct StubFetcher;

    impl Fetcher for StubFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<()> {
            fs::write(dest, b"stub")?;
            Ok(())
        }
    }

    struct FailingExtractor;

    impl Extractor for FailingExtractor {
        fn extract(&self, _archive: &Path, _dest: &Path) -> Result<()> {
            Err(Error::Provision {
                message: "corrupt archive".to_string(),
            })
        }
    }

    struct TouchExtractor;

    impl Extractor for TouchExtractor {
        fn extract(&self, _archive: &Path, dest: &Path) -> Result<()> {
            fs::create_dir(dest.join("bin"))?;
            Ok(())
        }
    }

    fn cache(dir: &Path) -> BaseImageCache<StubFetcher> {
        BaseImageCache::with_fetcher(RuntimeConfig::with_workdir(dir), StubFetcher)
    }

    #[test]
    fn test_materialize_creates_instance_dir() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::with_extractor(cache(dir.path()), TouchExtractor);

        let instance = provisioner.materialize().unwrap();

        assert!(instance.path().is_absolute());
        assert_eq!(instance.path().parent(), Some(dir.path()));
        assert_eq!(
            instance.path().file_name().and_then(|n| n.to_str()),
            Some(instance.id().as_str())
        );
        assert!(instance.path().join("bin").is_dir());
    }

    #[test]
    fn test_instances_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::with_extractor(cache(dir.path()), TouchExtractor);

        let a = provisioner.materialize().unwrap();
        let b = provisioner.materialize().unwrap();

        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_failed_extraction_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::with_extractor(cache(dir.path()), FailingExtractor);

        assert!(matches!(
            provisioner.materialize(),
            Err(Error::Provision { .. })
        ));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_dir())
            .collect();
        assert!(leftovers.is_empty());
    }
}
