//! Base image cache
//!
//! Presence of the tarball on disk is the only signal that it was fetched;
//! there is no checksum.

use std::fs;
use std::path::PathBuf;

use cbox_core::{Error, Result, RuntimeConfig};
use tracing::debug;

use crate::fetch::{Fetcher, HttpFetcher};

/// Ensures the shared base filesystem tarball exists
#[derive(Debug, Clone)]
pub struct BaseImageCache<F = HttpFetcher> {
    config: RuntimeConfig,
    fetcher: F,
}

impl BaseImageCache<HttpFetcher> {
    /// Cache backed by the HTTP fetcher
    #[must_use]
    pub const fn new(config: RuntimeConfig) -> Self {
        Self::with_fetcher(config, HttpFetcher::new())
    }
}

impl<F: Fetcher> BaseImageCache<F> {
    /// Cache backed by a custom fetcher
    #[must_use]
    pub const fn with_fetcher(config: RuntimeConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Path of the cached tarball
    #[must_use]
    pub fn image_path(&self) -> PathBuf {
        self.config.image_path()
    }

    /// Configuration this cache was built from
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create the work directory and fetch the image unless already present
    ///
    /// Returns the path of the cached tarball.
    pub fn ensure_cached(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.workdir).map_err(|e| Error::Fetch {
            url: self.config.image_url.clone(),
            message: format!("create {}: {e}", self.config.workdir.display()),
        })?;

        let image = self.image_path();
        if image.exists() {
            debug!(image = %image.display(), "Base image already cached");
            return Ok(image);
        }

        println!("Need to fetch the file-system image once");
        self.fetcher.fetch(&self.config.image_url, &image)?;
        Ok(image)
    }
}
