//! Base image download

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use cbox_core::{Error, Result};
use tracing::{debug, info};

/// Downloads a URL to a local file
pub trait Fetcher {
    /// Fetch `url` into `dest`
    ///
    /// On success `dest` holds the complete payload. On failure `dest` must
    /// not exist, since its presence is what marks the cache as populated.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Plain HTTP(S) fetcher backed by a blocking `reqwest` client
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl HttpFetcher {
    /// Create a new fetcher
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let fetch_err = |message: String| Error::Fetch {
            url: url.to_string(),
            message,
        };

        info!(url, dest = %dest.display(), "Downloading base image");

        let mut response = reqwest::blocking::get(url)
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| fetch_err(e.to_string()))?;

        let partial = partial_path(dest);
        let mut file = File::create(&partial).map_err(|e| fetch_err(format!("create {}: {e}", partial.display())))?;

        let written = match response.copy_to(&mut file) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(fetch_err(e.to_string()));
            }
        };

        if let Err(e) = file.flush().and_then(|()| file.sync_all()) {
            let _ = fs::remove_file(&partial);
            return Err(fetch_err(format!("flush {}: {e}", partial.display())));
        }
        drop(file);

        fs::rename(&partial, dest).map_err(|e| fetch_err(format!("rename into {}: {e}", dest.display())))?;

        debug!(bytes = written, dest = %dest.display(), "Base image downloaded");
        Ok(())
    }
}

/// Sibling path the download streams into before it is renamed
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
