//! Base image extraction
//!
//! Device nodes cannot be created without privileges, so every entry under
//! the archive's top-level `dev` directory is skipped.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};

use cbox_core::{Error, Result};
use tracing::{debug, trace};

/// Materializes an archive into a directory
pub trait Extractor {
    /// Extract `archive` into the existing directory `dest`
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Extracts plain or gzip-compressed tarballs
#[derive(Debug, Default, Clone, Copy)]
pub struct TarExtractor;

impl TarExtractor {
    /// Create a new extractor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn unpack<R: Read>(reader: R, dest: &Path) -> Result<()> {
        let mut archive = tar::Archive::new(reader);
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);
        archive.set_overwrite(true);

        let mut unpacked = 0usize;
        let mut skipped = 0usize;

        for entry in archive.entries().map_err(provision_err)? {
            let mut entry = entry.map_err(provision_err)?;
            let path = entry.path().map_err(provision_err)?.into_owned();

            if is_device_dir(&path) {
                trace!(entry = %path.display(), "Skipping device entry");
                skipped += 1;
                continue;
            }

            entry.unpack_in(dest).map_err(|e| Error::Provision {
                message: format!("unpack {}: {e}", path.display()),
            })?;
            unpacked += 1;
        }

        debug!(unpacked, skipped, dest = %dest.display(), "Archive extracted");
        Ok(())
    }
}

impl Extractor for TarExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!(archive = %archive.display(), dest = %dest.display(), "Extracting archive");

        let file = File::open(archive).map_err(|e| Error::Provision {
            message: format!("open {}: {e}", archive.display()),
        })?;

        if is_gzip_archive(archive) {
            Self::unpack(flate2::read::GzDecoder::new(file), dest)
        } else {
            Self::unpack(file, dest)
        }
    }
}

fn provision_err(e: std::io::Error) -> Error {
    Error::Provision {
        message: format!("read archive: {e}"),
    }
}

/// Whether the entry lives under the top-level `dev` directory
fn is_device_dir(path: &Path) -> bool {
    path.components()
        .find(|c| matches!(c, Component::Normal(_)))
        .is_some_and(|c| c.as_os_str() == "dev")
}

/// Determines whether the archive is gzip-compressed based on extension.
fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_device_dir_matches_top_level_only() {
        assert!(is_device_dir(Path::new("dev")));
        assert!(is_device_dir(Path::new("./dev/null")));
        assert!(is_device_dir(Path::new("dev/pts/")));
        assert!(!is_device_dir(Path::new("usr/dev/thing")));
        assert!(!is_device_dir(Path::new("./devices")));
        assert!(!is_device_dir(Path::new("bin/sh")));
    }

    #[test]
    fn is_gzip_archive_detects_extensions() {
        assert!(is_gzip_archive(Path::new("ubuntu16fs.tar.gz")));
        assert!(is_gzip_archive(Path::new("layer.tgz")));
        assert!(!is_gzip_archive(Path::new("layer.tar")));
    }

    #[test]
    fn extract_missing_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = TarExtractor::new().extract(&dir.path().join("missing.tar"), dir.path());
        assert!(matches!(result, Err(Error::Provision { .. })));
    }
}
