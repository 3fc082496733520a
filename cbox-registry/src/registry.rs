//! Registry operations

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cbox_core::{ContainerEvent, ContainerInstance, Error, Result, RuntimeConfig, Tag};
use tracing::{debug, info, warn};

use crate::lock::RegistryLock;

/// Outcome of a batch removal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Tags whose rootfs and entry were removed
    pub removed: Vec<String>,
    /// Tags that were not registered
    pub not_found: Vec<String>,
}

/// Tag → rootfs mapping loaded from `tags.json`
///
/// Holds the registry lock until dropped. Mutations persist immediately.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    entries: BTreeMap<String, PathBuf>,
    _lock: RegistryLock,
}

impl Registry {
    /// Lock and load the registry of `config`
    ///
    /// Creates the work directory if needed. A missing `tags.json` is
    /// written as an empty object first.
    pub fn open(config: &RuntimeConfig) -> Result<Self> {
        fs::create_dir_all(config.workdir()).map_err(|e| Error::Registry {
            path: config.registry_path(),
            message: format!("create {}: {e}", config.workdir().display()),
        })?;

        let lock = RegistryLock::acquire(&config.lock_path())?;
        let path = config.registry_path();
        let entries = Self::load(&path)?;

        debug!(registry = %path.display(), entries = entries.len(), "Registry loaded");
        Ok(Self {
            path,
            entries,
            _lock: lock,
        })
    }

    /// Read the mapping stored at `path`, creating an empty one if absent
    ///
    /// Keys are taken as written. Only tags chosen through `create` go
    /// through [`Tag`] validation.
    pub fn load(path: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(registry = %path.display(), "Registry missing, creating empty one");
                let empty = BTreeMap::new();
                write_atomically(path, &empty)?;
                return Ok(empty);
            }
            Err(e) => {
                return Err(Error::Registry {
                    path: path.to_path_buf(),
                    message: format!("read: {e}"),
                });
            }
        };

        serde_json::from_slice(&data).map_err(|e| Error::Registry {
            path: path.to_path_buf(),
            message: format!("malformed registry: {e}"),
        })
    }

    /// Whether `tag` is registered
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Register `instance` under `tag`, or under its identifier when `None`
    ///
    /// Fails with [`Error::TagExists`] without writing anything when the
    /// tag is taken. Returns the tag used.
    pub fn register(&mut self, tag: Option<Tag>, instance: &ContainerInstance) -> Result<Tag> {
        let tag = tag.unwrap_or_else(|| Tag::from(instance.id().clone()));

        if self.entries.contains_key(tag.as_str()) {
            return Err(Error::TagExists {
                tag: tag.to_string(),
            });
        }

        self.entries
            .insert(tag.to_string(), instance.path().to_path_buf());
        self.persist()?;

        ContainerEvent::registered(tag.clone(), instance.path().to_path_buf()).emit_trace();
        Ok(tag)
    }

    /// Rootfs path registered under `tag`
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Path> {
        self.entries.get(tag).map(PathBuf::as_path)
    }

    /// Like [`Registry::get`], failing with [`Error::ContainerNotFound`]
    pub fn resolve(&self, tag: &str) -> Result<&Path> {
        self.get(tag).ok_or_else(|| Error::ContainerNotFound {
            tag: tag.to_string(),
        })
    }

    /// Delete the rootfs and entry of every registered tag in `tags`
    ///
    /// Unknown tags are reported and skipped. A rootfs that already vanished
    /// from disk still has its entry removed. Any other deletion failure
    /// stops the batch; entries removed up to that point are persisted
    /// before the error is returned.
    pub fn remove<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<RemovalReport> {
        let mut report = RemovalReport::default();
        self.remove_into(tags, &mut report)?;
        Ok(report)
    }

    /// Like [`Registry::remove`], recording progress in `report`
    ///
    /// On failure `report` still lists the tags handled before the error.
    pub fn remove_into<S: AsRef<str>>(
        &mut self,
        tags: &[S],
        report: &mut RemovalReport,
    ) -> Result<()> {
        let mut failure = None;

        for tag in tags {
            let tag = tag.as_ref();
            let Some(path) = self.entries.get(tag) else {
                debug!(tag, "Tag not registered");
                report.not_found.push(tag.to_string());
                continue;
            };

            match fs::remove_dir_all(path) {
                Ok(()) => ContainerEvent::removed(path.clone()).emit_trace(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(tag, path = %path.display(), "Rootfs already gone, dropping entry");
                }
                Err(e) => {
                    failure = Some(Error::Provision {
                        message: format!("remove {}: {e}", path.display()),
                    });
                    break;
                }
            }

            self.entries.remove(tag);
            report.removed.push(tag.to_string());
        }

        self.persist()?;

        match failure {
            Some(e) => Err(e),
            None => {
                info!(removed = report.removed.len(), not_found = report.not_found.len(), "Removal complete");
                Ok(())
            }
        }
    }

    /// All registered tags
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no container is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registry file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        write_atomically(&self.path, &self.entries)
    }
}

/// Write via a sibling temp file and rename over the target
fn write_atomically(path: &Path, entries: &BTreeMap<String, PathBuf>) -> Result<()> {
    let registry_err = |message: String| Error::Registry {
        path: path.to_path_buf(),
        message,
    };

    let encoded = serde_json::to_vec(entries).map_err(|e| registry_err(format!("encode: {e}")))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, encoded).map_err(|e| registry_err(format!("write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| registry_err(format!("rename {}: {e}", tmp.display())))?;

    Ok(())
}
