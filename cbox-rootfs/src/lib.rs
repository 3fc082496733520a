//! Root filesystem provisioning
//!
//! This crate owns the on-disk side of a container:
//! - [`BaseImageCache`] - fetches the shared base tarball at most once
//! - [`Provisioner`] - extracts a fresh, independent rootfs per instance
//!
//! Download and extraction sit behind the [`Fetcher`] and [`Extractor`]
//! traits so tests can run without network access.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod cache;
pub mod extract;
pub mod fetch;
pub mod provision;

pub use cache::BaseImageCache;
pub use extract::{Extractor, TarExtractor};
pub use fetch::{Fetcher, HttpFetcher};
pub use provision::Provisioner;
