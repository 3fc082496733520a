//! Durable tag → rootfs registry
//!
//! The registry is a single JSON object in `tags.json`, mapping tag names to
//! absolute rootfs paths. Every [`Registry`] value holds an exclusive lock on
//! `tags.json.lock` for its whole lifetime, so concurrent invocations
//! serialize their read-modify-write cycles instead of losing updates.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod lock;
pub mod registry;

pub use lock::RegistryLock;
pub use registry::{Registry, RemovalReport};
