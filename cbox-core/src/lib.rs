//! cbox Core - Foundation types, configuration, and events
//!
//! This crate provides the core abstractions shared by every cbox crate.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod resources;
pub mod types;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use events::ContainerEvent;
pub use resources::PidsLimit;
pub use types::{ContainerInstance, InstanceId, ProcessId, Tag};
