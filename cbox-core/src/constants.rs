//! Well-known names and defaults

/// Base filesystem tarball fetched on first use
pub const BASE_IMAGE_URL: &str = "http://cdimage.ubuntu.com/ubuntu-base/releases/16.04/release/ubuntu-base-16.04.6-base-amd64.tar.gz";

/// File name of the cached base image inside the work directory
pub const IMAGE_FILE_NAME: &str = "ubuntu16fs.tar.gz";

/// File name of the registry inside the work directory
pub const REGISTRY_FILE_NAME: &str = "tags.json";

/// Directory under `$HOME` used when `CBOX_HOME` is not set
pub const WORKDIR_NAME: &str = ".cbox";

/// Overrides the work directory
pub const ENV_HOME: &str = "CBOX_HOME";

/// Overrides the base image URL
pub const ENV_IMAGE_URL: &str = "CBOX_IMAGE_URL";

/// Hostname set inside every container
pub const CONTAINER_HOSTNAME: &str = "container";

/// Length of a generated instance identifier
pub const INSTANCE_ID_LEN: usize = 8;

/// Alphabet for generated instance identifiers
pub const INSTANCE_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Hidden sub-command the runtime re-executes itself with
pub const CHILD_SUBCOMMAND: &str = "child";

/// Path the launcher re-executes
pub const SELF_EXE: &str = "/proc/self/exe";

/// Default ceiling for the pids controller
pub const DEFAULT_MAX_PIDS: u32 = 20;
