//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cbox")]
#[command(about = "Minimal single-host container runtime", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command in a throwaway container
    Run {
        /// Command to run, followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Create a persistent container
    Create {
        /// Tag to register the container under (defaults to its id)
        tag: Option<String>,
    },

    /// Run a command in an existing container
    Start {
        /// Tag of the container
        tag: String,

        /// Command to run, followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Delete containers
    Delete {
        /// Tags to delete
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// List all containers
    List,

    /// Container session inside fresh namespaces (internal)
    #[command(hide = true)]
    Child {
        /// Delete the rootfs afterwards
        #[arg(long)]
        ephemeral: bool,

        /// Caller holds host root
        #[arg(long)]
        privileged: bool,

        /// Rootfs to enter
        rootfs: PathBuf,

        /// Command to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_keeps_command_flags() {
        let cli = Cli::try_parse_from(["cbox", "run", "ls", "-la", "/"]).unwrap();

        match cli.command {
            Commands::Run { command } => assert_eq!(command, vec!["ls", "-la", "/"]),
            _ => panic!("expected run"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_start_parses_tag_and_command() {
        let cli = Cli::try_parse_from(["cbox", "-v", "start", "mybox", "echo", "hi"]).unwrap();

        match cli.command {
            Commands::Start { tag, command } => {
                assert_eq!(tag, "mybox");
                assert_eq!(command, vec!["echo", "hi"]);
            }
            _ => panic!("expected start"),
        }
        assert!(cli.verbose);
    }

    #[test]
    fn test_child_command_line() {
        let cli = Cli::try_parse_from([
            "cbox",
            "--verbose",
            "child",
            "--ephemeral",
            "/tmp/rootfs",
            "--",
            "sh",
            "-c",
            "exit 2",
        ])
        .unwrap();

        match cli.command {
            Commands::Child {
                ephemeral,
                privileged,
                rootfs,
                command,
            } => {
                assert!(ephemeral);
                assert!(!privileged);
                assert_eq!(rootfs, PathBuf::from("/tmp/rootfs"));
                assert_eq!(command, vec!["sh", "-c", "exit 2"]);
            }
            _ => panic!("expected child"),
        }
        assert!(cli.verbose);
    }

    #[test]
    fn test_delete_requires_tag() {
        assert!(Cli::try_parse_from(["cbox", "delete"]).is_err());
    }
}
