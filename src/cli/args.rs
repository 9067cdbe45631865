//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// audiotracer - Daily microphone recorder
#[derive(Parser, Debug)]
#[command(name = "audiotracer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start recording to today's file
    Start,

    /// Pause the current recording
    Pause,

    /// Resume a paused recording
    Resume,

    /// Stop the current recording
    Stop,

    /// Show current recording status
    Status,

    /// Show free storage and estimated recording time left
    Storage,

    /// List recordings, newest first
    List {
        /// Maximum number of recordings to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show which permissions are required and granted
    Permissions,

    /// Daemon management commands
    #[command(subcommand)]
    Daemon(DaemonCommand),

    /// Launch the interactive TUI
    Tui,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print a shell completion script
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Start the background daemon
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,
    },

    /// Stop the running daemon
    Stop,

    /// Restart the daemon
    Restart,

    /// Check daemon status
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
