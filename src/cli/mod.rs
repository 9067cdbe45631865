//! CLI module for audiotracer
//!
//! Argument parsing and the commands that relay user intents to the daemon.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConfigCommand, DaemonCommand};
