//! audiotracer - A daily microphone recorder driven by a background session daemon
//!
//! One audio file per calendar day, a pause/resume capable recording session,
//! and free-storage reporting for the CLI and TUI.

pub mod capture;
pub mod cli;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod notification;
pub mod permissions;
pub mod platform;
pub mod recorder;
pub mod status;
pub mod storage;
pub mod tui;

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum TracerError {
    #[error("Session marker {}: {source}", .path.display())]
    Marker {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TracerError>;

/// Title shown on the recording notification
pub const NOTIFICATION_TITLE: &str = "AudioTracer";
