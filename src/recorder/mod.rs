//! Recording session module for audiotracer
//!
//! The state machine that owns the capture resource, plus the liveness
//! probe used when its owning process is not reachable.

mod machine;
mod probe;
mod state;

pub use machine::Recorder;
pub use probe::{probe_liveness, process_alive, Evidence, Liveness};
pub use state::{
    RecordingStatus, Session, SessionState, SessionStatus, StopSummary, Transition,
};

use std::path::PathBuf;
use thiserror::Error;

use crate::permissions::Permission;

/// Why a session command was refused or failed
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Missing permissions: {}", format_permissions(.0))]
    PermissionsMissing(Vec<Permission>),

    #[error("Recordings directory unavailable: {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start capture: {0}")]
    CaptureStart(String),

    #[error("Failed to pause: {0}")]
    Pause(String),

    #[error("Failed to resume: {0}")]
    Resume(String),
}

fn format_permissions(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
