//! Storage module for audiotracer
//!
//! Resolves the per-day recording file, reports free space and lists
//! recordings. Also owns the on-disk session marker.

mod marker;
mod models;
mod provider;

pub use marker::SessionMarker;
pub use models::{
    estimate_time_remaining, format_mm_ss, RecordingFile, StorageSnapshot, AUDIO_EXTENSIONS,
};
pub use provider::{StorageProvider, MARKER_FILE_NAME, RECORDING_EXTENSION};
