//! Data models for storage

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extensions recognised as recordings when listing the directory
pub const AUDIO_EXTENSIONS: [&str; 3] = ["m4a", "mp3", "wav"];

/// Free space and how much recording time it buys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    /// Free bytes on the volume backing the recordings directory
    pub free_bytes: u64,

    /// Estimated recording time left, `MM:SS`
    pub time_remaining: String,
}

impl StorageSnapshot {
    pub fn new(free_bytes: u64, bitrate: u32) -> Self {
        Self {
            free_bytes,
            time_remaining: estimate_time_remaining(free_bytes, bitrate),
        }
    }

    /// Free bytes with thousands separators, e.g. `1,600,000`
    pub fn formatted_bytes(&self) -> String {
        group_thousands(self.free_bytes)
    }
}

impl Default for StorageSnapshot {
    fn default() -> Self {
        Self {
            free_bytes: 0,
            time_remaining: format_mm_ss(0),
        }
    }
}

/// A recording file found in the recordings directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
}

impl RecordingFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Format whole seconds as `MM:SS`; minutes keep counting past 59.
pub fn format_mm_ss(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Recording time that `free_bytes` holds at `bitrate` bits per second
pub fn estimate_time_remaining(free_bytes: u64, bitrate: u32) -> String {
    let bytes_per_sec = u64::from(bitrate / 8);
    if bytes_per_sec == 0 {
        return format_mm_ss(0);
    }
    format_mm_ss(free_bytes / bytes_per_sec)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
