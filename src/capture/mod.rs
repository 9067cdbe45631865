//! Audio capture module for audiotracer
//!
//! The recorder drives an opaque capture resource through
//! prepare/start/pause/resume/stop/release. The shipped backend runs
//! ffmpeg as a child process.

mod ffmpeg;

pub use ffmpeg::{FfmpegCapture, FfmpegFactory};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Settings;

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Mpeg4,
}

impl OutputFormat {
    /// File extension of a recording in this container
    pub const fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mpeg4 => "m4a",
        }
    }
}

/// Audio encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoder {
    Aac,
}

/// Everything a capture resource needs to know before it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub output_path: PathBuf,
    pub format: OutputFormat,
    pub encoder: AudioEncoder,
    pub bitrate: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Encoding parameters shared by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    pub bitrate: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Encoding {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bitrate: settings.audio.bitrate,
            sample_rate: settings.audio.sample_rate,
            channels: settings.audio.channels,
        }
    }

    pub fn config_for(&self, output_path: PathBuf) -> CaptureConfig {
        CaptureConfig {
            output_path,
            format: OutputFormat::Mpeg4,
            encoder: AudioEncoder::Aac,
            bitrate: self.bitrate,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// A microphone-to-file encoding session
pub trait CaptureResource: Send {
    /// Configure output path and encoding
    fn prepare(&mut self, config: &CaptureConfig) -> Result<()>;

    /// Begin capturing
    fn start(&mut self) -> Result<()>;

    /// Suspend capture without closing the output
    fn pause(&mut self) -> Result<()>;

    /// Continue a paused capture into the same output
    fn resume(&mut self) -> Result<()>;

    /// Stop capturing and finalize the file
    fn stop(&mut self) -> Result<()>;

    /// Free the underlying handle. Safe to call in any state, more than once.
    fn release(&mut self);

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Hands out fresh capture resources
pub trait CaptureFactory: Send + Sync {
    fn acquire(&self) -> Result<Box<dyn CaptureResource>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_fixed_format_and_encoder() {
        let encoding = Encoding::from_settings(&Settings::default());
        let config = encoding.config_for(PathBuf::from("/tmp/2024-01-01.m4a"));
        assert_eq!(config.format, OutputFormat::Mpeg4);
        assert_eq!(config.encoder, AudioEncoder::Aac);
        assert_eq!(config.bitrate, 128_000);
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.channels, 1);
        assert_eq!(config.format.extension(), "m4a");
    }
}
