//! Application settings management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::permissions::{ConfiguredGrants, Permission, PermissionGate};
use crate::platform::PlatformLevel;

/// Environment variable that overrides the recordings directory
pub const RECORDINGS_DIR_ENV: &str = "AUDIOTRACER_RECORDINGS_DIR";

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,

    /// Capture encoding and backend settings
    #[serde(default)]
    pub audio: AudioSettings,

    /// Platform capability level and permission grants
    #[serde(default)]
    pub platform: PlatformSettings,

    /// Recordings directory and refresh timing
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Data directory for recordings
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// AAC bitrate in bits per second
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,

    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// ffmpeg binary used for capture
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// ffmpeg input format (pulse, alsa, avfoundation, ...)
    #[serde(default = "default_input_format")]
    pub input_format: String,

    /// ffmpeg input device
    #[serde(default = "default_input_device")]
    pub input_device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Capability level used for pause support and permission sets
    #[serde(default)]
    pub level: PlatformLevel,

    /// Permissions the user has granted
    #[serde(default = "default_granted")]
    pub granted: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Recordings directory (defaults to `<data_dir>/AudioTracer`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordings_dir: Option<PathBuf>,

    /// Seconds between free-space refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// A daily file written to within this many seconds counts as live
    #[serde(default = "default_liveness_window")]
    pub liveness_window_secs: u64,
}

// Default value functions

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "audiotracer", "audiotracer")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.local/share/audiotracer"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bitrate() -> u32 {
    128_000
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_channels() -> u16 {
    1
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_input_format() -> String {
    if cfg!(target_os = "macos") {
        "avfoundation".to_string()
    } else {
        "pulse".to_string()
    }
}

fn default_input_device() -> String {
    if cfg!(target_os = "macos") {
        ":0".to_string()
    } else {
        "default".to_string()
    }
}

fn default_granted() -> Vec<Permission> {
    Permission::all().to_vec()
}

fn default_refresh_interval() -> u64 {
    5
}

fn default_liveness_window() -> u64 {
    60
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            bitrate: default_bitrate(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            ffmpeg_path: default_ffmpeg_path(),
            input_format: default_input_format(),
            input_device: default_input_device(),
        }
    }
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            level: PlatformLevel::default(),
            granted: default_granted(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            recordings_dir: None,
            refresh_interval_secs: default_refresh_interval(),
            liveness_window_secs: default_liveness_window(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            audio: AudioSettings::default(),
            platform: PlatformSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::debug!("No config file found, using defaults");
            let mut settings = Self::default();
            settings.apply_env_overrides();
            return Ok(settings);
        }

        let mut settings = Self::load_from(&config_path)?;
        settings.apply_env_overrides();

        Ok(settings)
    }

    /// Parse settings from a specific file, without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(RECORDINGS_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.storage.recordings_dir = Some(PathBuf::from(dir));
            }
        }
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "audiotracer", "audiotracer")
            .context("Could not determine config directory")?;

        let config_dir = dirs.config_dir();
        Ok(config_dir.join("config.toml"))
    }

    /// Write default configuration to a file
    pub fn write_default(path: &Path) -> Result<()> {
        let settings = Self::default();
        let content = toml::to_string_pretty(&settings)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding the daily recordings
    pub fn recordings_dir(&self) -> PathBuf {
        self.storage
            .recordings_dir
            .clone()
            .unwrap_or_else(|| self.general.data_dir.join("AudioTracer"))
    }

    /// Get the Unix socket path for IPC
    pub fn socket_path(&self) -> PathBuf {
        runtime_dir().join("audiotracer.sock")
    }

    /// Get the PID file path
    pub fn pid_path(&self) -> PathBuf {
        runtime_dir().join("audiotracer.pid")
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.storage.refresh_interval_secs.max(1))
    }

    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.storage.liveness_window_secs)
    }

    /// Permission gate for the configured platform level and grants
    pub fn permission_gate(&self) -> PermissionGate {
        PermissionGate::new(
            self.platform.level,
            Box::new(ConfiguredGrants::new(self.platform.granted.iter().copied())),
        )
    }
}

fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
