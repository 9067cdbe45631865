//! Configuration module for audiotracer
//!
//! Handles loading and managing application settings from TOML files.

mod settings;

pub use settings::{
    AudioSettings, GeneralSettings, PlatformSettings, Settings, StorageSettings,
    RECORDINGS_DIR_ENV,
};
