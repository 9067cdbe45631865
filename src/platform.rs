//! Platform capability lookup
//!
//! Behaviour that depends on the host platform version (pause support,
//! which permissions must be held) is looked up here by capability level
//! instead of being checked ad hoc at each call site.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Abstract platform capability level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformLevel(pub u32);

impl PlatformLevel {
    /// First level whose capture resource can pause and resume
    pub const PAUSE_SUPPORT: PlatformLevel = PlatformLevel(24);

    /// First level that requires the broad storage management grant
    pub const STORAGE_MANAGER: PlatformLevel = PlatformLevel(30);

    /// First level where posting notifications needs its own grant
    /// (and legacy storage-write is no longer requested)
    pub const NOTIFICATION_PERMISSION: PlatformLevel = PlatformLevel(33);

    /// Level assumed when none is configured
    pub const CURRENT: PlatformLevel = PlatformLevel(34);

    pub fn capabilities(self) -> Capabilities {
        Capabilities {
            supports_pause: self >= Self::PAUSE_SUPPORT,
            requires_notification_permission: self >= Self::NOTIFICATION_PERMISSION,
            requires_storage_manager: self >= Self::STORAGE_MANAGER,
        }
    }
}

impl Default for PlatformLevel {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for PlatformLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.0)
    }
}

/// What the platform at a given level can do and demands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_pause: bool,
    pub requires_notification_permission: bool,
    pub requires_storage_manager: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_is_unavailable_below_threshold() {
        assert!(!PlatformLevel(23).capabilities().supports_pause);
        assert!(PlatformLevel(24).capabilities().supports_pause);
    }

    #[test]
    fn thresholds_are_independent() {
        let caps = PlatformLevel(30).capabilities();
        assert!(caps.supports_pause);
        assert!(caps.requires_storage_manager);
        assert!(!caps.requires_notification_permission);

        let caps = PlatformLevel::CURRENT.capabilities();
        assert!(caps.requires_notification_permission);
        assert!(caps.requires_storage_manager);
    }
}
